//! Task Store trait (C1): persistence of [`Task`] aggregates as JSON documents.
//!
//! Implementations live in the `task-store` crate. This trait only describes
//! the contract; it says nothing about the storage technology, so tests can
//! swap in an in-memory implementation without touching callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, models::Task};

/// Persistence interface for tasks, grouped into per-project namespaces.
///
/// Implementations must be safe to call concurrently from multiple tasks; the
/// JSON file implementation in `task-store` serializes writes per project
/// with an internal lock rather than relying on callers to coordinate.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a new project namespace for `query`. Fails if one already
    /// exists with the same id.
    async fn create_project(&self, project_id: &str, query: &str) -> Result<ProjectMetadata>;

    /// Persist a task, overwriting any prior version. The project must
    /// already exist.
    async fn save_task(&self, task: &Task) -> Result<()>;

    /// Persist one stage under the project's `network_plan/` split.
    async fn save_stage(&self, project_id: &str, stage: &crate::models::Stage) -> Result<()>;

    /// Load a task by project + task id.
    async fn load_task(&self, project_id: &str, task_id: &str) -> Result<Task>;

    /// List every project's metadata, most recently created first.
    async fn list_projects(&self) -> Result<Vec<ProjectMetadata>>;

    /// Permanently remove a project and every task inside it.
    async fn delete_project(&self, project_id: &str) -> Result<()>;

    /// Repository health: can the store currently be read from and written to.
    async fn health_check(&self) -> Result<()>;
}

/// Sidecar metadata describing a project namespace (`metadata.json`, §4.1),
/// stored alongside its task so `list_projects` does not need to parse
/// `project.json` just to show a summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetadata {
    pub id: String,
    pub query: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: f64,
}

impl ProjectMetadata {
    pub fn new(project_id: String, query: String) -> Self {
        let now = Utc::now();
        Self {
            id: project_id,
            query,
            status: crate::models::TaskState::New.to_string(),
            created_at: now,
            updated_at: now,
            progress: 0.0,
        }
    }
}
