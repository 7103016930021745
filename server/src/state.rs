//! Shared application state (§5 concurrency model): one [`TaskHandleRegistry`]
//! entry per `(project_id, task_id)` hands out an `Arc<RwLock<Task>>` so that
//! a read-only status check never blocks a concurrent read-modify-write, while
//! compound planning/execution operations hold the write guard for the full
//! duration of their read-modify-write-persist sequence.

use std::collections::HashMap;
use std::sync::Arc;

use agent_protocol::TrackerRegistry;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrator_core::circuit_breaker::SubtaskCircuitBreaker;
use orchestrator_core::error::TaskError;
use orchestrator_core::models::Task;
use orchestrator_core::repository::TaskStore;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::execution::ExecutionEngine;
use crate::planning::PlanningOps;
use task_workspace::WorkspaceManager;

/// Thin wrapper turning a [`TaskError`] into the `{detail: string}` body the
/// HTTP surface promises, tagged with the status code §7 assigns it.
pub struct ApiError(pub TaskError);

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { detail: self.0.to_string() })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Caches one `Arc<RwLock<Task>>` per `(project_id, task_id)` so repeat
/// requests against the same task share a lock instead of racing the store.
#[derive(Default)]
pub struct TaskHandleRegistry {
    handles: Mutex<HashMap<(String, String), Arc<RwLock<Task>>>>,
}

impl TaskHandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `(project_id, task_id)`, loading it from
    /// `store` on first access.
    pub async fn get_or_load(
        &self,
        store: &dyn TaskStore,
        project_id: &str,
        task_id: &str,
    ) -> Result<Arc<RwLock<Task>>, TaskError> {
        let key = (project_id.to_string(), task_id.to_string());
        {
            let handles = self.handles.lock().await;
            if let Some(handle) = handles.get(&key) {
                return Ok(handle.clone());
            }
        }

        let task = store.load_task(project_id, task_id).await?;
        let mut handles = self.handles.lock().await;
        let handle = handles.entry(key).or_insert_with(|| Arc::new(RwLock::new(task))).clone();
        Ok(handle)
    }

    /// Register a freshly created task (e.g. right after `POST
    /// /user-queries`) without a round trip through the store.
    pub async fn insert(&self, project_id: &str, task_id: &str, task: Task) -> Arc<RwLock<Task>> {
        let handle = Arc::new(RwLock::new(task));
        let mut handles = self.handles.lock().await;
        handles.insert((project_id.to_string(), task_id.to_string()), handle.clone());
        handle
    }

    pub async fn remove(&self, project_id: &str, task_id: &str) {
        let mut handles = self.handles.lock().await;
        handles.remove(&(project_id.to_string(), task_id.to_string()));
    }

    pub async fn remove_project(&self, project_id: &str) {
        let mut handles = self.handles.lock().await;
        handles.retain(|(p, _), _| p != project_id);
    }
}

/// Everything a handler needs, wired up once at startup and shared behind
/// `Arc` clones per axum convention.
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub workspace: Arc<WorkspaceManager>,
    pub planning: Arc<dyn PlanningOps>,
    pub execution: Arc<ExecutionEngine>,
    pub tasks: Arc<TaskHandleRegistry>,
    pub breakers: Mutex<HashMap<String, SubtaskCircuitBreaker>>,
    pub trackers: Arc<TrackerRegistry>,
    pub config: Config,
}

