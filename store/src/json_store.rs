use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use orchestrator_core::{
    error::{Result, TaskError},
    models::{Stage, SubtaskStatus, Task},
    repository::{ProjectMetadata, TaskStore},
};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

/// JSON file-backed [`TaskStore`]. Safe for concurrent use: a per-project
/// `tokio::sync::Mutex` serializes writes to that project's files, while a
/// separate `std::sync::Mutex` guards only insertion into the lock map
/// itself, so two different projects never block each other.
pub struct JsonTaskStore {
    base_dir: PathBuf,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl JsonTaskStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn project_dir(&self, project_id: &str) -> PathBuf {
        self.base_dir.join("projects").join(project_id)
    }

    fn metadata_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("metadata.json")
    }

    fn task_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("project.json")
    }

    fn stage_path(&self, project_id: &str, stage_id: &str) -> PathBuf {
        self.project_dir(project_id).join("network_plan").join(format!("{stage_id}.json"))
    }

    async fn project_lock(&self, project_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn read_metadata(&self, project_id: &str) -> Result<ProjectMetadata> {
        let path = self.metadata_path(project_id);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|_| TaskError::not_found_component("project", project_id))?;
        serde_json::from_slice(&data)
            .map_err(|e| TaskError::Internal(format!("corrupt metadata for project '{project_id}': {e}")))
    }

    async fn write_json_atomic<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp_path = path.with_extension("tmp");
        let data = serde_json::to_vec_pretty(value).map_err(|e| TaskError::Internal(e.to_string()))?;
        tokio::fs::write(&tmp_path, &data).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn create_project(&self, project_id: &str, query: &str) -> Result<ProjectMetadata> {
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        let dir = self.project_dir(project_id);
        if dir.exists() {
            return Err(TaskError::Validation(format!(
                "project '{project_id}' already exists"
            )));
        }
        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;

        let metadata = ProjectMetadata::new(project_id.to_string(), query.to_string());
        Self::write_json_atomic(&self.metadata_path(project_id), &metadata).await?;
        Ok(metadata)
    }

    async fn save_task(&self, task: &Task) -> Result<()> {
        let lock = self.project_lock(&task.project_id).await;
        let _guard = lock.lock().await;

        let dir = self.project_dir(&task.project_id);
        if !dir.exists() {
            return Err(TaskError::not_found_component("project", &task.project_id));
        }
        Self::write_json_atomic(&self.task_path(&task.project_id), task).await?;

        let mut metadata = self.read_metadata(&task.project_id).await?;
        metadata.status = task.state.to_string();
        metadata.progress = overall_progress(task);
        metadata.updated_at = Utc::now();
        Self::write_json_atomic(&self.metadata_path(&task.project_id), &metadata).await?;
        Ok(())
    }

    async fn save_stage(&self, project_id: &str, stage: &Stage) -> Result<()> {
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        let dir = self.project_dir(project_id);
        if !dir.exists() {
            return Err(TaskError::not_found_component("project", project_id));
        }
        Self::write_json_atomic(&self.stage_path(project_id, &stage.id), stage).await
    }

    async fn load_task(&self, project_id: &str, _task_id: &str) -> Result<Task> {
        let path = self.task_path(project_id);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|_| TaskError::not_found_component("task", project_id))?;
        serde_json::from_slice(&data)
            .map_err(|e| TaskError::Internal(format!("corrupt task file for project '{project_id}': {e}")))
    }

    async fn list_projects(&self) -> Result<Vec<ProjectMetadata>> {
        let projects_dir = self.base_dir.join("projects");
        if !projects_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&projects_dir).await.map_err(io_err)?;
        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let is_dir = entry.file_type().await.map_err(io_err)?.is_dir();
            if !is_dir {
                continue;
            }
            let project_id = entry.file_name().to_string_lossy().into_owned();
            match self.read_metadata(&project_id).await {
                Ok(metadata) => result.push(metadata),
                Err(e) => {
                    tracing::warn!(project_id = %project_id, error = %e, "skipping project with unreadable metadata");
                }
            }
        }
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn delete_project(&self, project_id: &str) -> Result<()> {
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        let dir = self.project_dir(project_id);
        if !dir.exists() {
            return Err(TaskError::not_found_component("project", project_id));
        }
        tokio::fs::remove_dir_all(&dir).await.map_err(io_err)
    }

    async fn health_check(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await.map_err(io_err)?;
        let marker = self.base_dir.join(".health");
        tokio::fs::write(&marker, b"ok").await.map_err(io_err)?;
        tokio::fs::remove_file(&marker).await.map_err(io_err)
    }
}

fn io_err(e: std::io::Error) -> TaskError {
    TaskError::Internal(e.to_string())
}

/// Percentage of subtasks across the whole network plan that are `COMPLETED`.
fn overall_progress(task: &Task) -> f64 {
    let mut total = 0usize;
    let mut completed = 0usize;
    for stage in &task.network_plan.stages {
        for work in &stage.work_packages {
            for exec_task in &work.tasks {
                for subtask in &exec_task.subtasks {
                    total += 1;
                    if subtask.status == SubtaskStatus::Completed {
                        completed += 1;
                    }
                }
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64) * 100.0
    }
}
