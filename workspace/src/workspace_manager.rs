//! Workspace Manager (C2): the per-task working directory tree.
//!
//! Layout under `<base_dir>/projects/task_<project_id>/`:
//! `session_history.txt`, `project_notes.md`, `current_status.json`,
//! `generated_files/`, `temp/`.

use std::path::{Path, PathBuf};

use orchestrator_core::error::{Result, TaskError};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn workspace_root(&self, project_id: &str) -> PathBuf {
        self.base_dir.join("projects").join(format!("task_{project_id}"))
    }

    /// Create the workspace directory tree for a project. Idempotent: an
    /// existing session history or notes file is left untouched.
    pub async fn create_workspace(&self, project_id: &str) -> Result<PathBuf> {
        let root = self.workspace_root(project_id);
        tokio::fs::create_dir_all(root.join("generated_files"))
            .await
            .map_err(io_err)?;
        tokio::fs::create_dir_all(root.join("temp")).await.map_err(io_err)?;

        write_if_absent(&root.join("session_history.txt"), "").await?;
        write_if_absent(&root.join("project_notes.md"), "").await?;
        write_if_absent(&root.join("current_status.json"), "{}").await?;

        Ok(root)
    }

    /// Append one line to `session_history.txt`, timestamped by the caller.
    pub async fn append_session_history(&self, project_id: &str, line: &str) -> Result<()> {
        let path = self.workspace_root(project_id).join("session_history.txt");
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.write_all(b"\n").await.map_err(io_err)
    }

    pub async fn read_project_notes(&self, project_id: &str) -> Result<String> {
        let path = self.workspace_root(project_id).join("project_notes.md");
        tokio::fs::read_to_string(&path).await.map_err(io_err)
    }

    pub async fn write_project_notes(&self, project_id: &str, content: &str) -> Result<()> {
        let path = self.workspace_root(project_id).join("project_notes.md");
        tokio::fs::write(&path, content).await.map_err(io_err)
    }

    /// Overwrite `current_status.json` atomically.
    pub async fn update_status(&self, project_id: &str, status: &Value) -> Result<()> {
        let root = self.workspace_root(project_id);
        let path = root.join("current_status.json");
        let tmp_path = path.with_extension("tmp");
        let data = serde_json::to_vec_pretty(status).map_err(|e| TaskError::Internal(e.to_string()))?;
        tokio::fs::write(&tmp_path, &data).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(io_err)
    }

    pub async fn read_status(&self, project_id: &str) -> Result<Value> {
        let path = self.workspace_root(project_id).join("current_status.json");
        let data = tokio::fs::read(&path).await.map_err(io_err)?;
        serde_json::from_slice(&data).map_err(|e| TaskError::Internal(e.to_string()))
    }
}

async fn write_if_absent(path: &Path, content: &str) -> Result<()> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(());
    }
    tokio::fs::write(path, content).await.map_err(io_err)
}

fn io_err(e: std::io::Error) -> TaskError {
    TaskError::Internal(e.to_string())
}
