//! Task Store (C1): JSON-file persistence for the task hierarchy.
//!
//! Each project lives at `<base_dir>/projects/<project_id>/` with a
//! `metadata.json` sidecar, a `project.json` holding the full serialized
//! task, and an optional `network_plan/<stage_id>.json` per-stage split.
//! Writes are atomic: a `.tmp` file is written, then renamed into place —
//! `rename(2)` is atomic on POSIX filesystems, so a reader never observes a
//! half-written document.
//!
//! # Usage
//!
//! ```rust
//! use task_store::JsonTaskStore;
//! use orchestrator_core::repository::TaskStore;
//!
//! # async fn run() -> orchestrator_core::Result<()> {
//! let store = JsonTaskStore::new("/tmp/orchestrator-data");
//! store.create_project("daily-sales-dashboard", "build a daily sales dashboard").await?;
//! # Ok(())
//! # }
//! ```

mod json_store;

pub use json_store::JsonTaskStore;

pub use orchestrator_core::{
    error::{Result, TaskError},
    repository::{ProjectMetadata, TaskStore},
};
