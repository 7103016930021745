//! Hierarchical traversal & status updaters (C3, §4.4).
//!
//! Two ways in: by ID-only search (descend the tree looking for a match) or
//! by full path (name every ancestor, fail with a typed not-found error
//! naming exactly which link in the chain broke). Status updaters are
//! symmetric across all four levels and only mutate the tree in memory —
//! callers are responsible for persisting the owning [`Task`] afterwards.

use crate::error::{Result, TaskError};
use crate::models::{ExecutableTask, Stage, Subtask, SubtaskStatus, Task, Work};

impl Task {
    pub fn find_stage_by_id(&self, id: &str) -> Option<&Stage> {
        self.network_plan.stages.iter().find(|s| s.id == id)
    }

    pub fn find_stage_by_id_mut(&mut self, id: &str) -> Option<&mut Stage> {
        self.network_plan.stages.iter_mut().find(|s| s.id == id)
    }

    pub fn find_work_by_id(&self, id: &str) -> Option<&Work> {
        self.network_plan.stages.iter().flat_map(|s| s.work_packages.iter()).find(|w| w.id == id)
    }

    pub fn find_work_by_id_mut(&mut self, id: &str) -> Option<&mut Work> {
        self.network_plan
            .stages
            .iter_mut()
            .flat_map(|s| s.work_packages.iter_mut())
            .find(|w| w.id == id)
    }

    pub fn find_executable_task_by_id(&self, id: &str) -> Option<&ExecutableTask> {
        self.network_plan
            .stages
            .iter()
            .flat_map(|s| s.work_packages.iter())
            .flat_map(|w| w.tasks.iter())
            .find(|t| t.id == id)
    }

    pub fn find_executable_task_by_id_mut(&mut self, id: &str) -> Option<&mut ExecutableTask> {
        self.network_plan
            .stages
            .iter_mut()
            .flat_map(|s| s.work_packages.iter_mut())
            .flat_map(|w| w.tasks.iter_mut())
            .find(|t| t.id == id)
    }

    pub fn find_subtask_by_id(&self, id: &str) -> Option<&Subtask> {
        self.network_plan
            .stages
            .iter()
            .flat_map(|s| s.work_packages.iter())
            .flat_map(|w| w.tasks.iter())
            .flat_map(|t| t.subtasks.iter())
            .find(|st| st.id == id)
    }

    pub fn find_subtask_by_id_mut(&mut self, id: &str) -> Option<&mut Subtask> {
        self.network_plan
            .stages
            .iter_mut()
            .flat_map(|s| s.work_packages.iter_mut())
            .flat_map(|w| w.tasks.iter_mut())
            .flat_map(|t| t.subtasks.iter_mut())
            .find(|st| st.id == id)
    }

    /// Resolve `stage_id` or fail with a typed not-found error naming it.
    pub fn stage(&self, stage_id: &str) -> Result<&Stage> {
        self.find_stage_by_id(stage_id)
            .ok_or_else(|| TaskError::not_found_component("stage", stage_id))
    }

    /// Resolve `work_id` by descending through its owning stage, failing
    /// with a typed error naming whichever link in the chain is missing.
    pub fn work(&self, stage_id: &str, work_id: &str) -> Result<&Work> {
        let stage = self.stage(stage_id)?;
        stage
            .work_packages
            .iter()
            .find(|w| w.id == work_id)
            .ok_or_else(|| TaskError::not_found_component("work", work_id))
    }

    pub fn executable_task(&self, stage_id: &str, work_id: &str, task_id: &str) -> Result<&ExecutableTask> {
        let work = self.work(stage_id, work_id)?;
        work.tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| TaskError::not_found_component("executable task", task_id))
    }

    pub fn subtask(&self, stage_id: &str, work_id: &str, task_id: &str, subtask_id: &str) -> Result<&Subtask> {
        let task = self.executable_task(stage_id, work_id, task_id)?;
        task.subtasks
            .iter()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| TaskError::not_found_component("subtask", subtask_id))
    }

    /// Resolve a `S<n>_W<m>_ET<k>_ST<p>` reference without the caller naming
    /// each ancestor explicitly.
    pub fn subtask_by_reference(&self, reference: &str) -> Result<&Subtask> {
        let (stage_id, work_id, task_id, subtask_id) = crate::ids::split_subtask_id(reference)?;
        self.subtask(&stage_id, &work_id, &task_id, &subtask_id)
    }

    pub fn subtask_by_reference_mut(&mut self, reference: &str) -> Result<&mut Subtask> {
        let (_, _, _, subtask_id) = crate::ids::split_subtask_id(reference)?;
        self.find_subtask_by_id_mut(&subtask_id)
            .ok_or_else(|| TaskError::not_found_component("subtask", reference))
    }
}

impl Stage {
    pub fn start(&mut self) {
        self.status = SubtaskStatus::InProgress;
        self.started_at = Some(chrono::Utc::now());
        self.completed_at = None;
        self.error_message = None;
    }

    pub fn complete(&mut self) {
        self.status = SubtaskStatus::Completed;
        self.error_message = None;
        self.completed_at = Some(chrono::Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SubtaskStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(chrono::Utc::now());
    }
}

impl Work {
    pub fn start(&mut self) {
        self.status = SubtaskStatus::InProgress;
        self.started_at = Some(chrono::Utc::now());
        self.completed_at = None;
        self.error_message = None;
    }

    pub fn complete(&mut self) {
        self.status = SubtaskStatus::Completed;
        self.error_message = None;
        self.completed_at = Some(chrono::Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SubtaskStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(chrono::Utc::now());
    }
}

impl ExecutableTask {
    pub fn start(&mut self) {
        self.status = SubtaskStatus::InProgress;
        self.started_at = Some(chrono::Utc::now());
        self.completed_at = None;
        self.error_message = None;
    }

    pub fn complete(&mut self) {
        self.status = SubtaskStatus::Completed;
        self.error_message = None;
        self.completed_at = Some(chrono::Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SubtaskStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(chrono::Utc::now());
    }
}
