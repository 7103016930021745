//! Business-rule validation for the task hierarchy: ID formatting,
//! sequence-order contiguity, and sibling dependency acyclicity.

use std::collections::HashSet;

use crate::error::{Result, TaskError};
use crate::ids;
use crate::models::{ExecutableTask, Stage, Subtask, Task, TaskState, Work};
use crate::state_machine::{self, TaskEvent};

/// Validation utilities for the hierarchical task model.
pub struct TaskValidator;

impl TaskValidator {
    /// A project id: 1-100 characters, lowercase letters/digits/hyphen,
    /// must start with a letter, no consecutive or trailing hyphens.
    pub fn validate_project_id(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(TaskError::empty_field("project_id"));
        }
        if id.len() > 100 {
            return Err(TaskError::Validation(
                "project id must be at most 100 characters long".to_string(),
            ));
        }
        if !id.chars().next().unwrap().is_ascii_lowercase() {
            return Err(TaskError::Validation(
                "project id must start with a lowercase letter".to_string(),
            ));
        }
        if id.ends_with('-') || id.contains("--") {
            return Err(TaskError::Validation(
                "project id must not end with or repeat a hyphen".to_string(),
            ));
        }
        let valid = id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(TaskError::Validation(
                "project id may only contain lowercase letters, digits, and hyphens".to_string(),
            ));
        }
        Ok(())
    }

    /// Non-empty, not-only-whitespace, bounded free text (names/descriptions).
    pub fn validate_text_field(field: &str, value: &str, max_len: usize) -> Result<()> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TaskError::empty_field(field));
        }
        if trimmed.len() > max_len {
            return Err(TaskError::Validation(format!(
                "field '{field}' must be at most {max_len} characters long"
            )));
        }
        Ok(())
    }

    /// Validate a hierarchical ID is well-formed for its expected level.
    pub fn validate_id_format(id: &str, expected_segments: usize) -> Result<()> {
        let segments = id.split('_').count();
        if segments != expected_segments {
            return Err(TaskError::Validation(format!(
                "'{id}' does not have the expected {expected_segments} ID segment(s)"
            )));
        }
        Ok(())
    }

    /// `sequence_order` values across siblings must be exactly `{0, ..,
    /// n-1}` with no gaps and no duplicates.
    pub fn validate_sequence_contiguous(orders: &[u32]) -> Result<()> {
        let mut sorted: Vec<u32> = orders.to_vec();
        sorted.sort_unstable();
        for (expected, actual) in (0u32..).zip(sorted.iter()) {
            if expected != *actual {
                return Err(TaskError::Validation(format!(
                    "sequence_order values must be contiguous starting at 0, got {sorted:?}"
                )));
            }
        }
        Ok(())
    }

    /// Every dependency id must refer to a sibling in `sibling_ids`, and the
    /// dependency graph restricted to these siblings must be acyclic.
    pub fn validate_sibling_dependencies(sibling_ids: &[String], dependencies: &[(String, Vec<String>)]) -> Result<()> {
        let known: HashSet<&str> = sibling_ids.iter().map(String::as_str).collect();
        for (id, deps) in dependencies {
            for dep in deps {
                if dep == id {
                    return Err(TaskError::Validation(format!("'{id}' cannot depend on itself")));
                }
                if !known.contains(dep.as_str()) {
                    return Err(TaskError::Validation(format!(
                        "'{id}' depends on unknown sibling '{dep}'"
                    )));
                }
            }
        }
        detect_cycle(dependencies)
    }

    pub fn validate_stage(stage: &Stage) -> Result<()> {
        Self::validate_id_format(&stage.id, 1)?;
        Self::validate_text_field("stage.name", &stage.name, 200)?;
        let orders: Vec<u32> = stage.work_packages.iter().map(|w| w.sequence_order).collect();
        Self::validate_sequence_contiguous(&orders)?;
        let ids: Vec<String> = stage.work_packages.iter().map(|w| w.id.clone()).collect();
        let deps: Vec<(String, Vec<String>)> = stage
            .work_packages
            .iter()
            .map(|w| (w.id.clone(), w.dependencies.clone()))
            .collect();
        Self::validate_sibling_dependencies(&ids, &deps)
    }

    pub fn validate_work(work: &Work) -> Result<()> {
        Self::validate_id_format(&work.id, 2)?;
        Self::validate_text_field("work.name", &work.name, 200)?;
        let orders: Vec<u32> = work.tasks.iter().map(|t| t.sequence_order).collect();
        Self::validate_sequence_contiguous(&orders)?;
        let ids: Vec<String> = work.tasks.iter().map(|t| t.id.clone()).collect();
        let deps: Vec<(String, Vec<String>)> = work
            .tasks
            .iter()
            .map(|t| (t.id.clone(), t.dependencies.clone()))
            .collect();
        Self::validate_sibling_dependencies(&ids, &deps)
    }

    pub fn validate_executable_task(task: &ExecutableTask) -> Result<()> {
        Self::validate_id_format(&task.id, 3)?;
        Self::validate_text_field("executable_task.name", &task.name, 200)?;
        let orders: Vec<u32> = task.subtasks.iter().map(|s| s.sequence_order).collect();
        Self::validate_sequence_contiguous(&orders)?;
        let ids: Vec<String> = task.subtasks.iter().map(|s| s.id.clone()).collect();
        let deps: Vec<(String, Vec<String>)> = task
            .subtasks
            .iter()
            .map(|s| (s.id.clone(), s.dependencies.clone()))
            .collect();
        Self::validate_sibling_dependencies(&ids, &deps)
    }

    pub fn validate_subtask(subtask: &Subtask) -> Result<()> {
        Self::validate_id_format(&subtask.id, 4)?;
        Self::validate_text_field("subtask.name", &subtask.name, 200)
    }

    /// Resolve a subtask reference to confirm it is a syntactically valid
    /// descendant of the given executable task.
    pub fn validate_subtask_reference(executable_task_id: &str, subtask_id: &str) -> Result<()> {
        if !ids::is_descendant(executable_task_id, subtask_id) {
            return Err(TaskError::Validation(format!(
                "'{subtask_id}' is not a descendant of '{executable_task_id}'"
            )));
        }
        Ok(())
    }

    /// Apply a lifecycle event to a task, returning the resulting state
    /// without mutating `task`. Callers commit the result themselves so
    /// that persistence and state transition happen together.
    pub fn validate_state_transition(task: &Task, event: TaskEvent, force: bool) -> Result<TaskState> {
        state_machine::transition(task.state, event, force)
    }
}

/// Depth-first cycle detection over a dependency adjacency list.
fn detect_cycle(dependencies: &[(String, Vec<String>)]) -> Result<()> {
    use std::collections::HashMap;

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    let adjacency: HashMap<&str, &[String]> = dependencies
        .iter()
        .map(|(id, deps)| (id.as_str(), deps.as_slice()))
        .collect();

    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, &'a [String]>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<()> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(TaskError::Validation(format!(
                    "dependency cycle detected at '{node}'"
                )))
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        if let Some(deps) = adjacency.get(node) {
            for dep in deps.iter() {
                visit(dep, adjacency, marks)?;
            }
        }
        marks.insert(node, Mark::Done);
        Ok(())
    }

    for (id, _) in dependencies {
        visit(id, &adjacency, &mut marks)?;
    }
    Ok(())
}
