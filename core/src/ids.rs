//! Hierarchical ID construction and validation.
//!
//! IDs below the Task level are reference-encoding: `S1_W2_ET3_ST4` names the
//! full ancestor chain of the fourth subtask of the third executable task of
//! the second work package of the first stage. This module is the single
//! place that builds and parses that encoding so the rest of the crate never
//! hand-rolls string formatting for an ID.

use crate::error::{Result, TaskError};

/// Build a stage ID: `S<n>`.
pub fn stage_id(stage_index: usize) -> String {
    format!("S{}", stage_index + 1)
}

/// Build a work ID: `S<n>_W<m>`.
pub fn work_id(stage_id: &str, work_index: usize) -> String {
    format!("{stage_id}_W{}", work_index + 1)
}

/// Build an executable task ID: `S<n>_W<m>_ET<k>`.
pub fn executable_task_id(work_id: &str, task_index: usize) -> String {
    format!("{work_id}_ET{}", task_index + 1)
}

/// Build a subtask ID: `S<n>_W<m>_ET<k>_ST<p>`.
pub fn subtask_id(executable_task_id: &str, subtask_index: usize) -> String {
    format!("{executable_task_id}_ST{}", subtask_index + 1)
}

/// Returns true if `child_id` is a direct or transitive descendant ID of
/// `parent_id`, i.e. `parent_id` is a strict prefix of `child_id` ending on a
/// segment boundary (`_`).
pub fn is_descendant(parent_id: &str, child_id: &str) -> bool {
    child_id
        .strip_prefix(parent_id)
        .is_some_and(|rest| rest.starts_with('_'))
}

/// Split a subtask ID into its four ancestor segments
/// `(stage_id, work_id, executable_task_id, subtask_id)`.
pub fn split_subtask_id(id: &str) -> Result<(String, String, String, String)> {
    let parts: Vec<&str> = id.split('_').collect();
    if parts.len() != 4
        || !parts[0].starts_with('S')
        || !parts[1].starts_with('W')
        || !parts[2].starts_with("ET")
        || !parts[3].starts_with("ST")
    {
        return Err(TaskError::Validation(format!(
            "'{id}' is not a well-formed subtask reference (expected S<n>_W<m>_ET<k>_ST<p>)"
        )));
    }
    let stage = parts[0].to_string();
    let work = format!("{}_{}", parts[0], parts[1]);
    let exec = format!("{work}_{}", parts[2]);
    let sub = format!("{exec}_{}", parts[3]);
    Ok((stage, work, exec, sub))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_hierarchical_ids() {
        let s = stage_id(0);
        assert_eq!(s, "S1");
        let w = work_id(&s, 1);
        assert_eq!(w, "S1_W2");
        let et = executable_task_id(&w, 2);
        assert_eq!(et, "S1_W2_ET3");
        let st = subtask_id(&et, 0);
        assert_eq!(st, "S1_W2_ET3_ST1");
    }

    #[test]
    fn descendant_check_requires_segment_boundary() {
        assert!(is_descendant("S1", "S1_W1"));
        assert!(is_descendant("S1_W1", "S1_W1_ET1"));
        assert!(!is_descendant("S1", "S10_W1"));
        assert!(!is_descendant("S1_W1", "S1_W1"));
    }

    #[test]
    fn splits_subtask_reference() {
        let (stage, work, exec, sub) = split_subtask_id("S1_W2_ET3_ST4").unwrap();
        assert_eq!(stage, "S1");
        assert_eq!(work, "S1_W2");
        assert_eq!(exec, "S1_W2_ET3");
        assert_eq!(sub, "S1_W2_ET3_ST4");
    }

    #[test]
    fn rejects_malformed_reference() {
        assert!(split_subtask_id("S1_W2_ET3").is_err());
        assert!(split_subtask_id("bogus").is_err());
    }
}
