//! Task lifecycle state machine (C4): one exhaustive `match` deciding which
//! [`TaskEvent`]s are legal from which [`TaskState`].
//!
//! Mirrors the teacher's `Task::can_transition_to` boolean match, but
//! returns the resulting state rather than a bool, and recognizes a `force`
//! escape hatch for the two operations `spec.md` calls out explicitly:
//! re-entering context gathering after it was marked gathered, and
//! regenerating the network plan mid-execution.

use crate::error::{Result, TaskError};
use crate::models::TaskState;

/// Events that drive the task lifecycle forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    BeginContextGathering,
    CompleteContextGathering,
    FormTask,
    GenerateIfr,
    DefineRequirements,
    GenerateNetworkPlan,
    RegenerateNetworkPlan,
    BeginExecution,
    CompleteExecution,
    Fail,
}

/// Compute the next state for `(current, event)`, or reject the transition.
///
/// `force` only widens the two escape-hatch arms below; it never relaxes
/// the ordinary forward path, and a caller passing `force: true` for an
/// otherwise-legal transition gets the same result as `force: false`.
pub fn transition(current: TaskState, event: TaskEvent, force: bool) -> Result<TaskState> {
    use TaskEvent::*;
    use TaskState::*;

    match (current, event) {
        (New, BeginContextGathering) => Ok(ContextGathering),
        (ContextGathering, CompleteContextGathering) => Ok(ContextGathered),
        (ContextGathered, FormTask) => Ok(TaskFormation),
        (TaskFormation, GenerateIfr) => Ok(IfrGenerated),
        (IfrGenerated, DefineRequirements) => Ok(RequirementsDefined),
        (RequirementsDefined, GenerateNetworkPlan) => Ok(NetworkPlanGenerated),
        (NetworkPlanGenerated, RegenerateNetworkPlan) => Ok(NetworkPlanGenerated),
        (NetworkPlanGenerated, BeginExecution) => Ok(Executing),
        (Executing, CompleteExecution) => Ok(Completed),

        // Escape hatches: re-open context gathering, or replan mid-execution.
        (ContextGathered, BeginContextGathering) if force => Ok(ContextGathering),
        (Executing, RegenerateNetworkPlan) if force => Ok(NetworkPlanGenerated),

        // Failure is reachable from any non-terminal state.
        (current, Fail) if current != Completed && current != Failed => Ok(Failed),

        (from, ev) => Err(TaskError::InvalidState(format!(
            "cannot apply {ev:?} while task is in state {from}"
        ))),
    }
}

/// Whether `to` is reachable from `from` via a single non-forced transition
/// for *some* event. Useful for validation callers that only need a yes/no
/// answer without committing to a specific event.
pub fn can_transition(from: TaskState, to: TaskState) -> bool {
    use TaskState::*;
    let normal_successor = matches!(
        (from, to),
        (New, ContextGathering)
            | (ContextGathering, ContextGathered)
            | (ContextGathered, TaskFormation)
            | (TaskFormation, IfrGenerated)
            | (IfrGenerated, RequirementsDefined)
            | (RequirementsDefined, NetworkPlanGenerated)
            | (NetworkPlanGenerated, NetworkPlanGenerated)
            | (NetworkPlanGenerated, Executing)
            | (Executing, Completed)
    );
    normal_successor || (to == Failed && from != Completed && from != Failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskEvent::*;
    use TaskState::*;

    #[test]
    fn happy_path_walks_every_state() {
        let mut state = New;
        for event in [
            BeginContextGathering,
            CompleteContextGathering,
            FormTask,
            GenerateIfr,
            DefineRequirements,
            GenerateNetworkPlan,
            BeginExecution,
            CompleteExecution,
        ] {
            state = transition(state, event, false).unwrap();
        }
        assert_eq!(state, Completed);
    }

    #[test]
    fn rejects_skipping_ahead() {
        assert!(transition(New, FormTask, false).is_err());
        assert!(transition(ContextGathered, GenerateNetworkPlan, false).is_err());
    }

    #[test]
    fn forced_escape_hatches_require_force_flag() {
        assert!(transition(ContextGathered, BeginContextGathering, false).is_err());
        assert_eq!(
            transition(ContextGathered, BeginContextGathering, true).unwrap(),
            ContextGathering
        );

        assert!(transition(Executing, RegenerateNetworkPlan, false).is_err());
        assert_eq!(
            transition(Executing, RegenerateNetworkPlan, true).unwrap(),
            NetworkPlanGenerated
        );
    }

    #[test]
    fn fail_reachable_from_any_non_terminal_state() {
        for state in [New, ContextGathering, TaskFormation, Executing] {
            assert_eq!(transition(state, Fail, false).unwrap(), Failed);
        }
        assert!(transition(Completed, Fail, false).is_err());
        assert!(transition(Failed, Fail, false).is_err());
    }

    #[test]
    fn can_transition_matches_transition_for_normal_path() {
        assert!(can_transition(New, ContextGathering));
        assert!(!can_transition(New, Executing));
        assert!(can_transition(Executing, Failed));
        assert!(!can_transition(Completed, Failed));
    }
}
