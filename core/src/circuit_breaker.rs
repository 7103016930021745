//! Per-subtask circuit breaker (supplement to C8).
//!
//! Repeated `FAILED` outcomes for the same subtask increment a counter keyed
//! by `(subtask_id, failure_kind)`. Once a kind-specific threshold is
//! exceeded, [`SubtaskCircuitBreaker::record_failure`] reports
//! [`BreakerAction::Block`] and the execution engine marks the subtask
//! `Blocked` instead of re-offering it to an executor. A success clears every
//! counter recorded for that subtask.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Coarse classification of why a subtask execution failed, used to pick a
/// failure-specific threshold rather than one flat count for every cause.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The chosen executor could not handle the task at all.
    ExecutorMismatch,
    /// The executor ran but produced output that failed validation.
    ValidationFailed,
    /// An external dependency (tool, filesystem, LLM) errored.
    Environmental,
}

impl FailureKind {
    fn default_threshold(self) -> u32 {
        match self {
            FailureKind::ExecutorMismatch => 1,
            FailureKind::ValidationFailed => 3,
            FailureKind::Environmental => 5,
        }
    }
}

/// What the execution engine should do after recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerAction {
    /// Below threshold: the subtask may be retried/re-offered.
    Retry,
    /// Threshold exceeded: mark the subtask `Blocked` until manually reset.
    Block,
}

/// Tracks failure counts per subtask, independent of thresholds for other
/// subtasks. One instance is shared for the lifetime of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskCircuitBreaker {
    counts: HashMap<(String, FailureKind), u32>,
    thresholds: HashMap<FailureKind, u32>,
}

impl SubtaskCircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, kind: FailureKind, threshold: u32) -> Self {
        self.thresholds.insert(kind, threshold);
        self
    }

    fn threshold_for(&self, kind: FailureKind) -> u32 {
        self.thresholds.get(&kind).copied().unwrap_or_else(|| kind.default_threshold())
    }

    /// Record one failure of `kind` for `subtask_id` and report whether it
    /// should be retried or blocked.
    pub fn record_failure(&mut self, subtask_id: &str, kind: FailureKind) -> BreakerAction {
        let count = self.counts.entry((subtask_id.to_string(), kind)).or_insert(0);
        *count += 1;
        if *count >= self.threshold_for(kind) {
            BreakerAction::Block
        } else {
            BreakerAction::Retry
        }
    }

    /// Clear all failure counts recorded for `subtask_id`, e.g. on success
    /// or manual reset.
    pub fn reset(&mut self, subtask_id: &str) {
        self.counts.retain(|(id, _), _| id != subtask_id);
    }

    pub fn failure_count(&self, subtask_id: &str, kind: FailureKind) -> u32 {
        self.counts.get(&(subtask_id.to_string(), kind)).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_mismatch_blocks_immediately() {
        let mut breaker = SubtaskCircuitBreaker::new();
        let action = breaker.record_failure("S1_W1_ET1_ST1", FailureKind::ExecutorMismatch);
        assert_eq!(action, BreakerAction::Block);
    }

    #[test]
    fn validation_failure_retries_then_blocks() {
        let mut breaker = SubtaskCircuitBreaker::new();
        let id = "S1_W1_ET1_ST2";
        assert_eq!(breaker.record_failure(id, FailureKind::ValidationFailed), BreakerAction::Retry);
        assert_eq!(breaker.record_failure(id, FailureKind::ValidationFailed), BreakerAction::Retry);
        assert_eq!(breaker.record_failure(id, FailureKind::ValidationFailed), BreakerAction::Block);
    }

    #[test]
    fn reset_clears_counts_for_subtask_only() {
        let mut breaker = SubtaskCircuitBreaker::new();
        breaker.record_failure("a", FailureKind::ValidationFailed);
        breaker.record_failure("b", FailureKind::ValidationFailed);
        breaker.reset("a");
        assert_eq!(breaker.failure_count("a", FailureKind::ValidationFailed), 0);
        assert_eq!(breaker.failure_count("b", FailureKind::ValidationFailed), 1);
    }

    #[test]
    fn counts_are_independent_per_subtask() {
        let mut breaker = SubtaskCircuitBreaker::new();
        breaker.record_failure("s1", FailureKind::Environmental);
        breaker.record_failure("s1", FailureKind::Environmental);
        assert_eq!(breaker.failure_count("s2", FailureKind::Environmental), 0);
        assert_eq!(breaker.failure_count("s1", FailureKind::Environmental), 2);
    }
}
