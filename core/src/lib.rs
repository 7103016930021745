//! Orchestrator Core
//!
//! Domain models, the lifecycle state machine, persistence/façade trait
//! interfaces, and validation rules for the task-planning orchestrator. Every
//! other crate in this workspace depends on the types defined here.
//!
//! # Architecture
//!
//! - [`models`] — the Task → Stage → Work → ExecutableTask → Subtask hierarchy
//! - [`ids`] — hierarchical ID construction and parsing
//! - [`state_machine`] — the task lifecycle state machine
//! - [`error`] — the shared error taxonomy
//! - [`repository`] — the `TaskStore` persistence trait
//! - [`protocol`] — the `LLMClient` trait and `AgentFacade`
//! - [`validation`] — business-rule validation
//! - [`circuit_breaker`] — per-subtask failure tracking for the execution engine
//! - [`traversal`] — find-by-id / find-by-path helpers and symmetric status updaters
//!
//! # Example
//!
//! ```rust
//! use orchestrator_core::{
//!     models::Task,
//!     state_machine::{transition, TaskEvent},
//! };
//!
//! let task = Task::new("t1".into(), "daily-sales-dashboard".into(), "Build a dashboard".into());
//! let next = transition(task.state, TaskEvent::BeginContextGathering, false).unwrap();
//! assert_eq!(format!("{next}"), "CONTEXT_GATHERING");
//! ```

pub mod circuit_breaker;
pub mod error;
pub mod ids;
pub mod models;
pub mod protocol;
pub mod repository;
pub mod state_machine;
pub mod traversal;
pub mod validation;

pub use circuit_breaker::{BreakerAction, FailureKind, SubtaskCircuitBreaker};
pub use error::{Result, TaskError};
pub use models::{
    ArtifactKind, ArtifactLocation, ContextAnswer, DimensionStatus, ExecutableTask, ExecutorType, Ifr, NetworkPlan,
    Requirements, Scope, ScopeDimension, ScopeEntry, Stage, Subtask, SubtaskStatus, Task, TaskState, Work,
};
pub use protocol::{AgentFacade, ContextSufficiency, LLMClient, LlmRequest, NetworkPlanVerdict, ScopeValidation};
pub use repository::{ProjectMetadata, TaskStore};
pub use state_machine::{can_transition, transition, TaskEvent};
pub use validation::TaskValidator;

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name.
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_constants_are_populated() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "orchestrator-core");
    }

    #[test]
    fn re_exports_resolve() {
        let task = Task::new("t1".into(), "p1".into(), "desc".into());
        assert_eq!(task.state, TaskState::New);
        let err = TaskError::not_found_id("t1");
        assert!(err.is_not_found());
    }
}
