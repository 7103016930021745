use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Comprehensive error taxonomy for the task-planning orchestrator.
///
/// Each variant maps to an HTTP status code for the thin HTTP façade (C11)
/// via [`TaskError::status_code`]. Propagation policy: validation/state
/// errors surface directly with no retry; `AgentError` is retried by the
/// LLM façade up to its budget; `ExecutionError` is caught by the execution
/// engine and converted to a `FAILED` subtask status rather than propagated
/// as a request failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// A Task, Stage, Work, ExecutableTask or Subtask lookup failed.
    #[error("not found: {0}")]
    NotFound(String),

    /// State-machine precondition unmet for the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An ancestor chain is broken, e.g. a stage has no work packages yet.
    #[error("missing component: {0}")]
    MissingComponent(String),

    /// Input shape is fine but values are rejected (bad ID format, duplicate
    /// scope dimension, cyclic dependency, unknown subtask reference, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// A filesystem tool's path resolved outside the allowed workspace root.
    #[error("sandbox violation: {0}")]
    SandboxViolation(String),

    /// An LLM call failed after the façade's retry budget, or its output did
    /// not parse against the expected schema.
    #[error("agent error: {0}")]
    AgentError(String),

    /// Execution is blocked on an unsatisfied sibling dependency.
    #[error("dependency error: {0}")]
    DependencyError(String),

    /// An executor raised while running a subtask; the subtask is marked
    /// FAILED rather than propagating this as a request failure.
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// Anything else; logged with its source and surfaced as a 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TaskError {
    /// A not-found error for a task ID.
    pub fn not_found_id(id: &str) -> Self {
        Self::NotFound(format!("task '{id}' not found"))
    }

    /// A not-found error naming the missing hierarchy component.
    pub fn not_found_component(kind: &str, id: &str) -> Self {
        Self::NotFound(format!("{kind} '{id}' not found"))
    }

    /// An empty-field validation error.
    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("field '{field}' cannot be empty"))
    }

    /// Check if this error indicates a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound(_))
    }

    /// Check if this error indicates a validation problem.
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::Validation(_))
    }

    /// Convert to the HTTP status code the thin façade (C11) should return.
    pub fn status_code(&self) -> u16 {
        match self {
            TaskError::NotFound(_) => 404,
            TaskError::InvalidState(_) => 400,
            TaskError::MissingComponent(_) => 400,
            TaskError::Validation(_) => 400,
            TaskError::SandboxViolation(_) => 400,
            TaskError::AgentError(_) => 502,
            TaskError::DependencyError(_) => 409,
            TaskError::ExecutionError(_) => 500,
            TaskError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_and_predicates() {
        let err = TaskError::not_found_id("abc");
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);

        let err = TaskError::empty_field("name");
        assert!(err.is_validation());
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(TaskError::DependencyError("x".into()).status_code(), 409);
        assert_eq!(TaskError::ExecutionError("x".into()).status_code(), 500);
        assert_eq!(TaskError::AgentError("x".into()).status_code(), 502);
        assert_eq!(TaskError::SandboxViolation("x".into()).status_code(), 400);
    }

    #[test]
    fn display_messages() {
        let err = TaskError::InvalidState("cannot skip IFR".into());
        assert_eq!(format!("{err}"), "invalid state: cannot skip IFR");
    }
}
