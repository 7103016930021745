//! Execution Engine (C8): runs one subtask end-to-end through
//! resolve → select executor → mark in-progress → execute → validate →
//! update status, plus the task-hierarchy introspection helpers that ride
//! alongside it.

use std::path::Path;

use async_trait::async_trait;
use orchestrator_core::circuit_breaker::{BreakerAction, FailureKind, SubtaskCircuitBreaker};
use orchestrator_core::error::Result;
use orchestrator_core::models::{Subtask, SubtaskStatus, Task};
use task_workspace::FilesystemTools;

/// A resolved view of the subtask an executor acts on. Unknown references
/// get a synthetic record (`is_unknown: true`) rather than an error, so the
/// caller can still write a `FAILED` status against a dangling reference.
#[derive(Debug, Clone)]
pub struct SubtaskDetails {
    pub reference: String,
    pub name: String,
    pub description: String,
    pub validation_criteria: Vec<String>,
    pub is_unknown: bool,
}

impl SubtaskDetails {
    fn from_subtask(reference: &str, subtask: &Subtask) -> Self {
        Self {
            reference: reference.to_string(),
            name: subtask.name.clone(),
            description: subtask.description.clone(),
            validation_criteria: subtask.validation_criteria.clone(),
            is_unknown: false,
        }
    }

    fn unknown(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            name: "unknown task".to_string(),
            description: String::new(),
            validation_criteria: Vec::new(),
            is_unknown: true,
        }
    }
}

/// What an [`Executor`] reports back after running.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
    pub artifacts_created: Vec<String>,
    pub file_content: Option<String>,
    pub file_path: Option<String>,
    pub error: Option<String>,
}

/// One strategy for carrying out a subtask. Implementations are tried in
/// priority order by [`select_executor`]; the first whose `can_execute`
/// returns true wins.
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_execute(&self, details: &SubtaskDetails) -> bool;
    async fn execute(&self, details: &SubtaskDetails, workspace_root: &Path) -> Result<ExecutionOutcome>;
}

/// Handles subtasks whose description or validation criteria mention a file
/// or configuration artifact: creates it with placeholder content derived
/// from the subtask name when nothing more specific is known.
pub struct FileOperationExecutor;

impl FileOperationExecutor {
    /// Pick the path to write. A token naming a file directly (containing a
    /// `.`) wins; failing that, a subtask about "configuration" maps to the
    /// canonical `config/config.yml` rather than falling through to a
    /// generic placeholder.
    fn target_file(details: &SubtaskDetails) -> Option<String> {
        let dotted = details
            .description
            .split_whitespace()
            .chain(details.validation_criteria.iter().flat_map(|c| c.split_whitespace()))
            .find(|token| token.contains('.') && !token.starts_with("http"))
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '.' && c != '/' && c != '_' && c != '-').to_string())
            .filter(|s| !s.is_empty());
        if dotted.is_some() {
            return dotted;
        }

        let haystack = format!("{} {}", details.description, details.validation_criteria.join(" ")).to_lowercase();
        if haystack.contains("config") {
            return Some("config/config.yml".to_string());
        }
        None
    }
}

#[async_trait]
impl Executor for FileOperationExecutor {
    fn name(&self) -> &'static str {
        "FileOperationExecutor"
    }

    fn can_execute(&self, details: &SubtaskDetails) -> bool {
        if details.is_unknown {
            return false;
        }
        let haystack = format!("{} {}", details.description, details.validation_criteria.join(" ")).to_lowercase();
        haystack.contains("file") || haystack.contains("config") || Self::target_file(details).is_some()
    }

    async fn execute(&self, details: &SubtaskDetails, workspace_root: &Path) -> Result<ExecutionOutcome> {
        let tools = FilesystemTools::new(workspace_root);
        let path = Self::target_file(details).unwrap_or_else(|| format!("generated_files/{}.txt", details.reference));
        let content = format!("# {}\n\n{}\n", details.name, details.description);
        tools.write_file(&path, &content).await?;

        Ok(ExecutionOutcome {
            success: true,
            message: format!("created '{path}'"),
            artifacts_created: vec![path.clone()],
            file_content: Some(content),
            file_path: Some(path),
            error: None,
        })
    }
}

/// The required fallback: always accepts, marks the subtask done with a
/// neutral message and no artifacts.
pub struct GenericExecutor;

#[async_trait]
impl Executor for GenericExecutor {
    fn name(&self) -> &'static str {
        "GenericExecutor"
    }

    fn can_execute(&self, _details: &SubtaskDetails) -> bool {
        true
    }

    async fn execute(&self, details: &SubtaskDetails, _workspace_root: &Path) -> Result<ExecutionOutcome> {
        Ok(ExecutionOutcome {
            success: !details.is_unknown,
            message: if details.is_unknown {
                format!("no such subtask '{}'", details.reference)
            } else {
                format!("completed '{}' with no specific handling", details.name)
            },
            artifacts_created: Vec::new(),
            file_content: None,
            file_path: None,
            error: if details.is_unknown {
                Some(format!("subtask '{}' does not exist", details.reference))
            } else {
                None
            },
        })
    }
}

/// The standard priority-ordered executor list: file operations first, the
/// generic fallback last.
pub fn default_executors() -> Vec<Box<dyn Executor>> {
    vec![Box::new(FileOperationExecutor), Box::new(GenericExecutor)]
}

fn select_executor<'a>(executors: &'a [Box<dyn Executor>], details: &SubtaskDetails) -> &'a dyn Executor {
    executors
        .iter()
        .find(|e| e.can_execute(details))
        .map(|e| e.as_ref())
        .expect("GenericExecutor always accepts")
}

/// Evaluate one validation criterion against the executor's outcome
/// (§4.8's four heuristics).
fn criterion_passes(criterion: &str, outcome: &ExecutionOutcome) -> bool {
    let lower = criterion.to_lowercase();
    if lower.contains("exist") {
        return !outcome.artifacts_created.is_empty();
    }
    if lower.contains("yaml") {
        return outcome
            .file_content
            .as_deref()
            .map(|content| serde_yaml_syntax_ok(content))
            .unwrap_or(false);
    }
    if lower.contains("key") {
        let content = outcome.file_content.as_deref().unwrap_or("");
        let tokens: Vec<&str> = criterion
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
            .collect();
        let key_pos = tokens.iter().position(|t| t.eq_ignore_ascii_case("key") || t.eq_ignore_ascii_case("keys"));
        let keys: Vec<&str> = key_pos.map(|pos| tokens[pos + 1..].to_vec()).unwrap_or_default();
        return !keys.is_empty() && keys.iter().all(|k| content.contains(k));
    }
    if lower.contains("contains") {
        let content = outcome.file_content.as_deref().unwrap_or("");
        return criterion
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|token| token.len() > 2)
            .any(|token| content.contains(token));
    }
    outcome.success
}

/// Minimal YAML well-formedness check: every non-blank, non-comment line is
/// either a list item or a `key: value` pair, with no tabs.
fn serde_yaml_syntax_ok(content: &str) -> bool {
    content.lines().all(|line| {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
            return true;
        }
        if trimmed.contains('\t') {
            return false;
        }
        let stripped = trimmed.trim_start();
        stripped.starts_with('-') || stripped.contains(':')
    })
}

/// Result of running [`ExecutionEngine::execute_task`], returned to the
/// caller for display and also what the tracker records.
#[derive(Debug, Clone)]
pub struct FlowResult {
    pub task_ref: String,
    pub executor_used: &'static str,
    pub status: SubtaskStatus,
    pub message: String,
    pub failed_criteria: Vec<String>,
}

pub struct ExecutionEngine {
    executors: Vec<Box<dyn Executor>>,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self {
            executors: default_executors(),
        }
    }
}

impl ExecutionEngine {
    pub fn new(executors: Vec<Box<dyn Executor>>) -> Self {
        Self { executors }
    }

    /// Runs one subtask end-to-end and leaves `task`'s in-memory tree
    /// updated; the caller is responsible for persisting it afterward.
    pub async fn execute_task(
        &self,
        task: &mut Task,
        task_ref: &str,
        workspace_root: &Path,
        breaker: &mut SubtaskCircuitBreaker,
    ) -> Result<FlowResult> {
        let details = match task.subtask_by_reference(task_ref) {
            Ok(subtask) => SubtaskDetails::from_subtask(task_ref, subtask),
            Err(_) => SubtaskDetails::unknown(task_ref),
        };

        let executor = select_executor(&self.executors, &details);

        if let Ok(subtask) = task.subtask_by_reference_mut(task_ref) {
            subtask.start();
        }

        let outcome = executor.execute(&details, workspace_root).await?;

        let failed_criteria: Vec<String> = details
            .validation_criteria
            .iter()
            .filter(|c| !criterion_passes(c, &outcome))
            .cloned()
            .collect();

        let all_passed = outcome.success && failed_criteria.is_empty();

        let status = if details.is_unknown {
            SubtaskStatus::Failed
        } else if let Ok(subtask) = task.subtask_by_reference_mut(task_ref) {
            if all_passed {
                subtask.complete(Some(outcome.message.clone()));
                breaker.reset(task_ref);
                SubtaskStatus::Completed
            } else {
                let kind = if !outcome.success {
                    FailureKind::ExecutorMismatch
                } else {
                    FailureKind::ValidationFailed
                };
                let error = if failed_criteria.is_empty() {
                    outcome.error.clone().unwrap_or_else(|| outcome.message.clone())
                } else {
                    format!("failed criteria: {}", failed_criteria.join(", "))
                };
                subtask.fail(error);
                if breaker.record_failure(task_ref, kind) == BreakerAction::Block {
                    subtask.status = SubtaskStatus::Blocked;
                }
                subtask.status
            }
        } else {
            SubtaskStatus::Failed
        };

        Ok(FlowResult {
            task_ref: task_ref.to_string(),
            executor_used: executor.name(),
            status,
            message: outcome.message,
            failed_criteria,
        })
    }
}

/// `ProgressSummary(ref)`: status counts, percent complete, and whether any
/// descendant still needs human validation.
#[derive(Debug, Clone, Default)]
pub struct ProgressSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub percent_complete: f64,
    pub needs_validation: bool,
}

pub fn progress_summary(task: &Task, stage_id: &str) -> Result<ProgressSummary> {
    let stage = task.stage(stage_id)?;
    let mut summary = ProgressSummary::default();
    for work in &stage.work_packages {
        for exec_task in &work.tasks {
            for subtask in &exec_task.subtasks {
                summary.total += 1;
                match subtask.status {
                    SubtaskStatus::Completed => summary.completed += 1,
                    SubtaskStatus::Failed => summary.failed += 1,
                    SubtaskStatus::Blocked => summary.blocked += 1,
                    SubtaskStatus::ReadyForValidation => summary.needs_validation = true,
                    _ => {}
                }
            }
        }
    }
    summary.percent_complete = if summary.total == 0 {
        0.0
    } else {
        (summary.completed as f64 / summary.total as f64) * 100.0
    };
    Ok(summary)
}

/// `CheckDependencies(ref)`: a subtask is blocked iff an earlier sibling (by
/// `sequence_order`) has not completed; an executable task/work/stage is
/// blocked iff any of its named `dependencies[]` is unresolved.
pub fn subtask_is_blocked(siblings: &[Subtask], subtask: &Subtask) -> bool {
    siblings
        .iter()
        .any(|sibling| sibling.sequence_order < subtask.sequence_order && sibling.status != SubtaskStatus::Completed)
}

/// `SuggestValidationWorkflow(ref)`: once every subtask under an executable
/// task is `COMPLETED`, emit a short checklist for a human validator.
pub fn suggest_validation_workflow(task: &Task, executable_task_id: &str) -> Result<Vec<String>> {
    let exec_task = task
        .find_executable_task_by_id(executable_task_id)
        .ok_or_else(|| orchestrator_core::error::TaskError::not_found_component("executable task", executable_task_id))?;

    let all_completed = !exec_task.subtasks.is_empty() && exec_task.subtasks.iter().all(|s| s.status == SubtaskStatus::Completed);
    if !all_completed {
        return Ok(Vec::new());
    }

    let mut checklist = vec![format!("Review deliverables for '{}'", exec_task.name)];
    for artifact in &exec_task.generated_artifacts {
        checklist.push(format!("Confirm artifact '{}' matches its description", artifact.name));
    }
    for criterion in &exec_task.validation_criteria {
        checklist.push(format!("Verify: {criterion}"));
    }
    checklist.push("Mark the executable task validated or reopen it with feedback".to_string());
    Ok(checklist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::{Artifact, ArtifactKind, ArtifactLocation, ExecutableTask, ExecutorType, NetworkPlan, Stage, Work};

    fn task_with_subtask(description: &str, criteria: Vec<&str>) -> Task {
        let mut task = Task::new("t1".into(), "p1".into(), "build it".into());
        let subtask = Subtask::new(
            "S1_W1_ET1_ST1".into(),
            "S1_W1_ET1".into(),
            "write config".into(),
            description.into(),
            ExecutorType::AiAgent,
            0,
        );
        let mut subtask = subtask;
        subtask.validation_criteria = criteria.into_iter().map(String::from).collect();

        let exec_task = ExecutableTask {
            id: "S1_W1_ET1".into(),
            work_id: "S1_W1".into(),
            name: "configure".into(),
            description: "write configuration".into(),
            required_inputs: vec![],
            generated_artifacts: vec![Artifact {
                name: "config".into(),
                kind: ArtifactKind::Document,
                description: "config file".into(),
                location: ArtifactLocation::Planned,
            }],
            validation_criteria: vec![],
            sequence_order: 0,
            dependencies: vec![],
            subtasks: vec![subtask],
            status: SubtaskStatus::Pending,
            error_message: None,
            started_at: None,
            completed_at: None,
        };
        let work = Work {
            id: "S1_W1".into(),
            stage_id: "S1".into(),
            name: "setup".into(),
            description: "set up".into(),
            required_inputs: vec![],
            expected_outcome: "done".into(),
            generated_artifacts: vec![],
            validation_criteria: vec![],
            sequence_order: 0,
            dependencies: vec![],
            tasks: vec![exec_task],
            status: SubtaskStatus::Pending,
            error_message: None,
            started_at: None,
            completed_at: None,
        };
        let stage = Stage {
            id: "S1".into(),
            name: "bootstrap".into(),
            description: "bootstrap".into(),
            result: vec![],
            what_should_be_delivered: vec![],
            checkpoints: vec![],
            work_packages: vec![work],
            status: SubtaskStatus::Pending,
            error_message: None,
            started_at: None,
            completed_at: None,
        };
        task.network_plan = NetworkPlan {
            stages: vec![stage],
            dependencies: vec![],
        };
        task
    }

    #[tokio::test]
    async fn file_operation_executor_creates_the_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = task_with_subtask("create the app.yaml config file", vec!["file app.yaml exists"]);
        let mut breaker = SubtaskCircuitBreaker::new();
        let engine = ExecutionEngine::default();

        let result = engine
            .execute_task(&mut task, "S1_W1_ET1_ST1", dir.path(), &mut breaker)
            .await
            .unwrap();

        assert_eq!(result.status, SubtaskStatus::Completed);
        assert_eq!(result.executor_used, "FileOperationExecutor");
        assert!(dir.path().join("app.yaml").exists());
    }

    #[tokio::test]
    async fn generic_executor_handles_non_file_subtasks() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = task_with_subtask("summarize the findings", vec![]);
        let mut breaker = SubtaskCircuitBreaker::new();
        let engine = ExecutionEngine::default();

        let result = engine
            .execute_task(&mut task, "S1_W1_ET1_ST1", dir.path(), &mut breaker)
            .await
            .unwrap();

        assert_eq!(result.status, SubtaskStatus::Completed);
        assert_eq!(result.executor_used, "GenericExecutor");
    }

    #[tokio::test]
    async fn unknown_reference_yields_failed_without_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = task_with_subtask("create the app.yaml config file", vec![]);
        let mut breaker = SubtaskCircuitBreaker::new();
        let engine = ExecutionEngine::default();

        let result = engine
            .execute_task(&mut task, "S1_W1_ET1_ST99", dir.path(), &mut breaker)
            .await
            .unwrap();

        assert_eq!(result.status, SubtaskStatus::Failed);
    }

    #[tokio::test]
    async fn repeated_validation_failures_eventually_block_the_subtask() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = task_with_subtask("create the app.yaml config file", vec!["contains required-key database"]);
        let mut breaker = SubtaskCircuitBreaker::new();
        let engine = ExecutionEngine::default();

        let mut last_status = SubtaskStatus::Pending;
        for _ in 0..3 {
            let result = engine
                .execute_task(&mut task, "S1_W1_ET1_ST1", dir.path(), &mut breaker)
                .await
                .unwrap();
            last_status = result.status;
        }
        assert_eq!(last_status, SubtaskStatus::Blocked);
    }

    #[tokio::test]
    async fn configuration_subtask_without_dotted_filename_maps_to_config_yml() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = task_with_subtask(
            "write the configuration file with api_base_url set",
            vec!["file exists", "contains key api_base_url"],
        );
        let mut breaker = SubtaskCircuitBreaker::new();
        let engine = ExecutionEngine::default();

        let result = engine
            .execute_task(&mut task, "S1_W1_ET1_ST1", dir.path(), &mut breaker)
            .await
            .unwrap();

        assert_eq!(result.status, SubtaskStatus::Completed);
        assert!(dir.path().join("config/config.yml").exists());
    }

    #[test]
    fn required_keys_criterion_needs_every_named_key() {
        let outcome = ExecutionOutcome {
            success: true,
            message: String::new(),
            artifacts_created: vec!["config/config.yml".into()],
            file_content: Some("api_base_url: https://example.com\n".into()),
            file_path: Some("config/config.yml".into()),
            error: None,
        };
        assert!(criterion_passes("contains key api_base_url", &outcome));
        assert!(!criterion_passes("contains keys api_base_url timeout", &outcome));
    }

    #[test]
    fn progress_summary_counts_by_status() {
        let mut task = task_with_subtask("create app.yaml", vec![]);
        task.network_plan.stages[0].work_packages[0].tasks[0].subtasks[0].status = SubtaskStatus::Completed;
        let summary = progress_summary(&task, "S1").unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.percent_complete, 100.0);
    }

    #[test]
    fn validation_workflow_only_suggested_once_all_subtasks_complete() {
        let mut task = task_with_subtask("create app.yaml", vec!["file exists"]);
        assert!(suggest_validation_workflow(&task, "S1_W1_ET1").unwrap().is_empty());

        task.network_plan.stages[0].work_packages[0].tasks[0].subtasks[0].status = SubtaskStatus::Completed;
        let checklist = suggest_validation_workflow(&task, "S1_W1_ET1").unwrap();
        assert!(!checklist.is_empty());
    }
}
