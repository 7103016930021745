//! Core domain models for the task-planning orchestrator.
//!
//! The aggregate root is [`Task`]; it exclusively owns every [`Stage`],
//! [`Work`], [`ExecutableTask`] and [`Subtask`] beneath it. None of the
//! descendant levels has an independent lifetime — they are born and die
//! with their parent `Task`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level user goal: refined problem statement, full planning context,
/// and the hierarchical execution plan once one has been generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Globally unique task identifier.
    pub id: String,
    /// Human-readable slug used as the workspace/project key.
    pub project_id: String,
    /// Current lifecycle state (see [`TaskState`]).
    pub state: TaskState,
    /// The raw query as submitted by the user.
    pub short_description: String,
    /// The refined, fully scoped task statement (set once formed).
    pub task: String,
    /// Accumulated free-text context gathered so far.
    pub context: String,
    /// Ordered question/answer pairs; unanswered entries carry `answer: None`.
    pub context_answers: Vec<ContextAnswer>,
    /// The six-dimension scope (what/why/who/where/when/how).
    pub scope: Scope,
    /// Ideal Final Result, once generated.
    pub ifr: Option<Ifr>,
    /// Requirements/constraints/limitations/resources/tools/definitions.
    pub requirements: Option<Requirements>,
    /// Ordered stages plus their dependency edges.
    pub network_plan: NetworkPlan,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a brand-new task in state [`TaskState::New`].
    pub fn new(id: String, project_id: String, short_description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            project_id,
            state: TaskState::New,
            short_description,
            task: String::new(),
            context: String::new(),
            context_answers: Vec::new(),
            scope: Scope::default(),
            ifr: None,
            requirements: None,
            network_plan: NetworkPlan::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Touch the `updated_at` timestamp. Every mutator that changes
    /// persisted state should call this immediately before returning.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Task lifecycle states (§4.2). Ordered roughly in the sequence a task
/// progresses through during planning.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskState {
    New,
    ContextGathering,
    ContextGathered,
    TaskFormation,
    IfrGenerated,
    RequirementsDefined,
    NetworkPlanGenerated,
    Executing,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::New => "NEW",
            TaskState::ContextGathering => "CONTEXT_GATHERING",
            TaskState::ContextGathered => "CONTEXT_GATHERED",
            TaskState::TaskFormation => "TASK_FORMATION",
            TaskState::IfrGenerated => "IFR_GENERATED",
            TaskState::RequirementsDefined => "REQUIREMENTS_DEFINED",
            TaskState::NetworkPlanGenerated => "NETWORK_PLAN_GENERATED",
            TaskState::Executing => "EXECUTING",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// One question/answer pair accumulated during context gathering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContextAnswer {
    pub question: String,
    /// `None` while the question is still open.
    pub answer: Option<String>,
}

impl ContextAnswer {
    pub fn pending(question: String) -> Self {
        Self {
            question,
            answer: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.answer.is_none()
    }
}

/// The six scope dimensions, formulated in this canonical order.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScopeDimension {
    What,
    Why,
    Who,
    Where,
    When,
    How,
}

impl ScopeDimension {
    /// The canonical traversal order used by scope formulation (§4.5).
    pub const ORDER: [ScopeDimension; 6] = [
        ScopeDimension::What,
        ScopeDimension::Why,
        ScopeDimension::Who,
        ScopeDimension::Where,
        ScopeDimension::When,
        ScopeDimension::How,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeDimension::What => "what",
            ScopeDimension::Why => "why",
            ScopeDimension::Who => "who",
            ScopeDimension::Where => "where",
            ScopeDimension::When => "when",
            ScopeDimension::How => "how",
        }
    }
}

/// Status of a single scope dimension.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DimensionStatus {
    #[default]
    Unanswered,
    Draft,
    Locked,
}

/// One scope dimension's accumulated answer and lock status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScopeEntry {
    pub content: String,
    pub status: DimensionStatus,
}

/// The six-dimension scope plus its draft narrative and overall status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Scope {
    pub what: ScopeEntry,
    pub why: ScopeEntry,
    pub who: ScopeEntry,
    pub where_: ScopeEntry,
    pub when: ScopeEntry,
    pub how: ScopeEntry,
    /// Free-text synthesized draft produced by `GenerateDraftScope`.
    pub draft: String,
    pub validation_criteria: Vec<String>,
    pub status: DimensionStatus,
}

impl Scope {
    /// Borrow the entry for a given dimension.
    pub fn entry(&self, dimension: ScopeDimension) -> &ScopeEntry {
        match dimension {
            ScopeDimension::What => &self.what,
            ScopeDimension::Why => &self.why,
            ScopeDimension::Who => &self.who,
            ScopeDimension::Where => &self.where_,
            ScopeDimension::When => &self.when,
            ScopeDimension::How => &self.how,
        }
    }

    /// Mutably borrow the entry for a given dimension.
    pub fn entry_mut(&mut self, dimension: ScopeDimension) -> &mut ScopeEntry {
        match dimension {
            ScopeDimension::What => &mut self.what,
            ScopeDimension::Why => &mut self.why,
            ScopeDimension::Who => &mut self.who,
            ScopeDimension::Where => &mut self.where_,
            ScopeDimension::When => &mut self.when,
            ScopeDimension::How => &mut self.how,
        }
    }
}

/// Ideal Final Result: a structured articulation of "done" for the task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Ifr {
    pub statement: String,
    pub success_criteria: Vec<String>,
    pub expected_outcomes: Vec<String>,
    pub quality_metrics: Vec<String>,
    pub validation_checklist: Vec<String>,
}

/// Requirements derived from scope + IFR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Requirements {
    pub requirements: Vec<String>,
    pub constraints: Vec<String>,
    pub limitations: Vec<String>,
    pub resources: Vec<String>,
    pub tools: Vec<String>,
    pub definitions: Vec<String>,
}

/// A concrete deliverable, referenced by name + location so that later
/// steps can name it as a required input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub description: String,
    pub location: ArtifactLocation,
}

/// The artifact's category.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArtifactKind {
    Document,
    Software,
    Physical,
    Data,
}

/// Stable enumerated set of locations an artifact can live at, so that a
/// `generated_artifacts` entry at step N can be referenced as a
/// `required_inputs` entry at step N+1 by name + location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "path")]
pub enum ArtifactLocation {
    /// A path inside the task workspace's `generated_files/` directory.
    Workspace(String),
    /// An external URL (e.g. a deployed service, a hosted document).
    External(String),
    /// Not yet materialized anywhere; exists only as a plan entry.
    Planned,
}

/// The ordered list of [`Stage`]s plus sibling dependency edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NetworkPlan {
    pub stages: Vec<Stage>,
    /// Edges `(from_stage_id, to_stage_id)`; `to` depends on `from`.
    pub dependencies: Vec<(String, String)>,
}

/// `S<n>`: one stage of the network plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub result: Vec<String>,
    pub what_should_be_delivered: Vec<Artifact>,
    pub checkpoints: Vec<String>,
    pub work_packages: Vec<Work>,
    /// Execution status, derived by the traversal helpers' `start_stage` /
    /// `complete_stage` / `fail_stage` mutators, not by the planning façade.
    #[serde(default)]
    pub status: SubtaskStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// `S<n>_W<m>`: one work package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Work {
    pub id: String,
    /// The owning stage's ID (cached convenience; the ID prefix already
    /// encodes this, but traversal helpers read the field directly).
    pub stage_id: String,
    pub name: String,
    pub description: String,
    pub required_inputs: Vec<Artifact>,
    pub expected_outcome: String,
    pub generated_artifacts: Vec<Artifact>,
    pub validation_criteria: Vec<String>,
    pub sequence_order: u32,
    /// Sibling `Work` IDs this one depends on.
    pub dependencies: Vec<String>,
    pub tasks: Vec<ExecutableTask>,
    #[serde(default)]
    pub status: SubtaskStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// `S<n>_W<m>_ET<k>`: one executable task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutableTask {
    pub id: String,
    pub work_id: String,
    pub name: String,
    pub description: String,
    pub required_inputs: Vec<Artifact>,
    pub generated_artifacts: Vec<Artifact>,
    pub validation_criteria: Vec<String>,
    pub sequence_order: u32,
    /// Sibling `ExecutableTask` IDs this one depends on.
    pub dependencies: Vec<String>,
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub status: SubtaskStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// `S<n>_W<m>_ET<k>_ST<p>`: the atomic unit of execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtask {
    pub id: String,
    pub executable_task_id: String,
    pub name: String,
    pub description: String,
    pub executor_type: ExecutorType,
    pub sequence_order: u32,
    /// Sibling `Subtask` IDs this one depends on.
    pub dependencies: Vec<String>,
    pub status: SubtaskStatus,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub validation_criteria: Vec<String>,
    /// Consecutive FAILED count; used by the execution engine's circuit
    /// breaker to decide when to stop re-offering this subtask (§4.8 supplement).
    #[serde(default)]
    pub failure_count: u32,
}

impl Subtask {
    pub fn new(
        id: String,
        executable_task_id: String,
        name: String,
        description: String,
        executor_type: ExecutorType,
        sequence_order: u32,
    ) -> Self {
        Self {
            id,
            executable_task_id,
            name,
            description,
            executor_type,
            sequence_order,
            dependencies: Vec::new(),
            status: SubtaskStatus::Pending,
            result: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            validation_criteria: Vec::new(),
            failure_count: 0,
        }
    }

    /// Mark the subtask as started: sets status, timestamp, clears any
    /// prior completion data.
    pub fn start(&mut self) {
        self.status = SubtaskStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.error_message = None;
    }

    /// Mark the subtask as completed: clears `error_message`.
    pub fn complete(&mut self, result: Option<String>) {
        self.status = SubtaskStatus::Completed;
        self.result = result;
        self.error_message = None;
        self.completed_at = Some(Utc::now());
        self.failure_count = 0;
    }

    /// Mark the subtask as failed: records the error and bumps the
    /// consecutive failure counter.
    pub fn fail(&mut self, error: String) {
        self.status = SubtaskStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(Utc::now());
        self.failure_count += 1;
    }
}

/// Who (or what) performs a subtask.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutorType {
    AiAgent,
    Robot,
    Human,
}

/// Subtask execution status (§3.4). Reused for Stage/Work/ExecutableTask
/// status tracking since the same vocabulary applies one level up.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SubtaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Blocked,
    ReadyForValidation,
}

impl std::fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubtaskStatus::Pending => "PENDING",
            SubtaskStatus::InProgress => "IN_PROGRESS",
            SubtaskStatus::Completed => "COMPLETED",
            SubtaskStatus::Failed => "FAILED",
            SubtaskStatus::Cancelled => "CANCELLED",
            SubtaskStatus::Blocked => "BLOCKED",
            SubtaskStatus::ReadyForValidation => "READY_FOR_VALIDATION",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_in_new_state() {
        let task = Task::new("t1".into(), "daily-sales-dashboard".into(), "build it".into());
        assert_eq!(task.state, TaskState::New);
        assert!(task.context_answers.is_empty());
        assert!(task.network_plan.stages.is_empty());
    }

    #[test]
    fn subtask_lifecycle_clears_stale_fields() {
        let mut st = Subtask::new(
            "S1_W1_ET1_ST1".into(),
            "S1_W1_ET1".into(),
            "write config".into(),
            "create the yaml config file".into(),
            ExecutorType::AiAgent,
            0,
        );
        st.fail("boom".into());
        assert_eq!(st.status, SubtaskStatus::Failed);
        assert_eq!(st.failure_count, 1);

        st.start();
        assert_eq!(st.status, SubtaskStatus::InProgress);
        assert!(st.error_message.is_none());
        assert!(st.completed_at.is_none());

        st.complete(Some("done".into()));
        assert_eq!(st.status, SubtaskStatus::Completed);
        assert!(st.error_message.is_none());
        assert!(st.started_at <= st.completed_at);
        assert_eq!(st.failure_count, 0);
    }

    #[test]
    fn scope_dimension_order_is_canonical() {
        assert_eq!(
            ScopeDimension::ORDER.map(|d| d.as_str()),
            ["what", "why", "who", "where", "when", "how"]
        );
    }

    #[test]
    fn context_answer_pending_state() {
        let q = ContextAnswer::pending("Who is the primary user?".into());
        assert!(q.is_pending());
    }
}
