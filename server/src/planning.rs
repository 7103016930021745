//! Planning Pipeline (C6): drives a [`Task`] from `NEW` to
//! `NETWORK_PLAN_GENERATED` one phase at a time. Every method follows the
//! same shape — validate precondition, invoke the façade, apply the result,
//! transition state — and leaves persistence to the caller, so a single
//! `TaskStore::save_task` after each call is the only place writes happen.

use std::collections::HashSet;

use async_trait::async_trait;
use orchestrator_core::error::{Result, TaskError};
use orchestrator_core::ids;
use orchestrator_core::models::{ContextAnswer, DimensionStatus, Ifr, NetworkPlan, Requirements, Scope, ScopeDimension, Task, TaskState};
use orchestrator_core::protocol::{AgentFacade, ContextSufficiency, LLMClient, ScopeValidation};
use orchestrator_core::state_machine::{self, TaskEvent};

/// Lowercase phrases that terminate context gathering regardless of what the
/// LLM still wants to ask (§4.5). Configurable so a deployment is not stuck
/// with only the English defaults.
pub fn default_idk_phrases() -> HashSet<String> {
    ["i don't know", "not sure", "no idea"].into_iter().map(String::from).collect()
}

enum CreatorCriticMode {
    Create,
    Critic,
}

/// The number of Creator/Critic rounds before the loop returns whatever plan
/// it has, per §4.6.
const MAX_NETWORK_PLAN_ITER: u32 = 3;

pub struct PlanningPipeline<C: LLMClient> {
    facade: AgentFacade<C>,
    idk_phrases: HashSet<String>,
}

impl<C: LLMClient> PlanningPipeline<C> {
    pub fn new(facade: AgentFacade<C>) -> Self {
        Self {
            facade,
            idk_phrases: default_idk_phrases(),
        }
    }

    pub fn with_idk_phrases(mut self, phrases: HashSet<String>) -> Self {
        self.idk_phrases = phrases;
        self
    }

    fn counts_as_idk(&self, answer: &str) -> bool {
        let lower = answer.to_lowercase();
        self.idk_phrases.iter().any(|phrase| lower.contains(phrase.as_str()))
    }

    fn idk_answer_count(&self, task: &Task) -> usize {
        task.context_answers
            .iter()
            .filter_map(|qa| qa.answer.as_deref())
            .filter(|answer| self.counts_as_idk(answer))
            .count()
    }

    /// `NEW` → `CONTEXT_GATHERING`.
    pub fn begin_context_gathering(&self, task: &mut Task) -> Result<()> {
        task.state = state_machine::transition(task.state, TaskEvent::BeginContextGathering, false)?;
        task.touch();
        Ok(())
    }

    /// Apply answers to open questions, then ask the façade (unless a
    /// termination rule already fired) whether enough context has been
    /// gathered. On sufficiency, transitions to `CONTEXT_GATHERED`.
    pub async fn submit_context_answers(
        &self,
        task: &mut Task,
        answers: &[(String, String)],
        force: bool,
    ) -> Result<ContextSufficiency> {
        if task.state != TaskState::ContextGathering {
            return Err(TaskError::InvalidState(format!(
                "cannot submit context answers while task is in state {}",
                task.state
            )));
        }

        for (question, answer) in answers {
            match task.context_answers.iter_mut().find(|qa| &qa.question == question && qa.is_pending()) {
                Some(qa) => qa.answer = Some(answer.clone()),
                None => task.context_answers.push(ContextAnswer {
                    question: question.clone(),
                    answer: Some(answer.clone()),
                }),
            }
            task.context.push_str(&format!("\nQ: {question}\nA: {answer}"));
        }

        let terminated_early = force || self.idk_answer_count(task) >= 3;

        let sufficiency = if terminated_early {
            ContextSufficiency {
                sufficient: true,
                questions: Vec::new(),
            }
        } else {
            self.facade.analyze_context_sufficiency(task).await?
        };

        if sufficiency.sufficient {
            task.state = state_machine::transition(task.state, TaskEvent::CompleteContextGathering, false)?;
        } else {
            for question in &sufficiency.questions {
                task.context_answers.push(ContextAnswer::pending(question.clone()));
            }
        }
        task.touch();
        Ok(sufficiency)
    }

    /// Append reviewer feedback and reopen context gathering (the `force`
    /// escape hatch from `CONTEXT_GATHERED` back to `CONTEXT_GATHERING`).
    pub fn edit_context(&self, task: &mut Task, feedback: &str) -> Result<()> {
        task.state = state_machine::transition(task.state, TaskEvent::BeginContextGathering, true)?;
        task.context.push_str(&format!("\nEditor feedback: {feedback}"));
        task.touch();
        Ok(())
    }

    /// `CONTEXT_GATHERED` → `TASK_FORMATION`, entered once when scope
    /// formulation begins.
    pub fn begin_task_formation(&self, task: &mut Task, refined_statement: String) -> Result<()> {
        task.state = state_machine::transition(task.state, TaskEvent::FormTask, false)?;
        task.task = refined_statement;
        task.touch();
        Ok(())
    }

    /// `GET /formulate/{dimension}`: produce the next clarifying question for
    /// one scope dimension.
    pub async fn formulate_dimension(&self, task: &Task, dimension: ScopeDimension) -> Result<String> {
        self.require_task_formation(task)?;
        self.facade.formulate_scope_question(task, dimension).await
    }

    /// `POST /formulate/{dimension}`: record and lock the dimension's answer.
    /// Every dimension earlier in [`ScopeDimension::ORDER`] must already be
    /// locked, since later dimensions are formulated with earlier ones as
    /// context (§4.5).
    pub fn answer_dimension(&self, task: &mut Task, dimension: ScopeDimension, answer: String) -> Result<()> {
        self.require_task_formation(task)?;
        for earlier in ScopeDimension::ORDER {
            if earlier == dimension {
                break;
            }
            if task.scope.entry(earlier).status != DimensionStatus::Locked {
                return Err(TaskError::InvalidState(format!(
                    "dimension '{}' must be answered before '{}'",
                    earlier.as_str(),
                    dimension.as_str()
                )));
            }
        }
        let entry = task.scope.entry_mut(dimension);
        entry.content = answer;
        entry.status = DimensionStatus::Locked;
        task.touch();
        Ok(())
    }

    /// `GET /draft-scope`: synthesize the locked dimensions into one
    /// narrative, requiring every dimension to be locked first.
    pub async fn generate_draft_scope(&self, task: &mut Task) -> Result<Scope> {
        self.require_task_formation(task)?;
        for dimension in ScopeDimension::ORDER {
            if task.scope.entry(dimension).status != DimensionStatus::Locked {
                return Err(TaskError::InvalidState(format!(
                    "dimension '{}' is not yet locked",
                    dimension.as_str()
                )));
            }
        }
        let drafted = self.facade.generate_draft_scope(task).await?;
        task.scope.draft = drafted.draft.clone();
        task.scope.validation_criteria = drafted.validation_criteria.clone();
        task.touch();
        Ok(task.scope.clone())
    }

    /// `POST /validate-scope`. Rejection appends feedback and leaves the
    /// scope in `Draft` for another `generate_draft_scope` round; approval
    /// runs the façade's own consistency check and locks the scope overall
    /// only if it agrees.
    pub async fn validate_scope(&self, task: &mut Task, is_approved: bool, feedback: Option<&str>) -> Result<ScopeValidation> {
        self.require_task_formation(task)?;
        if !is_approved {
            task.scope.status = DimensionStatus::Draft;
            if let Some(fb) = feedback {
                task.scope.draft.push_str(&format!("\n\nReviewer feedback: {fb}"));
            }
            task.touch();
            return Ok(ScopeValidation {
                valid: false,
                issues: feedback.map(|f| vec![f.to_string()]).unwrap_or_default(),
            });
        }

        let result = self.facade.validate_scope(&task.scope).await?;
        if result.valid {
            task.scope.status = DimensionStatus::Locked;
        }
        task.touch();
        Ok(result)
    }

    /// `POST /ifr`: `TASK_FORMATION` → `IFR_GENERATED` directly — the scope
    /// sign-off above is this state's exit criterion, so there is no
    /// separate re-entry into context gathering on the way to IFR.
    pub async fn generate_ifr(&self, task: &mut Task) -> Result<Ifr> {
        if task.scope.status != DimensionStatus::Locked {
            return Err(TaskError::InvalidState("scope must be validated before generating the IFR".into()));
        }
        let next = state_machine::transition(task.state, TaskEvent::GenerateIfr, false)?;
        let ifr = self.facade.generate_ifr(task).await?;
        task.ifr = Some(ifr.clone());
        task.state = next;
        task.touch();
        Ok(ifr)
    }

    /// `POST /requirements`: `IFR_GENERATED` → `REQUIREMENTS_DEFINED`.
    pub async fn define_requirements(&self, task: &mut Task) -> Result<Requirements> {
        if task.ifr.is_none() {
            return Err(TaskError::MissingComponent("task has no IFR yet".into()));
        }
        let next = state_machine::transition(task.state, TaskEvent::DefineRequirements, false)?;
        let requirements = self.facade.define_requirements(task).await?;
        task.requirements = Some(requirements.clone());
        task.state = next;
        task.touch();
        Ok(requirements)
    }

    /// `POST /network-plan?force=`: runs the bounded Creator/Critic loop
    /// (§4.6) and transitions to `NETWORK_PLAN_GENERATED`, or regenerates in
    /// place via the `force`-gated escape hatch if a plan already exists.
    pub async fn generate_network_plan(&self, task: &mut Task, force: bool) -> Result<NetworkPlan> {
        let event = if task.state == TaskState::NetworkPlanGenerated {
            TaskEvent::RegenerateNetworkPlan
        } else {
            TaskEvent::GenerateNetworkPlan
        };
        let next = state_machine::transition(task.state, event, force)?;
        let plan = self.run_creator_critic_loop(task).await?;
        task.network_plan = plan.clone();
        task.state = next;
        task.touch();
        Ok(plan)
    }

    async fn run_creator_critic_loop(&self, task: &Task) -> Result<NetworkPlan> {
        let mut last_plan: Option<NetworkPlan> = None;
        let mut last_critique: Option<String> = None;
        let mut mode = CreatorCriticMode::Create;

        for iteration in 0..MAX_NETWORK_PLAN_ITER {
            match mode {
                CreatorCriticMode::Create => {
                    match self.facade.generate_network_plan(task, last_critique.as_deref()).await {
                        Ok(plan) => {
                            last_plan = Some(plan);
                            mode = CreatorCriticMode::Critic;
                        }
                        Err(e) => {
                            return last_plan.ok_or(e);
                        }
                    }
                }
                CreatorCriticMode::Critic => {
                    let plan = last_plan.clone().expect("critic only runs after a plan has been created");
                    match self.facade.critique_network_plan(task, &plan).await {
                        Ok(verdict) if verdict.needs_improvement || verdict.score < 8 => {
                            last_critique = Some(verdict.feedback);
                            mode = CreatorCriticMode::Create;
                        }
                        Ok(_) => return Ok(plan),
                        Err(e) => return last_plan.ok_or(e),
                    }
                }
            }
            tracing::debug!(iteration, "network plan creator/critic round complete");
        }

        last_plan.ok_or_else(|| TaskError::AgentError("network plan generation exhausted retries with no usable plan".into()))
    }

    /// Break every stage the Creator produced into work packages, executable
    /// tasks and subtasks, assigning hierarchical IDs as it goes. Called once
    /// after `generate_network_plan` succeeds — the Creator/Critic loop only
    /// reasons about stages, so the rest of the tree is filled in afterward
    /// rather than inside the bounded loop itself.
    pub async fn expand_network_plan(&self, task: &Task, plan: &mut NetworkPlan) -> Result<()> {
        for (stage_index, stage) in plan.stages.iter_mut().enumerate() {
            stage.id = ids::stage_id(stage_index);
            if stage.work_packages.is_empty() {
                stage.work_packages = self.facade.generate_work_for_stage(task, stage).await?;
            }
            for (work_index, work) in stage.work_packages.iter_mut().enumerate() {
                work.id = ids::work_id(&stage.id, work_index);
                work.stage_id = stage.id.clone();
                if work.tasks.is_empty() {
                    work.tasks = self.facade.generate_tasks_for_work(task, work).await?;
                }
                for (task_index, exec_task) in work.tasks.iter_mut().enumerate() {
                    exec_task.id = ids::executable_task_id(&work.id, task_index);
                    exec_task.work_id = work.id.clone();
                    if exec_task.subtasks.is_empty() {
                        exec_task.subtasks = self.facade.generate_subtasks(task, exec_task).await?;
                    }
                    for (subtask_index, subtask) in exec_task.subtasks.iter_mut().enumerate() {
                        subtask.id = ids::subtask_id(&exec_task.id, subtask_index);
                        subtask.executable_task_id = exec_task.id.clone();
                    }
                }
            }
        }
        Ok(())
    }

    /// `NETWORK_PLAN_GENERATED` → `EXECUTING`, entered once the caller starts
    /// executing the first subtask.
    pub fn begin_execution(&self, task: &mut Task) -> Result<()> {
        task.state = state_machine::transition(task.state, TaskEvent::BeginExecution, false)?;
        task.touch();
        Ok(())
    }

    /// `EXECUTING` → `COMPLETED`, once the execution engine reports every
    /// subtask resolved.
    pub fn complete_execution(&self, task: &mut Task) -> Result<()> {
        task.state = state_machine::transition(task.state, TaskEvent::CompleteExecution, false)?;
        task.touch();
        Ok(())
    }

    /// Force the task to `FAILED` from any non-terminal state.
    pub fn fail(&self, task: &mut Task) -> Result<()> {
        task.state = state_machine::transition(task.state, TaskEvent::Fail, false)?;
        task.touch();
        Ok(())
    }

    fn require_task_formation(&self, task: &Task) -> Result<()> {
        if task.state != TaskState::TaskFormation {
            return Err(TaskError::InvalidState(format!(
                "scope formulation requires state TASK_FORMATION, task is in {}",
                task.state
            )));
        }
        Ok(())
    }
}

/// Object-safe facade over [`PlanningPipeline`] so the HTTP layer can hold
/// `Arc<dyn PlanningOps>` instead of being generic over the LLM client —
/// lets tests swap in a scripted client without threading a type parameter
/// through every handler.
#[async_trait]
pub trait PlanningOps: Send + Sync {
    fn begin_context_gathering(&self, task: &mut Task) -> Result<()>;
    async fn submit_context_answers(&self, task: &mut Task, answers: &[(String, String)], force: bool) -> Result<ContextSufficiency>;
    fn edit_context(&self, task: &mut Task, feedback: &str) -> Result<()>;
    fn begin_task_formation(&self, task: &mut Task, refined_statement: String) -> Result<()>;
    async fn formulate_dimension(&self, task: &Task, dimension: ScopeDimension) -> Result<String>;
    fn answer_dimension(&self, task: &mut Task, dimension: ScopeDimension, answer: String) -> Result<()>;
    async fn generate_draft_scope(&self, task: &mut Task) -> Result<Scope>;
    async fn validate_scope(&self, task: &mut Task, is_approved: bool, feedback: Option<&str>) -> Result<ScopeValidation>;
    async fn generate_ifr(&self, task: &mut Task) -> Result<Ifr>;
    async fn define_requirements(&self, task: &mut Task) -> Result<Requirements>;
    async fn generate_network_plan(&self, task: &mut Task, force: bool) -> Result<NetworkPlan>;
    async fn expand_network_plan(&self, task: &Task, plan: &mut NetworkPlan) -> Result<()>;
    fn begin_execution(&self, task: &mut Task) -> Result<()>;
    fn complete_execution(&self, task: &mut Task) -> Result<()>;
    fn fail(&self, task: &mut Task) -> Result<()>;
}

#[async_trait]
impl<C: LLMClient> PlanningOps for PlanningPipeline<C> {
    fn begin_context_gathering(&self, task: &mut Task) -> Result<()> {
        PlanningPipeline::begin_context_gathering(self, task)
    }

    async fn submit_context_answers(&self, task: &mut Task, answers: &[(String, String)], force: bool) -> Result<ContextSufficiency> {
        PlanningPipeline::submit_context_answers(self, task, answers, force).await
    }

    fn edit_context(&self, task: &mut Task, feedback: &str) -> Result<()> {
        PlanningPipeline::edit_context(self, task, feedback)
    }

    fn begin_task_formation(&self, task: &mut Task, refined_statement: String) -> Result<()> {
        PlanningPipeline::begin_task_formation(self, task, refined_statement)
    }

    async fn formulate_dimension(&self, task: &Task, dimension: ScopeDimension) -> Result<String> {
        PlanningPipeline::formulate_dimension(self, task, dimension).await
    }

    fn answer_dimension(&self, task: &mut Task, dimension: ScopeDimension, answer: String) -> Result<()> {
        PlanningPipeline::answer_dimension(self, task, dimension, answer)
    }

    async fn generate_draft_scope(&self, task: &mut Task) -> Result<Scope> {
        PlanningPipeline::generate_draft_scope(self, task).await
    }

    async fn validate_scope(&self, task: &mut Task, is_approved: bool, feedback: Option<&str>) -> Result<ScopeValidation> {
        PlanningPipeline::validate_scope(self, task, is_approved, feedback).await
    }

    async fn generate_ifr(&self, task: &mut Task) -> Result<Ifr> {
        PlanningPipeline::generate_ifr(self, task).await
    }

    async fn define_requirements(&self, task: &mut Task) -> Result<Requirements> {
        PlanningPipeline::define_requirements(self, task).await
    }

    async fn generate_network_plan(&self, task: &mut Task, force: bool) -> Result<NetworkPlan> {
        PlanningPipeline::generate_network_plan(self, task, force).await
    }

    async fn expand_network_plan(&self, task: &Task, plan: &mut NetworkPlan) -> Result<()> {
        PlanningPipeline::expand_network_plan(self, task, plan).await
    }

    fn begin_execution(&self, task: &mut Task) -> Result<()> {
        PlanningPipeline::begin_execution(self, task)
    }

    fn complete_execution(&self, task: &mut Task) -> Result<()> {
        PlanningPipeline::complete_execution(self, task)
    }

    fn fail(&self, task: &mut Task) -> Result<()> {
        PlanningPipeline::fail(self, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orchestrator_core::protocol::LlmRequest;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedClient {
        responses: Vec<Value>,
        next: AtomicU32,
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn complete_structured(&self, _request: LlmRequest) -> orchestrator_core::error::Result<Value> {
            let i = self.next.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self.responses.get(i).cloned().unwrap_or(Value::Null))
        }
    }

    fn pipeline(responses: Vec<Value>) -> PlanningPipeline<ScriptedClient> {
        PlanningPipeline::new(AgentFacade::new(ScriptedClient {
            responses,
            next: AtomicU32::new(0),
        }))
    }

    fn sample_task() -> Task {
        Task::new("t1".into(), "daily-sales-dashboard".into(), "build a dashboard".into())
    }

    #[tokio::test]
    async fn three_idk_answers_terminate_context_gathering_without_llm_call() {
        let pipe = pipeline(vec![]);
        let mut task = sample_task();
        pipe.begin_context_gathering(&mut task).unwrap();

        let answers = vec![
            ("Who is the audience?".to_string(), "I don't know".to_string()),
            ("What timezone?".to_string(), "not sure".to_string()),
            ("Which data source?".to_string(), "no idea".to_string()),
        ];
        let result = pipe.submit_context_answers(&mut task, &answers, false).await.unwrap();
        assert!(result.sufficient);
        assert_eq!(task.state, TaskState::ContextGathered);
    }

    #[tokio::test]
    async fn force_terminates_context_gathering_immediately() {
        let pipe = pipeline(vec![]);
        let mut task = sample_task();
        pipe.begin_context_gathering(&mut task).unwrap();

        let result = pipe.submit_context_answers(&mut task, &[], true).await.unwrap();
        assert!(result.sufficient);
        assert_eq!(task.state, TaskState::ContextGathered);
    }

    #[tokio::test]
    async fn insufficient_context_appends_pending_question() {
        let pipe = pipeline(vec![serde_json::json!({"sufficient": false, "questions": ["What's the deadline?"]})]);
        let mut task = sample_task();
        pipe.begin_context_gathering(&mut task).unwrap();

        let result = pipe
            .submit_context_answers(&mut task, &[("Who is the audience?".into(), "Sales leadership".into())], false)
            .await
            .unwrap();
        assert!(!result.sufficient);
        assert_eq!(task.state, TaskState::ContextGathering);
        assert!(task.context_answers.iter().any(|qa| qa.question == "What's the deadline?" && qa.is_pending()));
    }

    #[tokio::test]
    async fn dimensions_must_be_answered_in_canonical_order() {
        let pipe = pipeline(vec![]);
        let mut task = sample_task();
        task.state = TaskState::TaskFormation;

        let err = pipe.answer_dimension(&mut task, ScopeDimension::Why, "because".into()).unwrap_err();
        assert!(matches!(err, TaskError::InvalidState(_)));

        pipe.answer_dimension(&mut task, ScopeDimension::What, "a dashboard".into()).unwrap();
        pipe.answer_dimension(&mut task, ScopeDimension::Why, "because".into()).unwrap();
        assert_eq!(task.scope.why.status, DimensionStatus::Locked);
    }

    #[tokio::test]
    async fn ifr_requires_locked_scope() {
        let pipe = pipeline(vec![]);
        let mut task = sample_task();
        task.state = TaskState::TaskFormation;
        let err = pipe.generate_ifr(&mut task).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidState(_)));
    }

    #[tokio::test]
    async fn network_plan_loop_stops_once_critic_is_satisfied() {
        let stage = serde_json::json!({
            "id": "S1", "name": "bootstrap", "description": "set up",
            "result": [], "what_should_be_delivered": [], "checkpoints": [],
            "work_packages": [], "status": "Pending", "error_message": null,
            "started_at": null, "completed_at": null
        });
        let plan = serde_json::json!({"stages": [stage], "dependencies": []});
        let verdict = serde_json::json!({"score": 9, "needs_improvement": false, "feedback": "looks solid"});

        let pipe = pipeline(vec![plan, verdict]);
        let mut task = sample_task();
        task.state = TaskState::RequirementsDefined;

        let result = pipe.generate_network_plan(&mut task, false).await.unwrap();
        assert_eq!(result.stages.len(), 1);
        assert_eq!(task.state, TaskState::NetworkPlanGenerated);
    }

    #[tokio::test]
    async fn network_plan_caps_at_three_iterations_and_returns_last_plan() {
        fn plan_json(name: &str) -> Value {
            serde_json::json!({"stages": [{
                "id": "S1", "name": name, "description": "set up",
                "result": [], "what_should_be_delivered": [], "checkpoints": [],
                "work_packages": [], "status": "Pending", "error_message": null,
                "started_at": null, "completed_at": null
            }], "dependencies": []})
        }
        let needs_more = serde_json::json!({"score": 4, "needs_improvement": true, "feedback": "add a validation stage"});

        let pipe = pipeline(vec![
            plan_json("v1"),
            needs_more.clone(),
            plan_json("v2"),
            needs_more,
            plan_json("v3"),
        ]);
        let mut task = sample_task();
        task.state = TaskState::RequirementsDefined;

        let result = pipe.generate_network_plan(&mut task, false).await.unwrap();
        assert_eq!(result.stages[0].name, "v3");
    }

    #[tokio::test]
    async fn expand_network_plan_assigns_hierarchical_ids() {
        let work = serde_json::json!({"work_packages": [{
            "id": "", "stage_id": "", "name": "setup", "description": "set up",
            "required_inputs": [], "expected_outcome": "ready", "generated_artifacts": [],
            "validation_criteria": [], "sequence_order": 0, "dependencies": [], "tasks": [],
            "status": "Pending", "error_message": null, "started_at": null, "completed_at": null
        }]});
        let tasks = serde_json::json!({"tasks": [{
            "id": "", "work_id": "", "name": "configure", "description": "write config",
            "required_inputs": [], "generated_artifacts": [], "validation_criteria": [],
            "sequence_order": 0, "dependencies": [], "subtasks": [],
            "status": "Pending", "error_message": null, "started_at": null, "completed_at": null
        }]});
        let subtasks = serde_json::json!({"subtasks": [{
            "id": "", "executable_task_id": "", "name": "write yaml", "description": "write the config file",
            "executor_type": "AiAgent", "sequence_order": 0, "dependencies": [], "status": "Pending",
            "result": null, "error_message": null, "started_at": null, "completed_at": null,
            "validation_criteria": [], "failure_count": 0
        }]});

        let pipe = pipeline(vec![work, tasks, subtasks]);
        let task = sample_task();
        let mut plan = NetworkPlan {
            stages: vec![orchestrator_core::models::Stage {
                id: String::new(),
                name: "bootstrap".into(),
                description: "bootstrap".into(),
                result: vec![],
                what_should_be_delivered: vec![],
                checkpoints: vec![],
                work_packages: vec![],
                status: Default::default(),
                error_message: None,
                started_at: None,
                completed_at: None,
            }],
            dependencies: vec![],
        };

        pipe.expand_network_plan(&task, &mut plan).await.unwrap();

        assert_eq!(plan.stages[0].id, "S1");
        assert_eq!(plan.stages[0].work_packages[0].id, "S1_W1");
        assert_eq!(plan.stages[0].work_packages[0].tasks[0].id, "S1_W1_ET1");
        assert_eq!(plan.stages[0].work_packages[0].tasks[0].subtasks[0].id, "S1_W1_ET1_ST1");
    }
}
