//! LLM Agent Façade (C5): the single seam through which every planning
//! operation asks an LLM for structured output.
//!
//! [`LLMClient`] is the external collaborator (prompt wiring, model choice,
//! API keys live outside this crate). [`AgentFacade`] owns prompt assembly,
//! schema attachment, retry-on-parse-failure, and the per-call timeout, so
//! every phase of the planning pipeline goes through one generic helper
//! instead of hand-rolling its own retry loop.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TaskError};
use crate::models::{ExecutableTask, Ifr, NetworkPlan, Requirements, Scope, ScopeDimension, Stage, Subtask, Task, Work};

/// Default number of retries after a structured-output call whose response
/// failed to parse against the expected schema.
pub const DEFAULT_RETRY_BUDGET: u32 = 2;

/// Default wall-clock budget for a single LLM call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// One request to the underlying LLM provider: a phase label (for logging),
/// the assembled prompt, and the JSON schema the response must conform to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub phase: String,
    pub prompt: String,
    pub schema: Value,
}

/// The external LLM provider collaborator. Implementations are free to pick
/// any backing model; the façade is the only caller.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete_structured(&self, request: LlmRequest) -> Result<Value>;
}

/// Result of asking whether enough context has been gathered to proceed
/// to task formation. `questions` holds every open clarifying question the
/// agent wants answered next; empty when `sufficient` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSufficiency {
    pub sufficient: bool,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Result of validating a drafted [`Scope`] against its own criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// The Critic's verdict on one network-plan draft (§4.6). Either
/// `needs_improvement` or a `score` below 8 sends the loop back to the
/// Creator for another round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkPlanVerdict {
    pub score: u8,
    pub needs_improvement: bool,
    pub feedback: String,
}

/// Thin wrapper around an [`LLMClient`] implementing every planning-pipeline
/// operation as one schema-constrained call.
pub struct AgentFacade<C: LLMClient> {
    client: C,
    retry_budget: u32,
    timeout: Duration,
}

impl<C: LLMClient> AgentFacade<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry_budget: DEFAULT_RETRY_BUDGET,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_retry_budget(mut self, retries: u32) -> Self {
        self.retry_budget = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The one generic helper every façade method is built on: issue the
    /// call, enforce the timeout, and retry on schema-parse failure up to
    /// `retry_budget` times before surfacing `TaskError::AgentError`.
    async fn call_agent<T: DeserializeOwned>(&self, phase: &str, prompt: String, schema: Value) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = LlmRequest {
                phase: phase.to_string(),
                prompt: prompt.clone(),
                schema: schema.clone(),
            };

            let outcome = tokio::time::timeout(self.timeout, self.client.complete_structured(request)).await;

            let value = match outcome {
                Err(_) => {
                    return Err(TaskError::AgentError(format!(
                        "{phase}: timed out after {:?}",
                        self.timeout
                    )))
                }
                Ok(Err(e)) if attempt <= self.retry_budget => {
                    tracing::warn!(phase, attempt, error = %e, "agent call failed, retrying");
                    continue;
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(value)) => value,
            };

            match serde_json::from_value::<T>(value) {
                Ok(parsed) => return Ok(parsed),
                Err(e) if attempt <= self.retry_budget => {
                    tracing::warn!(phase, attempt, error = %e, "agent response failed to parse, retrying");
                    continue;
                }
                Err(e) => {
                    return Err(TaskError::AgentError(format!(
                        "{phase}: response did not match expected schema after {attempt} attempts: {e}"
                    )))
                }
            }
        }
    }

    pub async fn analyze_context_sufficiency(&self, task: &Task) -> Result<ContextSufficiency> {
        let prompt = format!(
            "Task: {}\nAccumulated context:\n{}\n\nDecide whether enough context has been gathered.",
            task.short_description, task.context
        );
        self.call_agent("analyze_context_sufficiency", prompt, context_sufficiency_schema())
            .await
    }

    pub async fn summarize_context(&self, context: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Summary {
            summary: String,
        }
        let prompt = format!("Summarize the following context concisely:\n{context}");
        let out: Summary = self
            .call_agent("summarize_context", prompt, summary_schema())
            .await?;
        Ok(out.summary)
    }

    pub async fn formulate_scope_question(&self, task: &Task, dimension: ScopeDimension) -> Result<String> {
        #[derive(Deserialize)]
        struct Question {
            question: String,
        }
        let prompt = format!(
            "Task: {}\nFormulate one clarifying question for the '{}' dimension of scope.",
            task.task,
            dimension.as_str()
        );
        let out: Question = self
            .call_agent("formulate_scope_question", prompt, question_schema())
            .await?;
        Ok(out.question)
    }

    pub async fn generate_draft_scope(&self, task: &Task) -> Result<Scope> {
        let prompt = format!(
            "Task: {}\nContext: {}\nDraft a complete scope covering what/why/who/where/when/how.",
            task.task, task.context
        );
        self.call_agent("generate_draft_scope", prompt, scope_schema()).await
    }

    pub async fn validate_scope(&self, scope: &Scope) -> Result<ScopeValidation> {
        let prompt = format!(
            "Validate this scope against its own validation criteria:\n{}",
            serde_json::to_string_pretty(scope).unwrap_or_default()
        );
        self.call_agent("validate_scope", prompt, scope_validation_schema())
            .await
    }

    pub async fn generate_ifr(&self, task: &Task) -> Result<Ifr> {
        let prompt = format!(
            "Task: {}\nScope: {}\nGenerate the Ideal Final Result.",
            task.task, task.scope.draft
        );
        self.call_agent("generate_ifr", prompt, ifr_schema()).await
    }

    pub async fn define_requirements(&self, task: &Task) -> Result<Requirements> {
        let ifr_statement = task.ifr.as_ref().map(|i| i.statement.as_str()).unwrap_or_default();
        let prompt = format!(
            "Task: {}\nIdeal Final Result: {}\nDerive requirements, constraints, limitations, resources, tools and definitions.",
            task.task, ifr_statement
        );
        self.call_agent("define_requirements", prompt, requirements_schema())
            .await
    }

    pub async fn generate_network_plan(&self, task: &Task, critique: Option<&str>) -> Result<NetworkPlan> {
        let mut prompt = format!(
            "Task: {}\nRequirements: {:?}\nPropose a network plan of stages with dependencies.",
            task.task, task.requirements
        );
        if let Some(c) = critique {
            prompt.push_str(&format!("\n\nAddress this critique of the previous plan:\n{c}"));
        }
        self.call_agent("generate_network_plan", prompt, network_plan_schema())
            .await
    }

    pub async fn critique_network_plan(&self, task: &Task, plan: &NetworkPlan) -> Result<NetworkPlanVerdict> {
        let prompt = format!(
            "Task: {}\nCritique this network plan for completeness and dependency soundness. Score it 1-10:\n{}",
            task.task,
            serde_json::to_string_pretty(plan).unwrap_or_default()
        );
        self.call_agent("critique_network_plan", prompt, network_plan_verdict_schema())
            .await
    }

    pub async fn generate_work_for_stage(&self, task: &Task, stage: &Stage) -> Result<Vec<Work>> {
        #[derive(Deserialize)]
        struct WorkList {
            work_packages: Vec<Work>,
        }
        let prompt = format!(
            "Task: {}\nStage: {} — {}\nBreak this stage into work packages.",
            task.task, stage.name, stage.description
        );
        let out: WorkList = self
            .call_agent("generate_work_for_stage", prompt, work_list_schema())
            .await?;
        Ok(out.work_packages)
    }

    pub async fn generate_tasks_for_work(&self, task: &Task, work: &Work) -> Result<Vec<ExecutableTask>> {
        #[derive(Deserialize)]
        struct TaskList {
            tasks: Vec<ExecutableTask>,
        }
        let prompt = format!(
            "Task: {}\nWork package: {} — {}\nBreak this work package into executable tasks.",
            task.task, work.name, work.description
        );
        let out: TaskList = self
            .call_agent("generate_tasks_for_work", prompt, task_list_schema())
            .await?;
        Ok(out.tasks)
    }

    pub async fn generate_subtasks(&self, task: &Task, executable_task: &ExecutableTask) -> Result<Vec<Subtask>> {
        #[derive(Deserialize)]
        struct SubtaskList {
            subtasks: Vec<Subtask>,
        }
        let prompt = format!(
            "Task: {}\nExecutable task: {} — {}\nBreak this into atomic subtasks with an executor type each.",
            task.task, executable_task.name, executable_task.description
        );
        let out: SubtaskList = self
            .call_agent("generate_subtasks", prompt, subtask_list_schema())
            .await?;
        Ok(out.subtasks)
    }
}

fn context_sufficiency_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "sufficient": {"type": "boolean"},
            "questions": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["sufficient", "questions"]
    })
}

fn summary_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {"summary": {"type": "string"}}, "required": ["summary"]})
}

fn question_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {"question": {"type": "string"}}, "required": ["question"]})
}

fn scope_schema() -> Value {
    serde_json::json!({"type": "object", "description": "Scope"})
}

fn scope_validation_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {"valid": {"type": "boolean"}, "issues": {"type": "array", "items": {"type": "string"}}},
        "required": ["valid", "issues"]
    })
}

fn network_plan_verdict_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "score": {"type": "integer"},
            "needs_improvement": {"type": "boolean"},
            "feedback": {"type": "string"}
        },
        "required": ["score", "needs_improvement", "feedback"]
    })
}

fn ifr_schema() -> Value {
    serde_json::json!({"type": "object", "description": "Ifr"})
}

fn requirements_schema() -> Value {
    serde_json::json!({"type": "object", "description": "Requirements"})
}

fn network_plan_schema() -> Value {
    serde_json::json!({"type": "object", "description": "NetworkPlan"})
}

fn work_list_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {"work_packages": {"type": "array"}}, "required": ["work_packages"]})
}

fn task_list_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {"tasks": {"type": "array"}}, "required": ["tasks"]})
}

fn subtask_list_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {"subtasks": {"type": "array"}}, "required": ["subtasks"]})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyClient {
        calls: Arc<AtomicU32>,
        succeed_after: u32,
        response: Value,
    }

    #[async_trait]
    impl LLMClient for FlakyClient {
        async fn complete_structured(&self, _request: LlmRequest) -> Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < self.succeed_after {
                return Err(TaskError::AgentError("transient failure".into()));
            }
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn retries_on_transient_failure_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = FlakyClient {
            calls: calls.clone(),
            succeed_after: 2,
            response: serde_json::json!({"summary": "ok"}),
        };
        let facade = AgentFacade::new(client);
        let result = facade.summarize_context("some context").await.unwrap();
        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausting_retry_budget_surfaces_agent_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = FlakyClient {
            calls: calls.clone(),
            succeed_after: 100,
            response: serde_json::json!({"summary": "ok"}),
        };
        let facade = AgentFacade::new(client).with_retry_budget(1);
        let err = facade.summarize_context("some context").await.unwrap_err();
        assert!(matches!(err, TaskError::AgentError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn critique_network_plan_returns_verdict_with_score() {
        let client = FlakyClient {
            calls: Arc::new(AtomicU32::new(0)),
            succeed_after: 1,
            response: serde_json::json!({"score": 6, "needs_improvement": true, "feedback": "missing a validation stage"}),
        };
        let facade = AgentFacade::new(client);
        let task = Task::new("t1".into(), "proj".into(), "build a thing".into());
        let plan = NetworkPlan { stages: vec![], dependencies: vec![] };
        let verdict = facade.critique_network_plan(&task, &plan).await.unwrap();
        assert_eq!(verdict.score, 6);
        assert!(verdict.needs_improvement);
        assert_eq!(verdict.feedback, "missing a validation stage");
    }
}
