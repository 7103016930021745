//! Scripted [`LLMClient`] for driving the planning pipeline deterministically
//! in tests, without a network call.

use async_trait::async_trait;
use orchestrator_core::error::{Result, TaskError};
use orchestrator_core::protocol::{LLMClient, LlmRequest};
use serde_json::Value;
use tokio::sync::Mutex;

/// Replays a fixed queue of JSON responses, one per call, in order.
///
/// Every call is recorded (phase + prompt) so a test can assert on what the
/// façade actually asked for. Once the queue is exhausted, further calls
/// return [`TaskError::AgentError`] — this is deliberate: a pipeline that
/// calls the LLM more times than a test expects should fail loudly rather
/// than replay a stale response.
pub struct MockLlmClient {
    responses: Mutex<Vec<Value>>,
    calls: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Script `responses` to be returned in order, one per `complete_structured` call.
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client with no scripted responses; every call fails. Useful for
    /// asserting a code path never reaches the LLM.
    pub fn unused() -> Self {
        Self::new(Vec::new())
    }

    /// Requests received so far, in call order.
    pub async fn calls(&self) -> Vec<LlmRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl LLMClient for MockLlmClient {
    async fn complete_structured(&self, request: LlmRequest) -> Result<Value> {
        self.calls.lock().await.push(request.clone());
        self.responses
            .lock()
            .await
            .pop()
            .ok_or_else(|| TaskError::AgentError(format!("{}: no scripted response left", request.phase)))
    }
}
