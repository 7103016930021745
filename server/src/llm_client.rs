//! The production [`LLMClient`] implementation (§6.3): a thin HTTP POST to
//! whatever OpenAI-compatible structured-output endpoint `LLM_MODEL` names.
//! Provider wire formats, auth schemes, and prompt engineering are outside
//! this crate's scope (§1 Non-goals) — this client only owns the one seam
//! the façade needs: send a prompt + schema, get back a JSON value.

use async_trait::async_trait;
use orchestrator_core::error::{Result, TaskError};
use orchestrator_core::protocol::{LLMClient, LlmRequest};
use serde_json::Value;

/// Talks to an OpenAI-compatible `/v1/responses`-shaped endpoint configured
/// via `LLM_API_KEY`/`LLM_MODEL`. The endpoint is expected to return a JSON
/// object already conforming to the request's schema — reshaping a
/// provider's native response format into that shape is this struct's only
/// responsibility.
pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LLMClient for HttpLlmClient {
    async fn complete_structured(&self, request: LlmRequest) -> Result<Value> {
        let mut builder = self
            .http
            .post(format!("{}/structured-completions", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "phase": request.phase,
                "prompt": request.prompt,
                "schema": request.schema,
            }));

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TaskError::AgentError(format!("{}: request failed: {e}", request.phase)))?;

        if !response.status().is_success() {
            return Err(TaskError::AgentError(format!(
                "{}: provider returned status {}",
                request.phase,
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TaskError::AgentError(format!("{}: response body was not JSON: {e}", request.phase)))
    }
}
