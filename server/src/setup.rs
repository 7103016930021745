//! Application wiring: turns a loaded [`Config`] into a runnable [`axum::Router`].

use std::collections::HashMap;
use std::sync::Arc;

use agent_protocol::TrackerRegistry;
use anyhow::Result;
use orchestrator_core::protocol::AgentFacade;
use task_store::JsonTaskStore;
use task_workspace::WorkspaceManager;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::execution::ExecutionEngine;
use crate::llm_client::HttpLlmClient;
use crate::planning::{PlanningOps, PlanningPipeline};
use crate::state::{AppState, TaskHandleRegistry};

/// Build the application state and its HTTP router from configuration.
pub fn build_app(config: &Config) -> Result<axum::Router> {
    info!("initializing application");

    let store = Arc::new(JsonTaskStore::new(config.workspace.projects_base_dir.clone()));
    let workspace = Arc::new(WorkspaceManager::new(config.workspace.allowed_base_dir.clone()));

    let llm_client = HttpLlmClient::new(llm_base_url(), config.llm.api_key.clone(), config.llm.model.clone());
    let facade = AgentFacade::new(llm_client);
    let planning: Arc<dyn PlanningOps> = Arc::new(PlanningPipeline::new(facade));
    let execution = Arc::new(ExecutionEngine::default());

    let state = Arc::new(AppState {
        store,
        workspace,
        planning,
        execution,
        tasks: Arc::new(TaskHandleRegistry::new()),
        breakers: Mutex::new(HashMap::new()),
        trackers: Arc::new(TrackerRegistry::new()),
        config: config.clone(),
    });

    info!("application initialized successfully");
    Ok(crate::http::router(state))
}

/// Ensure the store's and workspace's base directories exist before serving
/// traffic.
pub async fn ensure_base_directories(config: &Config) -> Result<()> {
    tokio::fs::create_dir_all(&config.workspace.projects_base_dir).await?;
    tokio::fs::create_dir_all(&config.workspace.allowed_base_dir).await?;
    Ok(())
}

/// `LLM_BASE_URL` names the OpenAI-compatible endpoint host; the spec only
/// names `LLM_API_KEY`/`LLM_MODEL` directly, so this one stays independent
/// with a sane localhost default for development.
fn llm_base_url() -> String {
    std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "http://localhost:11434/v1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_app_succeeds_with_default_config() {
        let config = Config::default();
        assert!(build_app(&config).is_ok());
    }
}
