//! End-to-end scenarios driving the HTTP surface from `POST /user-queries`
//! through network-plan generation and subtask completion, backed by a
//! scripted LLM and a temp-dir-backed store/workspace.

use std::collections::HashMap;
use std::sync::Arc;

use agent_protocol::TrackerRegistry;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use orchestrator_core::protocol::AgentFacade;
use orchestrator_mocks::MockLlmClient;
use serde_json::{json, Value};
use task_server::config::Config;
use task_server::execution::ExecutionEngine;
use task_server::http;
use task_server::planning::{PlanningOps, PlanningPipeline};
use task_server::state::{AppState, TaskHandleRegistry};
use task_store::JsonTaskStore;
use task_workspace::WorkspaceManager;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

fn bootstrap_router(responses: Vec<Value>) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonTaskStore::new(dir.path().join("projects")));
    let workspace = Arc::new(WorkspaceManager::new(dir.path().join("workspaces")));
    let planning: Arc<dyn PlanningOps> = Arc::new(PlanningPipeline::new(AgentFacade::new(MockLlmClient::new(responses))));

    let state = Arc::new(AppState {
        store,
        workspace,
        planning,
        execution: Arc::new(ExecutionEngine::default()),
        tasks: Arc::new(TaskHandleRegistry::new()),
        breakers: Mutex::new(HashMap::new()),
        trackers: Arc::new(TrackerRegistry::new()),
        config: Config::default(),
    });

    (http::router(state), dir)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn stage_json(name: &str) -> Value {
    json!({
        "id": "S1", "name": name, "description": "set up",
        "result": [], "what_should_be_delivered": [], "checkpoints": [],
        "work_packages": [], "status": "Pending", "error_message": null,
        "started_at": null, "completed_at": null
    })
}

fn work_json() -> Value {
    json!({"work_packages": [{
        "id": "", "stage_id": "", "name": "setup", "description": "set up",
        "required_inputs": [], "expected_outcome": "ready", "generated_artifacts": [],
        "validation_criteria": [], "sequence_order": 0, "dependencies": [], "tasks": [],
        "status": "Pending", "error_message": null, "started_at": null, "completed_at": null
    }]})
}

fn executable_task_json() -> Value {
    json!({"tasks": [{
        "id": "", "work_id": "", "name": "configure", "description": "write config",
        "required_inputs": [], "generated_artifacts": [], "validation_criteria": [],
        "sequence_order": 0, "dependencies": [], "subtasks": [],
        "status": "Pending", "error_message": null, "started_at": null, "completed_at": null
    }]})
}

fn subtask_json() -> Value {
    json!({"subtasks": [{
        "id": "", "executable_task_id": "", "name": "write yaml", "description": "write the config file",
        "executor_type": "AiAgent", "sequence_order": 0, "dependencies": [], "status": "Pending",
        "result": null, "error_message": null, "started_at": null, "completed_at": null,
        "validation_criteria": ["exists"], "failure_count": 0
    }]})
}

fn scope_entry(content: &str) -> Value {
    json!({"content": content, "status": "Draft"})
}

fn draft_scope_json() -> Value {
    json!({
        "what": scope_entry("build a dashboard"),
        "why": scope_entry("visibility into metrics"),
        "who": scope_entry("the ops team"),
        "where_": scope_entry("internal tooling"),
        "when": scope_entry("this quarter"),
        "how": scope_entry("a web app backed by the existing metrics store"),
        "draft": "Build an internal dashboard surfacing operational metrics for the ops team.",
        "validation_criteria": ["dashboard loads", "metrics are current"],
        "status": "Unanswered"
    })
}

fn scope_validation_json() -> Value {
    json!({"valid": true, "issues": []})
}

fn ifr_json() -> Value {
    json!({
        "statement": "Deliver a dashboard that surfaces operational metrics in real time.",
        "success_criteria": ["metrics refresh within 5s"],
        "expected_outcomes": ["ops team can see current load"],
        "quality_metrics": ["p99 load time under 2s"],
        "validation_checklist": ["dashboard deployed", "metrics wired up"]
    })
}

fn requirements_json() -> Value {
    json!({
        "requirements": ["expose current metrics"],
        "constraints": ["must reuse the existing metrics store"],
        "limitations": ["no historical data beyond 30 days"],
        "resources": ["metrics store credentials"],
        "tools": ["the existing dashboard framework"],
        "definitions": ["metric: a named time series value"]
    })
}

/// S1: happy path. Create a task, force through context gathering and scope
/// formulation, generate a one-stage network plan, expand it, then complete
/// its lone subtask through the HTTP surface end to end.
#[tokio::test]
async fn happy_path_from_creation_to_subtask_completion() {
    let verdict = json!({"score": 9, "needs_improvement": false, "feedback": "solid"});
    let (router, _dir) = bootstrap_router(vec![
        draft_scope_json(),
        scope_validation_json(),
        ifr_json(),
        requirements_json(),
        json!({"stages": [stage_json("bootstrap")], "dependencies": []}),
        verdict,
        work_json(),
        executable_task_json(),
        subtask_json(),
    ]);

    let (status, created) = send(&router, "POST", "/user-queries", Some(json!({"query": "build a dashboard"}))).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["state"], "NEW");

    let (status, sufficiency) = send(
        &router,
        "POST",
        &format!("/tasks/{id}/context-questions"),
        Some(json!({"force": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sufficiency["sufficient"], true);

    for dim in ["what", "why", "who", "where", "when", "how"] {
        let (status, _) = send(
            &router,
            "POST",
            &format!("/tasks/{id}/formulate/{dim}"),
            Some(json!({"answers": [format!("answer for {dim}")]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "dimension {dim} should be acceptable once task formation begins");
    }

    let (status, scope) = send(&router, "GET", &format!("/tasks/{id}/draft-scope"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scope["status"], "Unanswered");

    let (status, validation) = send(
        &router,
        "POST",
        &format!("/tasks/{id}/validate-scope"),
        Some(json!({"isApproved": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let _ = validation;

    let (status, _ifr) = send(&router, "POST", &format!("/tasks/{id}/ifr"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _requirements) = send(&router, "POST", &format!("/tasks/{id}/requirements"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, plan) = send(&router, "POST", &format!("/tasks/{id}/network-plan"), None).await;
    assert_eq!(status, StatusCode::OK);
    let reference = plan["stages"][0]["work_packages"][0]["tasks"][0]["subtasks"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(reference, "S1_W1_ET1_ST1");

    let (status, _) = send(
        &router,
        "PUT",
        &format!("/tasks/{id}/subtasks/{reference}/status"),
        Some(json!({"status": "InProgress", "result": null, "error_message": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, "POST", &format!("/tasks/{id}/subtasks/{reference}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, task) = send(&router, "GET", &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["state"], "COMPLETED");
}

/// S6: the Creator/Critic loop caps at three rounds and keeps the last
/// Creator draft even though the Critic never approved it.
#[tokio::test]
async fn network_plan_caps_at_three_rounds_through_the_http_layer() {
    let needs_more = json!({"score": 4, "needs_improvement": true, "feedback": "add a validation stage"});
    let (router, _dir) = bootstrap_router(vec![
        scope_validation_json(),
        ifr_json(),
        requirements_json(),
        json!({"stages": [stage_json("v1")], "dependencies": []}),
        needs_more.clone(),
        json!({"stages": [stage_json("v2")], "dependencies": []}),
        needs_more,
        json!({"stages": [stage_json("v3")], "dependencies": []}),
        work_json(),
        executable_task_json(),
        subtask_json(),
    ]);

    let (_, created) = send(&router, "POST", "/user-queries", Some(json!({"query": "ship v3"}))).await;
    let id = created["id"].as_str().unwrap().to_string();

    send(&router, "POST", &format!("/tasks/{id}/context-questions"), Some(json!({"force": true}))).await;
    for dim in ["what", "why", "who", "where", "when", "how"] {
        send(&router, "POST", &format!("/tasks/{id}/formulate/{dim}"), Some(json!({"answers": ["a"]}))).await;
    }
    send(&router, "POST", &format!("/tasks/{id}/validate-scope"), Some(json!({"isApproved": true}))).await;
    send(&router, "POST", &format!("/tasks/{id}/ifr"), None).await;
    send(&router, "POST", &format!("/tasks/{id}/requirements"), None).await;

    let (status, plan) = send(&router, "POST", &format!("/tasks/{id}/network-plan"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["stages"][0]["name"], "v3");
}

/// A subtask reference that does not resolve to an actual subtask is a 404,
/// not a 500 or a silent no-op.
#[tokio::test]
async fn unknown_subtask_reference_is_not_found() {
    let (router, _dir) = bootstrap_router(vec![]);
    let (_, created) = send(&router, "POST", "/user-queries", Some(json!({"query": "whatever"}))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(&router, "POST", &format!("/tasks/{id}/subtasks/S9_W9_ET9_ST9/complete"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Requesting the IFR before the scope has been validated is rejected with a
/// 400, not silently accepted.
#[tokio::test]
async fn ifr_before_scope_validation_is_rejected() {
    let (router, _dir) = bootstrap_router(vec![]);
    let (_, created) = send(&router, "POST", "/user-queries", Some(json!({"query": "whatever"}))).await;
    let id = created["id"].as_str().unwrap().to_string();

    send(&router, "POST", &format!("/tasks/{id}/context-questions"), Some(json!({"force": true}))).await;
    let (status, _) = send(&router, "POST", &format!("/tasks/{id}/ifr"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
