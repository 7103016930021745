//! Thin HTTP façade (C11, §6.1): every handler validates nothing beyond
//! extracting its body, delegates to the planning pipeline / execution
//! engine, and persists the task exactly once on the way out.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use agent_protocol::{analyze_request_intent, ActivityTracker, AgentType, StreamEvent};
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures_util::stream::{Stream, StreamExt};
use chrono::{DateTime, Utc};
use orchestrator_core::error::TaskError;
use orchestrator_core::models::{ScopeDimension, SubtaskStatus, Task};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{ApiError, ApiResult, AppState};

/// `true` once every subtask in every stage/work/executable-task has reached
/// a terminal `Completed` status.
fn all_subtasks_completed(task: &Task) -> bool {
    task.network_plan.stages.iter().all(|stage| {
        stage.work_packages.iter().all(|work| {
            work.tasks
                .iter()
                .all(|exec_task| exec_task.subtasks.iter().all(|st| st.status == SubtaskStatus::Completed))
        })
    })
}

/// Keep the task-level state machine in lockstep with subtask progress:
/// the first subtask to start moves the task into `EXECUTING`, and the last
/// one to complete moves it into `COMPLETED`. No dedicated HTTP endpoint
/// exposes these two transitions directly.
fn sync_execution_state(planning: &dyn crate::planning::PlanningOps, task: &mut Task) {
    if task.state == orchestrator_core::models::TaskState::NetworkPlanGenerated {
        let _ = planning.begin_execution(task);
    }
    if task.state == orchestrator_core::models::TaskState::Executing && all_subtasks_completed(task) {
        let _ = planning.complete_execution(task);
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/user-queries", post(create_user_query).get(list_user_queries))
        .route("/user-queries/:id", get(get_user_query).delete(delete_user_query))
        .route("/tasks/:id/context-questions", post(context_questions))
        .route("/tasks/:id/edit-context", post(edit_context))
        .route("/tasks/:id/formulate/:dimension", get(get_formulate_dimension).post(post_formulate_dimension))
        .route("/tasks/:id/draft-scope", get(draft_scope))
        .route("/tasks/:id/validate-scope", post(validate_scope))
        .route("/tasks/:id/ifr", post(generate_ifr))
        .route("/tasks/:id/requirements", post(define_requirements))
        .route("/tasks/:id/network-plan", post(generate_network_plan))
        .route("/tasks/:id/chat", post(chat))
        .route("/tasks/:id/chat/stream", post(chat_stream))
        .route("/tasks/:id/chat/reset", post(chat_reset))
        .route("/tasks/:id/trace", get(trace))
        .route("/tasks/:id/subtasks/:reference/status", put(put_subtask_status).get(get_subtask_status))
        .route("/tasks/:id/subtasks/:reference/complete", post(complete_subtask))
        .route("/tasks/:id/subtasks/:reference/fail", post(fail_subtask))
        .with_state(state)
}

/// Acquire the cached write guard for `id`, run `f` against the task, then
/// persist the result. The full read-modify-write-persist sequence holds one
/// write guard the entire time (§5).
async fn with_task<T>(
    state: &AppState,
    id: &str,
    f: impl for<'a> FnOnce(
        &'a mut Task,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, TaskError>> + Send + 'a>>,
) -> ApiResult<T> {
    let handle = state.tasks.get_or_load(state.store.as_ref(), id, id).await?;
    let mut guard = handle.write().await;
    let result = f(&mut guard).await?;
    state.store.save_task(&guard).await?;
    Ok(result)
}

async fn read_task(state: &AppState, id: &str) -> ApiResult<Task> {
    let handle = state.tasks.get_or_load(state.store.as_ref(), id, id).await?;
    let guard = handle.read().await;
    Ok(guard.clone())
}

#[derive(Deserialize)]
struct CreateUserQuery {
    query: String,
}

async fn create_user_query(State(state): State<Arc<AppState>>, Json(body): Json<CreateUserQuery>) -> ApiResult<Json<Task>> {
    let id = Uuid::new_v4().to_string();
    state.store.create_project(&id, &body.query).await?;
    state.workspace.create_workspace(&id).await?;
    let task = Task::new(id.clone(), id.clone(), body.query);
    state.store.save_task(&task).await?;
    state.tasks.insert(&id, &id, task.clone()).await;
    Ok(Json(task))
}

async fn list_user_queries(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Task>>> {
    let projects = state.store.list_projects().await?;
    let mut tasks = Vec::with_capacity(projects.len());
    for project in projects {
        tasks.push(state.store.load_task(&project.id, &project.id).await?);
    }
    Ok(Json(tasks))
}

async fn get_user_query(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Task>> {
    Ok(Json(read_task(&state, &id).await?))
}

async fn delete_user_query(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<()> {
    state.store.delete_project(&id).await?;
    state.tasks.remove_project(&id).await;
    Ok(())
}

#[derive(Deserialize)]
struct AnswerPair {
    question: String,
    answer: String,
}

#[derive(Deserialize)]
struct ContextQuestionsBody {
    #[serde(default)]
    answers: Vec<AnswerPair>,
    #[serde(default)]
    force: bool,
}

async fn context_questions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ContextQuestionsBody>,
) -> ApiResult<impl IntoResponse> {
    let planning = state.planning.clone();
    let answers: Vec<(String, String)> = body.answers.into_iter().map(|a| (a.question, a.answer)).collect();
    let result = with_task(&state, &id, |task| Box::pin(async move {
        if task.state == orchestrator_core::models::TaskState::New {
            planning.begin_context_gathering(task)?;
        }
        let sufficiency = planning.submit_context_answers(task, &answers, body.force).await?;
        if sufficiency.sufficient {
            let refined_statement = task.short_description.clone();
            planning.begin_task_formation(task, refined_statement)?;
        }
        Ok(sufficiency)
    }))
    .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct EditContextBody {
    feedback: String,
}

async fn edit_context(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<EditContextBody>,
) -> ApiResult<Json<Task>> {
    let planning = state.planning.clone();
    with_task(&state, &id, |task| {
        let feedback = body.feedback;
        Box::pin(async move { planning.edit_context(task, &feedback) })
    })
    .await?;
    Ok(Json(read_task(&state, &id).await?))
}

fn parse_dimension(raw: &str) -> ApiResult<ScopeDimension> {
    match raw.to_lowercase().as_str() {
        "what" => Ok(ScopeDimension::What),
        "why" => Ok(ScopeDimension::Why),
        "who" => Ok(ScopeDimension::Who),
        "where" => Ok(ScopeDimension::Where),
        "when" => Ok(ScopeDimension::When),
        "how" => Ok(ScopeDimension::How),
        other => Err(ApiError(TaskError::Validation(format!("unknown scope dimension '{other}'")))),
    }
}

async fn get_formulate_dimension(
    State(state): State<Arc<AppState>>,
    Path((id, dimension)): Path<(String, String)>,
) -> ApiResult<Json<String>> {
    let dimension = parse_dimension(&dimension)?;
    let task = read_task(&state, &id).await?;
    let question = state.planning.formulate_dimension(&task, dimension).await?;
    Ok(Json(question))
}

#[derive(Deserialize)]
struct FormulateAnswerBody {
    answers: Vec<String>,
}

async fn post_formulate_dimension(
    State(state): State<Arc<AppState>>,
    Path((id, dimension)): Path<(String, String)>,
    Json(body): Json<FormulateAnswerBody>,
) -> ApiResult<Json<Task>> {
    let dimension = parse_dimension(&dimension)?;
    let planning = state.planning.clone();
    let answer = body.answers.join("\n");
    with_task(&state, &id, |task| Box::pin(async move { planning.answer_dimension(task, dimension, answer) })).await?;
    Ok(Json(read_task(&state, &id).await?))
}

async fn draft_scope(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let planning = state.planning.clone();
    let scope = with_task(&state, &id, |task| Box::pin(async move { planning.generate_draft_scope(task).await })).await?;
    Ok(Json(scope))
}

#[derive(Deserialize)]
struct ValidateScopeBody {
    #[serde(rename = "isApproved")]
    is_approved: bool,
    feedback: Option<String>,
}

async fn validate_scope(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ValidateScopeBody>,
) -> ApiResult<impl IntoResponse> {
    let planning = state.planning.clone();
    let result = with_task(&state, &id, |task| Box::pin(async move {
        planning.validate_scope(task, body.is_approved, body.feedback.as_deref()).await
    }))
    .await?;
    Ok(Json(result))
}

async fn generate_ifr(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let planning = state.planning.clone();
    let ifr = with_task(&state, &id, |task| Box::pin(async move { planning.generate_ifr(task).await })).await?;
    Ok(Json(ifr))
}

async fn define_requirements(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let planning = state.planning.clone();
    let requirements = with_task(&state, &id, |task| Box::pin(async move { planning.define_requirements(task).await })).await?;
    Ok(Json(requirements))
}

#[derive(Deserialize)]
struct NetworkPlanQuery {
    #[serde(default)]
    force: bool,
}

async fn generate_network_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<NetworkPlanQuery>,
) -> ApiResult<impl IntoResponse> {
    let planning = state.planning.clone();
    let plan = with_task(&state, &id, |task| Box::pin(async move {
        let mut plan = planning.generate_network_plan(task, query.force).await?;
        planning.expand_network_plan(task, &mut plan).await?;
        task.network_plan = plan.clone();
        Ok(plan)
    }))
    .await?;
    Ok(Json(plan))
}

#[derive(Deserialize)]
struct ChatBody {
    message: String,
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    agent: &'static str,
    confidence: f64,
    session_id: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ChatBody>,
) -> ApiResult<Json<ChatResponse>> {
    let session_id = body.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let intent = analyze_request_intent(&body.message);

    let (mut tracker, _rx) = ActivityTracker::new();
    tracker.record_transfer(AgentType::Router, intent.agent, "keyword routing", intent.confidence);
    tracker.record_activity(format!("routed to {}", intent.agent.as_str()));
    tracker.finish();
    state.trackers.register(&id, &session_id, tracker).await;

    Ok(Json(ChatResponse {
        response: format!("[{}] acknowledged: {}", intent.agent.as_str(), body.message),
        agent: intent.agent.as_str(),
        confidence: intent.confidence,
        session_id,
    }))
}

async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ChatBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = body.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let intent = analyze_request_intent(&body.message);
    let (mut tracker, rx) = ActivityTracker::new();

    tracker.record_transfer(AgentType::Router, intent.agent, "keyword routing", intent.confidence);
    tracker.record_activity(format!("routed to {}", intent.agent.as_str()));
    for chunk in body.message.split_whitespace().collect::<Vec<_>>().chunks(3) {
        tracker.emit_prose(chunk.join(" "));
    }
    tracker.finish();
    state.trackers.register(&id, &session_id, tracker).await;

    let stream = tokio_stream::wrappers::UnboundedReceiverStream::new(rx).map(|event| {
        let (event_type, data) = match event {
            StreamEvent::ProseChunk(text) => ("message_chunk", serde_json::json!({"text": text})),
            StreamEvent::ToolCallStart { name } => ("message_chunk", serde_json::json!({"tool_call_start": name})),
            StreamEvent::ToolCallEnd { name, result } => {
                ("message_chunk", serde_json::json!({"tool_call_end": name, "result": result}))
            }
            StreamEvent::AgentTransfer(transfer) => ("message_chunk", serde_json::to_value(transfer).unwrap_or_default()),
            StreamEvent::Error(message) => ("error", serde_json::json!({"message": message})),
            StreamEvent::Summary(summary) => ("completion", serde_json::to_value(summary).unwrap_or_default()),
        };
        Ok(Event::default().event(event_type).data(data.to_string()))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[derive(Deserialize)]
struct ChatResetQuery {
    session_id: Option<String>,
}

async fn chat_reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ChatResetQuery>,
) -> ApiResult<()> {
    if let Some(session_id) = query.session_id {
        state.trackers.remove(&id, &session_id).await;
    }
    Ok(())
}

#[derive(Deserialize)]
struct TraceQuery {
    session_id: String,
}

#[derive(Serialize)]
struct TraceResponse {
    transfers: Vec<agent_protocol::AgentTransfer>,
    activities: Vec<String>,
    tool_calls: Vec<String>,
}

async fn trace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TraceQuery>,
) -> ApiResult<Json<TraceResponse>> {
    let tracker = state
        .trackers
        .get(&id, &query.session_id)
        .await
        .ok_or_else(|| TaskError::not_found_component("trace session", &query.session_id))?;
    let tracker = tracker.lock().await;
    Ok(Json(TraceResponse {
        transfers: tracker.transfers().to_vec(),
        activities: tracker.activities().iter().map(|a| a.description.clone()).collect(),
        tool_calls: tracker.tool_calls().iter().map(|t| t.name.clone()).collect(),
    }))
}

#[derive(Deserialize)]
struct SubtaskStatusBody {
    status: SubtaskStatus,
    result: Option<String>,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

async fn put_subtask_status(
    State(state): State<Arc<AppState>>,
    Path((id, reference)): Path<(String, String)>,
    Json(body): Json<SubtaskStatusBody>,
) -> ApiResult<()> {
    let planning = state.planning.clone();
    with_task(&state, &id, |task| {
        let reference = reference.clone();
        Box::pin(async move {
            let subtask = task.subtask_by_reference_mut(&reference)?;
            subtask.status = body.status;
            subtask.result = body.result;
            subtask.error_message = body.error_message;
            if body.started_at.is_some() {
                subtask.started_at = body.started_at;
            }
            if body.completed_at.is_some() {
                subtask.completed_at = body.completed_at;
            }
            sync_execution_state(planning.as_ref(), task);
            Ok(())
        })
    })
    .await
}

#[derive(Serialize)]
struct SubtaskStatusResponse {
    reference: String,
    status: SubtaskStatus,
    result: Option<String>,
    error_message: Option<String>,
}

async fn get_subtask_status(
    State(state): State<Arc<AppState>>,
    Path((id, reference)): Path<(String, String)>,
) -> ApiResult<Json<SubtaskStatusResponse>> {
    let task = read_task(&state, &id).await?;
    let subtask = task.subtask_by_reference(&reference)?;
    Ok(Json(SubtaskStatusResponse {
        reference,
        status: subtask.status,
        result: subtask.result.clone(),
        error_message: subtask.error_message.clone(),
    }))
}

async fn complete_subtask(
    State(state): State<Arc<AppState>>,
    Path((id, reference)): Path<(String, String)>,
) -> ApiResult<()> {
    let planning = state.planning.clone();
    let workspace_root = state.workspace.workspace_root(&id);
    let project_id = id.clone();
    with_task(&state, &id, |task| {
        let reference = reference.clone();
        let workspace_root = workspace_root.clone();
        let project_id = project_id.clone();
        let state = state.clone();
        Box::pin(async move {
            task.subtask_by_reference(&reference)?;
            let mut breakers = state.breakers.lock().await;
            let breaker = breakers
                .entry(project_id)
                .or_insert_with(orchestrator_core::circuit_breaker::SubtaskCircuitBreaker::new);
            state.execution.execute_task(task, &reference, &workspace_root, breaker).await?;
            drop(breakers);
            sync_execution_state(planning.as_ref(), task);
            Ok(())
        })
    })
    .await
}

async fn fail_subtask(
    State(state): State<Arc<AppState>>,
    Path((id, reference)): Path<(String, String)>,
) -> ApiResult<()> {
    let planning = state.planning.clone();
    with_task(&state, &id, |task| {
        let reference = reference.clone();
        Box::pin(async move {
            let subtask = task.subtask_by_reference_mut(&reference)?;
            subtask.fail("marked failed via API".to_string());
            sync_execution_state(planning.as_ref(), task);
            Ok(())
        })
    })
    .await
}
