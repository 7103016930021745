//! Activity Tracker & Streaming (C10).
//!
//! Every in-flight request owns one [`ActivityTracker`], keyed by
//! `(project_id, task_id)` in the process-wide [`TrackerRegistry`]. The
//! registry's own lock is only ever held for the insert/remove of a
//! tracker handle; emitting an event takes the tracker's *own* lock, so a
//! slow consumer never blocks an unrelated task from getting its tracker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::router::AgentType;

/// A single freeform activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub description: String,
    pub at: DateTime<Utc>,
}

/// Record of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
    pub result: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Record of control handing off from one specialist agent to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTransfer {
    pub from: AgentType,
    pub to: AgentType,
    pub reason: String,
    pub confidence: f64,
    pub at: DateTime<Utc>,
}

/// Final accounting emitted once a streamed response completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub elapsed_ms: u128,
    pub tool_call_count: u32,
    pub activity_count: u32,
}

/// Ordered events a streaming HTTP handler forwards to the client. A single
/// writer serializes these onto the response body so event order on the
/// wire matches emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    ProseChunk(String),
    ToolCallStart { name: String },
    ToolCallEnd { name: String, result: String },
    AgentTransfer(AgentTransfer),
    Error(String),
    Summary(ExecutionSummary),
}

/// Per-request activity log plus the channel streaming events out to the
/// HTTP handler.
pub struct ActivityTracker {
    activities: Vec<Activity>,
    tool_calls: Vec<ToolCall>,
    transfers: Vec<AgentTransfer>,
    sender: mpsc::UnboundedSender<StreamEvent>,
    started_at: Instant,
}

impl ActivityTracker {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                activities: Vec::new(),
                tool_calls: Vec::new(),
                transfers: Vec::new(),
                sender,
                started_at: Instant::now(),
            },
            receiver,
        )
    }

    pub fn record_activity(&mut self, description: impl Into<String>) {
        self.activities.push(Activity {
            description: description.into(),
            at: Utc::now(),
        });
    }

    pub fn emit_prose(&self, chunk: impl Into<String>) {
        let _ = self.sender.send(StreamEvent::ProseChunk(chunk.into()));
    }

    pub fn start_tool_call(&mut self, name: impl Into<String>, arguments: serde_json::Value) {
        let name = name.into();
        self.tool_calls.push(ToolCall {
            name: name.clone(),
            arguments,
            result: None,
            started_at: Utc::now(),
            completed_at: None,
        });
        let _ = self.sender.send(StreamEvent::ToolCallStart { name });
    }

    /// Record the outcome of the most recently started call matching
    /// `name` and emit exactly one `ToolCallEnd` event for it.
    pub fn end_tool_call(&mut self, name: &str, result: impl Into<String>) {
        let result = result.into();
        if let Some(call) = self.tool_calls.iter_mut().rev().find(|c| c.name == name && c.completed_at.is_none()) {
            call.result = Some(result.clone());
            call.completed_at = Some(Utc::now());
        }
        let _ = self.sender.send(StreamEvent::ToolCallEnd {
            name: name.to_string(),
            result,
        });
    }

    pub fn record_transfer(&mut self, from: AgentType, to: AgentType, reason: impl Into<String>, confidence: f64) {
        let transfer = AgentTransfer {
            from,
            to,
            reason: reason.into(),
            confidence,
            at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        let _ = self.sender.send(StreamEvent::AgentTransfer(transfer));
    }

    pub fn emit_error(&self, message: impl Into<String>) {
        let _ = self.sender.send(StreamEvent::Error(message.into()));
    }

    /// Emit the final `Summary` event. Call exactly once, after all other
    /// activity for the request has been recorded.
    pub fn finish(&self) {
        let summary = ExecutionSummary {
            elapsed_ms: self.started_at.elapsed().as_millis(),
            tool_call_count: self.tool_calls.len() as u32,
            activity_count: self.activities.len() as u32,
        };
        let _ = self.sender.send(StreamEvent::Summary(summary));
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn transfers(&self) -> &[AgentTransfer] {
        &self.transfers
    }
}

/// Process-wide registry of in-flight trackers, keyed by `(project_id,
/// task_id)`.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: Mutex<HashMap<(String, String), Arc<Mutex<ActivityTracker>>>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tracker for `(project_id, task_id)`, replacing any
    /// prior one for the same key.
    pub async fn register(&self, project_id: &str, task_id: &str, tracker: ActivityTracker) -> Arc<Mutex<ActivityTracker>> {
        let handle = Arc::new(Mutex::new(tracker));
        let mut map = self.trackers.lock().await;
        map.insert((project_id.to_string(), task_id.to_string()), handle.clone());
        handle
    }

    pub async fn get(&self, project_id: &str, task_id: &str) -> Option<Arc<Mutex<ActivityTracker>>> {
        let map = self.trackers.lock().await;
        map.get(&(project_id.to_string(), task_id.to_string())).cloned()
    }

    pub async fn remove(&self, project_id: &str, task_id: &str) {
        let mut map = self.trackers.lock().await;
        map.remove(&(project_id.to_string(), task_id.to_string()));
    }
}
