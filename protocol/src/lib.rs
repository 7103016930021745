//! Agent routing and activity tracking.
//!
//! This crate sits between the planning/execution core and the agents that
//! carry out individual requests. It answers two questions that have
//! nothing to do with persistence or HTTP transport:
//!
//! - which specialist agent should handle a given message ([`router`])
//! - what is that agent doing right now, and how does a caller watch it
//!   happen in real time ([`tracker`])
//!
//! The thin HTTP façade that turns [`tracker::StreamEvent`]s into an SSE
//! response lives in the server crate, not here.

pub mod router;
pub mod tracker;

pub use router::{analyze_request_intent, AgentType, IntentScore, CONFIDENCE_FLOOR};
pub use tracker::{Activity, ActivityTracker, AgentTransfer, ExecutionSummary, StreamEvent, ToolCall, TrackerRegistry};
