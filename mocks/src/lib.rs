//! Test doubles for the planning pipeline and execution engine.
//!
//! This crate provides:
//! - [`MockLlmClient`], a scripted [`LLMClient`](orchestrator_core::protocol::LLMClient)
//!   that replays a fixed queue of JSON responses
//! - fixture builders for constructing a full `Task` hierarchy without going
//!   through the planning pipeline

pub mod fixtures;
pub mod mock_llm;

pub use mock_llm::MockLlmClient;
