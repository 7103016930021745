//! Task Orchestration Server
//!
//! This library provides the HTTP surface, planning pipeline, and execution
//! engine for the autonomous task-planning platform. It includes configuration
//! management, telemetry, and application wiring.

pub mod config;
pub mod execution;
pub mod http;
pub mod llm_client;
pub mod planning;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use setup::build_app;
pub use state::AppState;
pub use telemetry::init_telemetry;
