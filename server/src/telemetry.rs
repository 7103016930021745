use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the tracing subscriber for logging and telemetry.
pub fn init_telemetry(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log level configuration")?;

    let registry = Registry::default().with(env_filter);

    match config.format {
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty().with_target(true).with_file(true).with_line_number(true)).init();
        }
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_target(true).with_file(true).with_line_number(true).flatten_event(true))
                .init();
        }
        LogFormat::Compact => {
            registry.with(fmt::layer().compact().with_target(true)).init();
        }
    }

    tracing::info!(log_level = %config.level, log_format = ?config.format, "telemetry initialized");
    Ok(())
}

/// Span for one planning-pipeline phase (context gathering, scope, IFR, ...).
#[macro_export]
macro_rules! planning_span {
    ($phase:expr) => {
        tracing::info_span!("planning_phase", phase = $phase)
    };
}

/// Span for one execution-engine subtask run.
#[macro_export]
macro_rules! execution_span {
    ($subtask_id:expr) => {
        tracing::info_span!("execute_subtask", subtask_id = $subtask_id)
    };
}

pub fn log_startup_info(config: &crate::config::Config) {
    tracing::info!(
        server_address = %config.server_address(),
        projects_base_dir = %config.workspace.projects_base_dir,
        allowed_base_dir = %config.workspace.allowed_base_dir,
        llm_model = %config.llm.model,
        "orchestrator starting up"
    );
}

pub fn log_config_validation(config: &crate::config::Config) {
    match config.validate() {
        Ok(()) => tracing::info!("configuration validation passed"),
        Err(e) => tracing::error!(error = %e, "configuration validation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn logging_configs_cover_every_format() {
        let configs = vec![
            LoggingConfig { level: "info".into(), format: LogFormat::Pretty },
            LoggingConfig { level: "debug".into(), format: LogFormat::Json },
            LoggingConfig { level: "warn".into(), format: LogFormat::Compact },
        ];
        for config in configs {
            assert!(matches!(config.format, LogFormat::Pretty | LogFormat::Json | LogFormat::Compact));
        }
    }
}
