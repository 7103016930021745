//! Ambient configuration (§6.3): a `default.toml` baked into the binary,
//! overlaid by an optional file, overlaid by `ORCH_`-prefixed environment
//! variables, plus the handful of bare variable names the spec names
//! directly (`LLM_API_KEY`, `LLM_MODEL`, `ALLOWED_BASE_DIR`,
//! `PROJECTS_BASE_DIR`) for operator convenience.

use std::env;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkspaceConfig {
    pub projects_base_dir: String,
    pub allowed_base_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Config {
    /// Load `default.toml`, an optional `CONFIG_FILE`, then `ORCH_`-prefixed
    /// environment overrides, then the spec-named bare environment
    /// variables (which always win, since they are what an operator is
    /// most likely to set directly).
    pub fn from_env() -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .add_source(File::from_str(include_str!("../config/default.toml"), FileFormat::Toml));

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false).format(FileFormat::Toml));
        }

        builder = builder.add_source(Environment::with_prefix("ORCH").separator("_").try_parsing(true));

        let config = builder.build().context("failed to build configuration")?;
        let mut result: Config = config.try_deserialize().context("failed to deserialize configuration")?;

        Self::apply_spec_env_vars(&mut result);
        Ok(result)
    }

    fn apply_spec_env_vars(config: &mut Config) {
        if let Ok(v) = env::var("LLM_API_KEY") {
            config.llm.api_key = Some(v);
        }
        if let Ok(v) = env::var("LLM_MODEL") {
            config.llm.model = v;
        }
        if let Ok(v) = env::var("ALLOWED_BASE_DIR") {
            config.workspace.allowed_base_dir = v;
        }
        if let Ok(v) = env::var("PROJECTS_BASE_DIR") {
            config.workspace.projects_base_dir = v;
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("invalid log level: {other}"),
        }
        if self.server.port == 0 {
            anyhow::bail!("server port cannot be 0");
        }
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm model must not be empty");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                model: "gpt-4o".to_string(),
            },
            server: ServerConfig {
                listen_addr: "127.0.0.1".to_string(),
                port: 3000,
            },
            workspace: WorkspaceConfig {
                projects_base_dir: "./data/projects".to_string(),
                allowed_base_dir: "./data/workspaces".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_address(), "127.0.0.1:3000");
    }

    #[test]
    fn invalid_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn spec_env_vars_override_after_load() {
        let mut config = Config::default();
        env::set_var("ALLOWED_BASE_DIR", "/tmp/sandbox-test-root");
        Config::apply_spec_env_vars(&mut config);
        assert_eq!(config.workspace.allowed_base_dir, "/tmp/sandbox-test-root");
        env::remove_var("ALLOWED_BASE_DIR");
    }
}
