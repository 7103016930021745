mod config;
mod execution;
mod http;
mod llm_client;
mod planning;
mod setup;
mod state;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use telemetry::{init_telemetry, log_config_validation, log_startup_info};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "task-server")]
#[command(about = "Autonomous task-planning and execution server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Listen address override
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(ref config_file) = cli.config {
        std::env::set_var("CONFIG_FILE", config_file);
    }

    let mut config = Config::from_env().context("failed to load configuration")?;

    if let Some(ref listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).context("failed to load configuration")?;

    init_telemetry(&config.logging).context("failed to initialize telemetry")?;
    log_config_validation(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "configuration validation failed");
        std::process::exit(1);
    }

    log_startup_info(&config);

    setup::ensure_base_directories(&config)
        .await
        .context("failed to prepare base directories")?;

    let app = setup::build_app(&config).context("failed to initialize application")?;

    let server_addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("failed to bind {server_addr}"))?;

    info!("listening on http://{server_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl+c");
        info!("received Ctrl+C, shutting down");
    }
}
