//! QA Agent server
//!
//! Loads configuration, initializes logging and serves the HTTP API.

use anyhow::Context;
use clap::Parser;
use qa_core::{init_logging, AppConfig};
use qa_server::AppState;
use std::path::PathBuf;

/// Retrieval-augmented question answering API
#[derive(Parser, Debug)]
#[command(name = "qa-server")]
#[command(about = "Retrieval-augmented question answering API", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to a YAML config file
    #[arg(short, long, env = "QA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config)
        .context("Invalid configuration")?
        .with_overrides(cli.host, cli.port, cli.log_level, cli.no_color);

    init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("QA Agent server starting");
    if let Some(path) = &config.env_file {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }
    tracing::debug!(
        rag_enabled = config.rag.enabled,
        collection = %config.rag.collection,
        "Loaded configuration"
    );

    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize services")?;

    if let Some(store) = state.vectors.as_ref() {
        match store.count().await {
            Ok(count) => tracing::info!(count, "Vector store ready"),
            Err(e) => tracing::warn!(error = %e, "Could not count stored chunks"),
        }
    }

    qa_server::run(state).await?;
    Ok(())
}
