//! HTTP API for the QA Agent.
//!
//! Exposes health, question answering and vector store endpoints over axum.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::AppState;

use qa_core::{AppConfig, AppResult};

/// Bind `host:port` from the config and serve until the process stops.
pub async fn run(state: AppState) -> AppResult<()> {
    let config: &AppConfig = &state.config;
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(state.clone())?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        "QA Agent listening on http://{} (provider: {}, model: {})",
        listener.local_addr()?,
        config.provider.as_str(),
        config.model
    );

    axum::serve(listener, app).await?;
    Ok(())
}
