//! LLM provider factory.
//!
//! Resolves the active provider from the application configuration and
//! builds the matching client.

use std::sync::Arc;

use qa_core::{AppConfig, AppError, AppResult};

use crate::client::LlmClient;
use crate::providers::OpenAiCompatClient;

/// Create the chat client for the configured provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider's API key is missing.
pub fn create_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let settings = config.active_provider();
    let api_key = settings.api_key.as_deref().ok_or_else(|| {
        AppError::Config(format!(
            "{} provider requires {}",
            config.provider.as_str(),
            config.provider.api_key_var()
        ))
    })?;

    tracing::debug!(
        provider = config.provider.as_str(),
        base = %settings.api_base,
        "Creating chat client"
    );

    let client = OpenAiCompatClient::new(config.provider, &settings.api_base, api_key)?;
    Ok(Arc::new(client))
}
