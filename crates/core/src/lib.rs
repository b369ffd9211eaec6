//! QA Agent Core Library
//!
//! This crate provides the foundational utilities shared by the QA Agent
//! server and the ingestion tool:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (provider selection, CORS, RAG settings)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, CorsConfig, ProviderKind, ProviderSettings, RagConfig};
pub use logging::{init_logging, LogFormat};
pub use error::{AppError, AppResult};
