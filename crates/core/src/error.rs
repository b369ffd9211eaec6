//! Error types for the QA Agent.
//!
//! This module defines a unified error enum covering every failure category
//! in the system: configuration, caller input, upstream LLM failures,
//! embedding and vector store failures, and page fetching during ingestion.

use thiserror::Error;

/// Unified error type for the QA Agent.
///
/// All library functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad caller input (empty question, mismatched array lengths, ...)
    #[error("{0}")]
    Validation(String),

    /// Non-success response from the LLM provider
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// The provider answered 200 but the body did not have the expected shape
    #[error("Unexpected response: {0}")]
    ResponseShape(String),

    /// Embedding API failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store failures
    #[error("Vector store error: {0}")]
    Store(String),

    /// Ids that already exist in the collection
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Page fetch failures during ingestion
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
