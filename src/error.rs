//! Error types for Synheart Engage

use thiserror::Error;

/// Errors that can occur while tracking or retrieving recommendations
#[derive(Debug, Error)]
pub enum EngageError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Recommendation retrieval failed: {0}")]
    Retrieval(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid interaction trace: {0}")]
    InvalidTrace(String),

    #[error("Unknown recommendation strategy: {0}")]
    UnknownStrategy(String),
}
