// src/error.rs
//! Error types for the hotness engine.

use thiserror::Error;

/// Errors surfaced by the engine to its caller.
#[derive(Debug, Error)]
pub enum HotnessError {
    /// Weights are missing, negative, non-finite, or do not sum to 1.0.
    #[error("invalid weight configuration: {0}")]
    InvalidWeightConfiguration(String),

    /// The embedding provider failed after the retry policy was exhausted.
    #[error("embedding unavailable: {cause}")]
    EmbeddingUnavailable { cause: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("history store error: {0}")]
    History(String),
}

/// Low-level failures reported by an embedding provider for a single call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("embedding provider disabled")]
    Disabled,
}

impl EmbeddingError {
    /// Transient failures worth another attempt: timeouts, transport errors, 429 and 5xx.
    pub fn is_retriable(&self) -> bool {
        match self {
            EmbeddingError::Timeout | EmbeddingError::Transport(_) => true,
            EmbeddingError::Status(code) => *code == 429 || (500..600).contains(code),
            EmbeddingError::Malformed(_) | EmbeddingError::Disabled => false,
        }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EmbeddingError::Timeout
        } else if let Some(status) = e.status() {
            EmbeddingError::Status(status.as_u16())
        } else if e.is_decode() {
            EmbeddingError::Malformed(e.to_string())
        } else {
            EmbeddingError::Transport(e.to_string())
        }
    }
}
