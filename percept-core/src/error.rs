//! Error types for the perception core.

use thiserror::Error;

/// Top-level error type for all perception operations.
#[derive(Error, Debug)]
pub enum PerceptError {
    /// Invalid configuration, rejected before a tick begins.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No saved state exists for the given agent.
    #[error("Agent not found: {0}")]
    AgentNotFound(crate::AgentId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PerceptError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, PerceptError>;
