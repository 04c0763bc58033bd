//! Error types for the town driver.

use percept_core::{PerceptError, TileCoord};
use percept_llm::LlmError;
use thiserror::Error;

/// Errors raised while building or running a town.
#[derive(Debug, Error)]
pub enum TownError {
    /// The map layout is malformed.
    #[error("Layout error: {0}")]
    Layout(String),

    /// A coordinate lies outside the map.
    #[error("Tile {0} is outside the map")]
    OutOfBounds(TileCoord),

    /// No persona with that name lives in the town.
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    /// A perception or persistence failure.
    #[error(transparent)]
    Core(#[from] PerceptError),

    /// The LLM oracle could not be built.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TownError>;
