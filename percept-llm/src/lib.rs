//! # percept-llm — LLM oracles for percept
//!
//! Implements the core [`PoignancyOracle`](percept_core::PoignancyOracle)
//! and [`EmbeddingOracle`](percept_core::EmbeddingOracle) traits on top of
//! an LLM server:
//!   - **Ollama** (local, recommended default)
//!   - **OpenAI-compatible API**
//!   - **None** (offline; every call returns the fallback)
//!
//! All LLM calls go through this crate, ensuring:
//!   - Timeout management
//!   - Retry, including on unparseable answers
//!   - A deterministic fallback so perception never fails on the network
//!
//! ```text
//! perceive ──► LlmOracle::score ──► LlmClient::generate_parsed ──► /api/generate
//!          └─► LlmOracle::embed ──► LlmClient::embed          ──► /api/embeddings
//!                    │
//!                    └── on failure: fallback_poignancy / zero vector
//! ```

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod oracle;
pub mod prompt;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use oracle::{LlmOracle, parse_poignancy};
pub use prompt::PoignancyPrompts;
pub use types::{LlmRequest, LlmResponse};
