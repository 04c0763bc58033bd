//! # Percept Core Library
//!
//! The perception stage of a generative-agent simulation. Each tick an agent
//! looks at the tiles around it and turns what it sees into memory:
//!
//! - **Scan** — events on nearby tiles in the agent's own arena, nearest first
//! - **Spatial memory** — every tile seen grows the world → sector → arena →
//!   object tree of known places
//! - **Attention** — only the `att_bandwidth` nearest events are noticed
//! - **Novelty** — events already among the last `retention` memories are dropped
//! - **Recording** — novel events become memory nodes with keywords, a cached
//!   embedding and a poignancy score that charges the reflection budget
//!
//! The world, the embedding model and the poignancy model are collaborators
//! behind the [`World`], [`EmbeddingOracle`] and [`PoignancyOracle`] traits.
//!
//! ## Performance Contract
//!
//! The pipeline itself is allocation-light and oracle-bound:
//! - Scan + rank (radius 4, 81 tiles): < 50μs
//! - Embedding lookups hit the per-agent cache after the first sighting

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attention;
pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod novelty;
pub mod perceive;
pub mod persistence;
pub mod persona;
pub mod recorder;
pub mod scan;
pub mod scoring;
pub mod spatial;
pub mod types;
pub mod world;

pub use config::{PerceptConfig, PerceptionConfig};
pub use embedding::{EmbeddingCache, EmbeddingOracle};
pub use error::{PerceptError, Result};
pub use memory::{AssociativeMemory, MemoryNode, MemoryStore};
pub use perceive::{Perceiver, perceive};
pub use persona::{Persona, Scratch};
pub use scoring::{PoignancyKind, PoignancyOracle};
pub use spatial::SpatialMemory;
pub use types::*;
pub use world::{TileEvent, TileObservation, World};
