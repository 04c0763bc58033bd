//! Persona — one agent's perception state.
//!
//! Everything the pipeline mutates lives here and is owned by exactly one
//! agent, so concurrent agents never share mutable perception state.

use serde::{Deserialize, Serialize};

use crate::config::{ImportanceConfig, PerceptionConfig};
use crate::embedding::EmbeddingCache;
use crate::error::{PerceptError, Result};
use crate::memory::AssociativeMemory;
use crate::recorder::ImportanceAccumulator;
use crate::spatial::SpatialMemory;
use crate::types::{AgentId, ChatLine, SimTimestamp, TileCoord, Triple};

/// Per-agent working state read by the pipeline every tick.
///
/// Limits are kept as signed integers exactly as loaded so that invalid
/// values can be reported instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scratch {
    /// Full display name, e.g. `"Isabella Rodriguez"`.
    pub name: String,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Tile the agent is standing on.
    pub curr_tile: TileCoord,
    /// Current simulation time.
    #[serde(default)]
    pub curr_time: SimTimestamp,
    /// Vision radius in tiles.
    pub vision_r: i64,
    /// Maximum number of events noticed per tick.
    pub att_bandwidth: i64,
    /// Number of recent remembered events checked for novelty.
    pub retention: i64,
    /// What the agent is currently doing, in words.
    #[serde(default)]
    pub act_description: String,
    /// What the agent is currently doing, as a triple.
    #[serde(default = "default_act_event")]
    pub act_event: Triple,
    /// Transcript of the agent's ongoing conversation.
    #[serde(default)]
    pub chat: Vec<ChatLine>,
}

/// Validated per-tick limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptionLimits {
    /// Vision radius in tiles.
    pub vision_radius: u32,
    /// Attention bandwidth.
    pub attention_bandwidth: usize,
    /// Novelty window size.
    pub retention: usize,
}

impl Scratch {
    /// A scratch with the given name and position and limits from `config`.
    #[must_use]
    pub fn new(name: impl Into<String>, curr_tile: TileCoord, config: &PerceptionConfig) -> Self {
        let name = name.into();
        let (first_name, last_name) = match name.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.to_string()),
            None => (name.clone(), String::new()),
        };
        Self {
            act_event: Triple::new(&name, "", ""),
            name,
            first_name,
            last_name,
            curr_tile,
            curr_time: SimTimestamp::default(),
            vision_r: config.vision_radius,
            att_bandwidth: config.attention_bandwidth,
            retention: config.retention,
            act_description: String::new(),
            chat: Vec::new(),
        }
    }

    /// Validate the perception limits.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptError::Config`] if any limit is negative or does
    /// not fit the platform's integer width.
    pub fn limits(&self) -> Result<PerceptionLimits> {
        Ok(PerceptionLimits {
            vision_radius: non_negative("vision_r", &self.name, self.vision_r)?,
            attention_bandwidth: non_negative("att_bandwidth", &self.name, self.att_bandwidth)?,
            retention: non_negative("retention", &self.name, self.retention)?,
        })
    }

    /// Whether the agent is currently in a conversation.
    #[must_use]
    pub fn is_chatting(&self) -> bool {
        !self.chat.is_empty()
    }
}

fn non_negative<T: TryFrom<i64>>(field: &str, agent: &str, value: i64) -> Result<T> {
    if value < 0 {
        return Err(PerceptError::Config(format!(
            "{field} must be non-negative for {agent}, got {value}"
        )));
    }
    T::try_from(value).map_err(|_| {
        PerceptError::Config(format!("{field} is out of range for {agent}: {value}"))
    })
}

fn default_act_event() -> Triple {
    Triple::new("", "", "")
}

/// All perception state owned by one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Stable identity.
    pub id: AgentId,
    /// Per-tick working state.
    pub scratch: Scratch,
    /// Known places.
    pub spatial: SpatialMemory,
    /// Remembered events and chats.
    pub memory: AssociativeMemory,
    /// Embeddings of remembered descriptions.
    pub embeddings: EmbeddingCache,
    /// Reflection budget bookkeeping.
    pub importance: ImportanceAccumulator,
}

impl Persona {
    /// A fresh persona with empty memories.
    #[must_use]
    pub fn new(scratch: Scratch, importance: &ImportanceConfig) -> Self {
        Self {
            id: AgentId::new(),
            scratch,
            spatial: SpatialMemory::new(),
            memory: AssociativeMemory::new(),
            embeddings: EmbeddingCache::new(),
            importance: ImportanceAccumulator::new(importance.trigger_max),
        }
    }

    /// The agent's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.scratch.name
    }
}
