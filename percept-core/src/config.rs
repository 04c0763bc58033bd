//! Configuration for the perception system.
//!
//! Maps directly to `percept.toml`. Every field has a default, so an empty
//! file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PerceptError, Result};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceptConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Default perception limits for new personas.
    #[serde(default)]
    pub perception: PerceptionConfig,
    /// Reflection budget.
    #[serde(default)]
    pub importance: ImportanceConfig,
    /// LLM oracle settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl PerceptConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `PerceptError::Config` if the TOML is invalid or a perception
    /// limit is negative.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| PerceptError::Config(e.to_string()))?;
        config.perception.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Perception limits given to newly created personas.
///
/// Signed so that a bad file is reported rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptionConfig {
    /// Vision radius in tiles.
    #[serde(default = "default_vision_radius")]
    pub vision_radius: i64,
    /// Maximum events noticed per tick.
    #[serde(default = "default_attention_bandwidth")]
    pub attention_bandwidth: i64,
    /// Recent remembered events checked for novelty.
    #[serde(default = "default_retention")]
    pub retention: i64,
}

impl PerceptionConfig {
    /// Reject negative limits.
    ///
    /// # Errors
    /// Returns `PerceptError::Config` naming the first negative field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("vision_radius", self.vision_radius),
            ("attention_bandwidth", self.attention_bandwidth),
            ("retention", self.retention),
        ] {
            if value < 0 {
                return Err(PerceptError::Config(format!(
                    "perception.{field} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            vision_radius: default_vision_radius(),
            attention_bandwidth: default_attention_bandwidth(),
            retention: default_retention(),
        }
    }
}

/// Reflection budget settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportanceConfig {
    /// Importance budget restored after each reflection.
    #[serde(default = "default_trigger_max")]
    pub trigger_max: f32,
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            trigger_max: default_trigger_max(),
        }
    }
}

/// LLM integration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_ollama")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Bearer token for OpenAI-compatible servers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Completion model used for poignancy ratings.
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Dimensionality of the embedding model (and of fallback vectors).
    #[serde(default = "default_768")]
    pub embedding_dimensions: usize,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_5000")]
    pub request_timeout_ms: u64,
    /// Retries after the first failed attempt.
    #[serde(default = "default_2")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds; doubles per retry.
    #[serde(default = "default_100")]
    pub retry_backoff_ms: u64,
    /// Poignancy used when every attempt fails.
    #[serde(default = "default_fallback_poignancy")]
    pub fallback_poignancy: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_ollama(),
            base_url: default_ollama_url(),
            api_key: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_768(),
            request_timeout_ms: default_5000(),
            max_retries: default_2(),
            retry_backoff_ms: default_100(),
            fallback_poignancy: default_fallback_poignancy(),
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value helpers (required by serde)
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_ollama() -> String { "ollama".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "qwen2.5:1.5b".to_string() }
fn default_embedding_model() -> String { "nomic-embed-text".to_string() }
fn default_vision_radius() -> i64 { 4 }
fn default_attention_bandwidth() -> i64 { 3 }
fn default_retention() -> i64 { 5 }
fn default_trigger_max() -> f32 { 150.0 }
fn default_fallback_poignancy() -> f32 { 4.0 }
fn default_2() -> u32 { 2 }
fn default_768() -> usize { 768 }
fn default_5000() -> u64 { 5000 }
fn default_100() -> u64 { 100 }
