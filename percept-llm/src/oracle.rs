//! LLM-backed implementations of the core oracle traits.
//!
//! The perception pipeline is synchronous and expects oracles that always
//! answer. [`LlmOracle`] drives the async client on its own current-thread
//! runtime and replaces every failure with a fixed fallback.

use percept_core::config::LlmConfig;
use percept_core::embedding::EmbeddingOracle;
use percept_core::metrics::spans;
use percept_core::scoring::{PoignancyKind, PoignancyOracle};
use percept_core::types::Embedding;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info_span, warn};

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::prompt::PoignancyPrompts;
use crate::types::PoignancyReply;

/// Lowest poignancy rating.
pub const MIN_POIGNANCY: f32 = 1.0;
/// Highest poignancy rating.
pub const MAX_POIGNANCY: f32 = 10.0;

/// Parse a poignancy rating from model output.
///
/// Accepts a bare number (`"7"`, `" 7.0\n"`) or a JSON object with a
/// `poignancy` field, optionally surrounded by other text. The result is
/// clamped to the 1–10 scale.
///
/// # Errors
///
/// Returns `LlmError::ParseError` if no finite rating can be found.
pub fn parse_poignancy(text: &str) -> Result<f32, LlmError> {
    let trimmed = text.trim();

    let raw = if let Ok(n) = trimmed.parse::<f64>() {
        n
    } else {
        let object = match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(open), Some(close)) if open < close => &trimmed[open..=close],
            _ => {
                return Err(LlmError::ParseError(format!("no poignancy rating in '{trimmed}'")));
            }
        };
        serde_json::from_str::<PoignancyReply>(object)?.poignancy
    };

    if !raw.is_finite() {
        return Err(LlmError::ParseError(format!("non-finite poignancy {raw}")));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok((raw as f32).clamp(MIN_POIGNANCY, MAX_POIGNANCY))
}

/// Poignancy and embedding oracle backed by an LLM server.
///
/// Calls block the current thread; do not call from inside another tokio
/// runtime.
pub struct LlmOracle {
    client: LlmClient,
    runtime: Runtime,
    prompts: PoignancyPrompts,
    request_timeout_ms: u64,
    fallback_poignancy: f32,
    dimensions: usize,
}

impl LlmOracle {
    /// Wrap an existing client.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` if the runtime cannot be built.
    pub fn new(client: LlmClient, config: &LlmConfig) -> Result<Self, LlmError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LlmError::ConfigError(format!("failed to start runtime: {e}")))?;
        Ok(Self {
            client,
            runtime,
            prompts: PoignancyPrompts::builtin(),
            request_timeout_ms: config.request_timeout_ms,
            fallback_poignancy: config.fallback_poignancy.clamp(MIN_POIGNANCY, MAX_POIGNANCY),
            dimensions: config.embedding_dimensions,
        })
    }

    /// Build the client and oracle from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` for an unknown provider or if the
    /// runtime cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(LlmClient::from_config(config)?, config)
    }

    /// Replace the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PoignancyPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// The value returned when rating fails.
    #[must_use]
    pub fn fallback_poignancy(&self) -> f32 {
        self.fallback_poignancy
    }
}

impl PoignancyOracle for LlmOracle {
    fn score(&self, kind: PoignancyKind, text: &str) -> f32 {
        let _span = info_span!(spans::LLM_CALL, op = "poignancy", %kind).entered();
        let request = self.prompts.request(kind, text, self.request_timeout_ms);

        match self
            .runtime
            .block_on(self.client.generate_parsed(&request, parse_poignancy))
        {
            Ok(score) => {
                debug!(%kind, score, "Rated poignancy");
                score
            }
            Err(e) => {
                warn!(
                    %kind,
                    error = %e,
                    fallback = self.fallback_poignancy,
                    "Poignancy rating failed, using fallback"
                );
                self.fallback_poignancy
            }
        }
    }
}

impl EmbeddingOracle for LlmOracle {
    fn embed(&self, text: &str) -> Embedding {
        let _span = info_span!(spans::LLM_CALL, op = "embed").entered();

        match self.runtime.block_on(self.client.embed(text)) {
            Ok(vector) => {
                if vector.len() != self.dimensions {
                    warn!(
                        expected = self.dimensions,
                        actual = vector.len(),
                        "Embedding dimension differs from configuration"
                    );
                }
                Embedding(vector)
            }
            Err(e) => {
                warn!(error = %e, "Embedding failed, using zero vector");
                Embedding(vec![0.0; self.dimensions])
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        self.client.embedding_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_numbers() {
        assert_eq!(parse_poignancy("7").expect("int"), 7.0);
        assert_eq!(parse_poignancy(" 3.5\n").expect("float"), 3.5);
    }

    #[test]
    fn parses_json_objects() {
        assert_eq!(parse_poignancy(r#"{"poignancy": 8}"#).expect("json"), 8.0);
        assert_eq!(
            parse_poignancy("Sure! {\"poignancy\": 2} is my rating.").expect("embedded json"),
            2.0
        );
    }

    #[test]
    fn clamps_to_scale() {
        assert_eq!(parse_poignancy("0").expect("low"), 1.0);
        assert_eq!(parse_poignancy("42").expect("high"), 10.0);
        assert_eq!(parse_poignancy(r#"{"poignancy": -3}"#).expect("negative"), 1.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_poignancy("very poignant"), Err(LlmError::ParseError(_))));
        assert!(matches!(parse_poignancy(r#"{"score": 5}"#), Err(LlmError::ParseError(_))));
        assert!(matches!(parse_poignancy("NaN"), Err(LlmError::ParseError(_))));
        assert!(matches!(parse_poignancy(""), Err(LlmError::ParseError(_))));
    }

    fn offline() -> LlmOracle {
        let config = LlmConfig {
            provider: "none".into(),
            embedding_dimensions: 8,
            fallback_poignancy: 4.0,
            ..LlmConfig::default()
        };
        LlmOracle::from_config(&config).expect("offline oracle")
    }

    #[test]
    fn offline_oracle_falls_back() {
        let oracle = offline();
        assert_eq!(oracle.score(PoignancyKind::Event, "Bob is having breakfast"), 4.0);
        assert_eq!(oracle.score(PoignancyKind::Chat, "planning a party"), 4.0);

        let emb = oracle.embed("in bed");
        assert_eq!(emb.dimensions(), 8);
        assert!(emb.0.iter().all(|&x| x == 0.0));
        assert_eq!(oracle.dimensions(), 8);
    }

    #[test]
    fn fallback_is_clamped() {
        let config = LlmConfig {
            provider: "none".into(),
            fallback_poignancy: 50.0,
            ..LlmConfig::default()
        };
        let oracle = LlmOracle::from_config(&config).expect("offline oracle");
        assert_eq!(oracle.fallback_poignancy(), 10.0);
    }

    #[test]
    fn unreachable_server_falls_back_after_retries() {
        let config = LlmConfig {
            provider: "ollama".into(),
            base_url: "http://127.0.0.1:1".into(),
            request_timeout_ms: 200,
            max_retries: 1,
            embedding_dimensions: 4,
            ..LlmConfig::default()
        };
        let oracle = LlmOracle::from_config(&config).expect("oracle");
        assert_eq!(oracle.score(PoignancyKind::Event, "stove is idle"), 4.0);
        assert_eq!(oracle.embed("stove").0, vec![0.0; 4]);
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(LlmOracle::from_config(&config), Err(LlmError::ConfigError(_))));
    }
}
