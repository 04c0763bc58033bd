//! LLM Client — unified interface for Ollama and OpenAI-compatible backends.

use std::future::Future;
use std::time::{Duration, Instant};

use percept_core::config::LlmConfig;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally (recommended).
    Ollama {
        /// Server root, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible API.
    OpenAiCompatible {
        /// Server root without the `/v1` suffix.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM available. Every call fails and callers fall back.
    None,
}

impl LlmProvider {
    /// Build the provider named in `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` for an unknown provider name.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama { base_url }),
            "openai" => Ok(Self::OpenAiCompatible {
                base_url,
                api_key: config.api_key.clone().unwrap_or_default(),
            }),
            "none" => Ok(Self::None),
            other => Err(LlmError::ConfigError(format!("unknown LLM provider '{other}'"))),
        }
    }
}

/// The main LLM client that routes requests to the appropriate backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    embedding_model: String,
    embed_timeout_ms: u64,
    max_retries: u32,
    backoff_ms: u64,
}

/// Delay before the first retry; doubles on each further retry.
pub const DEFAULT_BACKOFF_MS: u64 = 100;
/// Upper bound on any single retry delay.
pub const MAX_BACKOFF_MS: u64 = 2_000;

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(
        provider: LlmProvider,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            embedding_model: embedding_model.into(),
            embed_timeout_ms: 5000,
            max_retries,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` for an unknown provider name.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut client = Self::new(
            LlmProvider::from_config(config)?,
            &config.model,
            &config.embedding_model,
            config.max_retries,
        );
        client.embed_timeout_ms = config.request_timeout_ms;
        Ok(client.with_backoff(config.retry_backoff_ms))
    }

    /// Create a client with no LLM backend (all calls fail → fallback).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, "", "", 0)
    }

    /// Set the delay before the first retry. Zero disables backoff.
    #[must_use]
    pub fn with_backoff(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    /// Delay before retry number `retry` (1 for the first retry).
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1_u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Completion model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embedding model name.
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Generate a completion.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the LLM is unavailable or all attempts fail.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.with_retries("generate", move || self.generate_once(request)).await
    }

    /// Generate a completion and parse it, retrying on transport *and*
    /// parse failures alike.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the LLM is unavailable or no attempt produced a
    /// parseable answer.
    pub async fn generate_parsed<T>(
        &self,
        request: &LlmRequest,
        parse: impl Fn(&str) -> Result<T, LlmError>,
    ) -> Result<T, LlmError> {
        let parse = &parse;
        self.with_retries("generate", move || async move {
            let response = self.generate_once(request).await?;
            parse(&response.text)
        })
        .await
    }

    /// Embed `text` with the embedding model.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the LLM is unavailable or all attempts fail.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.with_retries("embed", move || self.embed_once(text)).await
    }

    // ------------------------------------------------------------------
    // Retry loop
    // ------------------------------------------------------------------

    async fn with_retries<T, F, Fut>(&self, op: &str, mut attempt_fn: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        if !self.is_available() {
            return Err(LlmError::Unavailable("No LLM provider configured".into()));
        }

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                debug!(
                    op,
                    attempt = attempt + 1,
                    of = self.max_retries + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Retrying LLM call"
                );
                tokio::time::sleep(delay).await;
            }
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(op, attempt = attempt + 1, error = %e, "LLM call failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    // ------------------------------------------------------------------
    // Single attempts
    // ------------------------------------------------------------------

    async fn generate_once(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let (url, body, auth) = match &self.provider {
            LlmProvider::None => {
                return Err(LlmError::Unavailable("No LLM provider configured".into()));
            }
            LlmProvider::Ollama { base_url } => {
                let mut body = json!({
                    "model": self.model,
                    "prompt": format!("{}\n\n{}", request.system, request.user),
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                    }
                });
                if request.json_mode {
                    body["format"] = json!("json");
                }
                (format!("{base_url}/api/generate"), body, None)
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let mut body = json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": request.system },
                        { "role": "user", "content": request.user },
                    ],
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                if request.json_mode {
                    body["response_format"] = json!({ "type": "json_object" });
                }
                (format!("{base_url}/v1/chat/completions"), body, Some(api_key.as_str()))
            }
        };

        let start = Instant::now();
        let json = self.post_json(&url, &body, auth, request.timeout_ms).await?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (text, tokens) = match self.provider {
            LlmProvider::OpenAiCompatible { .. } => (
                json["choices"][0]["message"]["content"].as_str(),
                json["usage"]["completion_tokens"].as_u64(),
            ),
            _ => (json["response"].as_str(), json["eval_count"].as_u64()),
        };
        let text = text
            .ok_or_else(|| LlmError::ParseError(format!("no completion text in response: {json}")))?
            .to_string();

        Ok(LlmResponse {
            text,
            tokens_generated: tokens.and_then(|t| u32::try_from(t).ok()).unwrap_or(0),
            latency_ms,
            model: self.model.clone(),
        })
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let (url, body, auth) = match &self.provider {
            LlmProvider::None => {
                return Err(LlmError::Unavailable("No LLM provider configured".into()));
            }
            LlmProvider::Ollama { base_url } => (
                format!("{base_url}/api/embeddings"),
                json!({ "model": self.embedding_model, "prompt": text }),
                None,
            ),
            LlmProvider::OpenAiCompatible { base_url, api_key } => (
                format!("{base_url}/v1/embeddings"),
                json!({ "model": self.embedding_model, "input": text }),
                Some(api_key.as_str()),
            ),
        };

        let json = self.post_json(&url, &body, auth, self.embed_timeout_ms).await?;
        let vector = match self.provider {
            LlmProvider::OpenAiCompatible { .. } => &json["data"][0]["embedding"],
            _ => &json["embedding"],
        };
        let values = vector
            .as_array()
            .ok_or_else(|| LlmError::ParseError("no embedding array in response".into()))?;

        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| LlmError::ParseError(format!("non-numeric embedding value {v}")))
            })
            .collect()
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
        timeout_ms: u64,
    ) -> Result<serde_json::Value, LlmError> {
        let mut req = self
            .http
            .post(url)
            .json(body)
            .timeout(Duration::from_millis(timeout_ms));
        if let Some(key) = bearer {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(timeout_ms)
            } else {
                e.into()
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!("HTTP {status}: {detail}")));
        }

        resp.json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))
    }
}
