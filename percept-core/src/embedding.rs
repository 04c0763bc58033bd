//! Embedding oracle abstraction and the per-agent embedding cache.
//!
//! The oracle turns description strings into vectors. Production
//! implementations live in `percept-llm`; this module provides the trait,
//! two offline providers and the cache that guarantees each key is
//! embedded at most once per agent lifetime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Embedding;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Implementations never fail: transport errors, retries and fallbacks are
/// handled inside the implementation, which must always return a vector.
pub trait EmbeddingOracle: Send + Sync {
    /// Embed a single text string.
    fn embed(&self, text: &str) -> Embedding;

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A human-readable name for the model (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Embedding key
// ---------------------------------------------------------------------------

/// The text actually embedded for a description.
///
/// If the description contains a parenthesized clause, only its trimmed
/// content is used: `"Bob is sleeping (in bed)"` → `"in bed"`. A missing
/// closing parenthesis or an empty clause falls back to the full text.
#[must_use]
pub fn embedding_key(description: &str) -> &str {
    let Some(open) = description.find('(') else {
        return description;
    };
    let rest = &description[open + 1..];
    let Some(close) = rest.find(')') else {
        return description;
    };
    let inner = rest[..close].trim();
    if inner.is_empty() { description } else { inner }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Whether a cache lookup had to call the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The key was already cached.
    Hit,
    /// The oracle was called and the result inserted.
    Miss,
}

/// Normalized description → embedding, owned by one agent. No eviction.
///
/// Lookups take `&mut self`, so check, fetch and insert for one key can
/// never interleave with another lookup of the same key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingCache {
    entries: HashMap<String, Embedding>,
}

impl EmbeddingCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached embedding for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Embedding> {
        self.entries.get(key)
    }

    /// Insert or replace an embedding.
    pub fn insert(&mut self, key: impl Into<String>, embedding: Embedding) {
        self.entries.insert(key.into(), embedding);
    }

    /// Return the cached embedding for `key`, calling `oracle` only on a miss.
    pub fn get_or_embed<O: EmbeddingOracle + ?Sized>(
        &mut self,
        key: &str,
        oracle: &O,
    ) -> (Embedding, CacheOutcome) {
        if let Some(hit) = self.entries.get(key) {
            return (hit.clone(), CacheOutcome::Hit);
        }
        let fresh = oracle.embed(key);
        self.entries.insert(key.to_string(), fresh.clone());
        (fresh, CacheOutcome::Miss)
    }

    /// Make sure `key` is cached, calling `oracle` only on a miss.
    pub fn ensure<O: EmbeddingOracle + ?Sized>(&mut self, key: &str, oracle: &O) -> CacheOutcome {
        if self.entries.contains_key(key) {
            return CacheOutcome::Hit;
        }
        self.entries.insert(key.to_string(), oracle.embed(key));
        CacheOutcome::Miss
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Stub / Zero-cost provider (for tests & offline runs)
// ---------------------------------------------------------------------------

/// A stub embedding provider that returns zero-vectors.
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    /// Create a new stub provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dims: dimensions }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(768)
    }
}

impl EmbeddingOracle for StubEmbeddingProvider {
    fn embed(&self, _text: &str) -> Embedding {
        Embedding(vec![0.0; self.dims])
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "stub-zero-vector"
    }
}

// ---------------------------------------------------------------------------
// Hashing provider (deterministic, no model)
// ---------------------------------------------------------------------------

/// Bag-of-words feature hashing into a fixed number of buckets.
///
/// Deterministic across runs; texts sharing a word always have positive
/// cosine similarity. Useful for offline simulation and integration tests.
pub struct HashingEmbeddingProvider {
    dims: usize,
}

impl HashingEmbeddingProvider {
    /// Create a hashing provider. `dimensions` is clamped to at least 1.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
        }
    }
}

impl EmbeddingOracle for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Embedding {
        let mut v = vec![0.0_f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dims as u64) as usize;
            v[bucket] += 1.0;
        }

        // L2-normalize
        let mag: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag >= f32::EPSILON {
            for x in &mut v {
                *x /= mag;
            }
        }
        Embedding(v)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

fn fnv1a(s: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    s.bytes()
        .fold(OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
