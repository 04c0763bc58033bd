//! Memory recording — turning a novel event into durable memory.
//!
//! For each novel event the recorder derives keywords, makes sure the
//! embedding of its key text is cached, scores its poignancy, records a
//! linked chat node when the event is the agent's own conversation, appends
//! the event node and charges the importance budget.

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{self, CacheOutcome, EmbeddingCache, EmbeddingOracle};
use crate::memory::{Filling, MemoryNode, MemoryStore, NodeDraft};
use crate::metrics::PerceptCounters;
use crate::novelty::{self, CandidateEvent, EventClass};
use crate::persona::Scratch;
use crate::scoring::{self, PoignancyKind, PoignancyOracle};
use crate::types::{NodeId, Triple};

// ---------------------------------------------------------------------------
// Importance accumulator
// ---------------------------------------------------------------------------

/// Importance budget that triggers reflection once spent.
///
/// This module only charges the budget. The reflection collaborator checks
/// [`is_triggered`](Self::is_triggered) and calls [`reset`](Self::reset).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportanceAccumulator {
    /// Budget restored on reset.
    pub trigger_max: f32,
    /// Remaining budget; decreases by each recorded event's poignancy.
    pub trigger_curr: f32,
    /// Events recorded since the last reset.
    pub element_count: u32,
}

impl ImportanceAccumulator {
    /// A full budget of `trigger_max`.
    #[must_use]
    pub fn new(trigger_max: f32) -> Self {
        Self {
            trigger_max,
            trigger_curr: trigger_max,
            element_count: 0,
        }
    }

    /// Charge one recorded event.
    pub fn record(&mut self, poignancy: f32) {
        self.trigger_curr -= poignancy;
        self.element_count += 1;
    }

    /// Whether the budget is spent.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.trigger_curr <= 0.0
    }

    /// Restore the full budget and clear the element count.
    pub fn reset(&mut self) {
        self.trigger_curr = self.trigger_max;
        self.element_count = 0;
    }
}

impl Default for ImportanceAccumulator {
    fn default() -> Self {
        Self::new(150.0)
    }
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// Keywords of an event: its subject and object with colon qualifiers removed.
#[must_use]
pub fn extract_keywords(triple: &Triple) -> BTreeSet<String> {
    BTreeSet::from([
        novelty::last_segment(&triple.subject).to_string(),
        novelty::last_segment(&triple.object).to_string(),
    ])
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Borrowed view of one agent's state plus the oracles, for one tick.
pub struct Recorder<'a, S: MemoryStore + ?Sized> {
    /// Where nodes are appended.
    pub store: &'a mut S,
    /// The agent's embedding cache.
    pub embeddings: &'a mut EmbeddingCache,
    /// The agent's importance budget.
    pub importance: &'a mut ImportanceAccumulator,
    /// The agent's working state (time, name, current activity).
    pub scratch: &'a Scratch,
    /// Embedding oracle used on cache misses.
    pub embedder: &'a dyn EmbeddingOracle,
    /// Poignancy oracle.
    pub scorer: &'a dyn PoignancyOracle,
    /// Optional process-wide counters.
    pub counters: Option<&'a PerceptCounters>,
}

impl<S: MemoryStore + ?Sized> Recorder<'_, S> {
    /// Record a novel event and return the stored event node.
    pub fn record(&mut self, event: &CandidateEvent) -> MemoryNode {
        let triple = event.triple();
        let description = event.display_description();
        let keywords = extract_keywords(&triple);

        let key = embedding::embedding_key(&description).to_string();
        self.ensure_embedding(&key);
        let poignancy = self.score(PoignancyKind::Event, &key);

        let chat_ids = match novelty::classify(&triple, &self.scratch.name) {
            EventClass::SelfChat => vec![self.record_chat(&keywords)],
            EventClass::Ambient => Vec::new(),
        };

        let node = self.store.append_event(NodeDraft {
            created: self.scratch.curr_time,
            expires: None,
            triple,
            description,
            keywords,
            poignancy,
            embedding_key: key,
            filling: Filling::Chats(chat_ids),
        });
        self.importance.record(poignancy);

        if let Some(c) = self.counters {
            c.nodes_recorded.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            agent = %self.scratch.name,
            node = %node.id,
            poignancy,
            description = %node.description,
            "Recorded event"
        );
        node
    }

    fn record_chat(&mut self, keywords: &BTreeSet<String>) -> NodeId {
        let activity = self.scratch.act_description.clone();
        self.ensure_embedding(&activity);
        let poignancy = self.score(PoignancyKind::Chat, &activity);

        let chat = self.store.append_chat(NodeDraft {
            created: self.scratch.curr_time,
            expires: None,
            triple: self.scratch.act_event.clone(),
            description: activity.clone(),
            keywords: keywords.clone(),
            poignancy,
            embedding_key: activity,
            filling: Filling::Transcript(self.scratch.chat.clone()),
        });

        if let Some(c) = self.counters {
            c.chat_nodes_recorded.fetch_add(1, Ordering::Relaxed);
        }
        chat.id
    }

    fn ensure_embedding(&mut self, key: &str) {
        let outcome = self.embeddings.ensure(key, self.embedder);
        if let Some(c) = self.counters {
            let counter = match outcome {
                CacheOutcome::Hit => &c.embedding_cache_hits,
                CacheOutcome::Miss => &c.embedding_cache_misses,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn score(&self, kind: PoignancyKind, text: &str) -> f32 {
        let scored = scoring::poignancy(self.scorer, kind, text);
        if let Some(c) = self.counters {
            let counter = if scored.oracle_called {
                &c.poignancy_oracle_calls
            } else {
                &c.idle_shortcuts
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
        scored.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerceptionConfig;
    use crate::embedding::HashingEmbeddingProvider;
    use crate::memory::{AssociativeMemory, NodeKind};
    use crate::scoring::FixedPoignancy;
    use crate::types::{ChatLine, TileCoord};
    use crate::world::TileEvent;

    struct Fixture {
        store: AssociativeMemory,
        cache: EmbeddingCache,
        importance: ImportanceAccumulator,
        scratch: Scratch,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: AssociativeMemory::new(),
                cache: EmbeddingCache::new(),
                importance: ImportanceAccumulator::new(100.0),
                scratch: Scratch::new("Bob", TileCoord::new(0, 0), &PerceptionConfig::default()),
            }
        }

        fn record(&mut self, raw: &TileEvent, counters: &PerceptCounters) -> MemoryNode {
            let embedder = HashingEmbeddingProvider::new(16);
            let scorer = FixedPoignancy(6.0);
            let mut rec = Recorder {
                store: &mut self.store,
                embeddings: &mut self.cache,
                importance: &mut self.importance,
                scratch: &self.scratch,
                embedder: &embedder,
                scorer: &scorer,
                counters: Some(counters),
            };
            rec.record(&CandidateEvent::from_tile_event(raw))
        }
    }

    #[test]
    fn keywords_strip_qualifiers_and_collapse() {
        let kw = extract_keywords(&Triple::new("w:s:a:stove", "is", "w:s:a:stove"));
        assert_eq!(kw, BTreeSet::from(["stove".to_string()]));
        let kw = extract_keywords(&Triple::new("Bob", "eating", "breakfast"));
        assert_eq!(kw.len(), 2);
    }

    #[test]
    fn records_event_with_paren_key() {
        let mut fx = Fixture::new();
        let counters = PerceptCounters::new();
        let node = fx.record(
            &TileEvent::new("Ann", "sleeping", "bed", "sleeping (in bed)"),
            &counters,
        );

        assert_eq!(node.kind, NodeKind::Event);
        assert_eq!(node.description, "Ann is sleeping (in bed)");
        assert_eq!(node.embedding_key, "in bed");
        assert!(fx.cache.get("in bed").is_some());
        assert_eq!(node.poignancy, 6.0);
        assert!(node.linked_chats().is_empty());
        assert_eq!(fx.importance.trigger_curr, 94.0);
        assert_eq!(fx.importance.element_count, 1);

        let snap = counters.snapshot();
        assert_eq!(snap.nodes_recorded, 1);
        assert_eq!(snap.embedding_cache_misses, 1);
        assert_eq!(snap.poignancy_oracle_calls, 1);
    }

    #[test]
    fn idle_event_costs_one_without_oracle() {
        let mut fx = Fixture::new();
        let counters = PerceptCounters::new();
        let node = fx.record(&TileEvent::idle("w:s:a:bed"), &counters);

        assert_eq!(node.triple, Triple::new("w:s:a:bed", "is", "idle"));
        assert_eq!(node.description, "bed is idle");
        assert_eq!(node.poignancy, 1.0);
        assert_eq!(fx.importance.trigger_curr, 99.0);
        assert_eq!(counters.snapshot().poignancy_oracle_calls, 0);
        assert_eq!(counters.snapshot().idle_shortcuts, 1);
    }

    #[test]
    fn self_chat_creates_linked_chat_node() {
        let mut fx = Fixture::new();
        fx.scratch.act_description = "conversing about the party".into();
        fx.scratch.act_event = Triple::new("Bob", "chat with", "Ann");
        fx.scratch.chat = vec![ChatLine::new("Bob", "Coming tonight?"), ChatLine::new("Ann", "Sure!")];
        let counters = PerceptCounters::new();

        let node = fx.record(
            &TileEvent::new("Bob", "chat with", "Ann", "conversing about the party"),
            &counters,
        );

        assert_eq!(node.linked_chats().len(), 1);
        let chat = fx.store.node(node.linked_chats()[0]).expect("chat node stored");
        assert_eq!(chat.kind, NodeKind::Chat);
        assert!(chat.id < node.id, "chat node is created first");
        assert_eq!(chat.description, "conversing about the party");
        assert_eq!(chat.transcript().len(), 2);
        assert_eq!(chat.keywords, node.keywords);
        assert_eq!(chat.triple, Triple::new("Bob", "chat with", "Ann"));

        // Only the event charges the importance budget.
        assert_eq!(fx.importance.element_count, 1);
        assert_eq!(counters.snapshot().chat_nodes_recorded, 1);
        // Event key and chat key differ, so both were embedded.
        assert_eq!(counters.snapshot().embedding_cache_misses, 2);
    }

    #[test]
    fn someone_elses_chat_is_ambient() {
        let mut fx = Fixture::new();
        let counters = PerceptCounters::new();
        let node = fx.record(
            &TileEvent::new("Ann", "chat with", "Carl", "chatting"),
            &counters,
        );
        assert!(node.linked_chats().is_empty());
        assert_eq!(fx.store.chat_count(), 0);
    }

    #[test]
    fn accumulator_reset() {
        let mut acc = ImportanceAccumulator::new(10.0);
        acc.record(4.0);
        acc.record(6.0);
        assert!(acc.is_triggered());
        acc.reset();
        assert_eq!(acc, ImportanceAccumulator::new(10.0));
    }
}
