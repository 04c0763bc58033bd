//! The perception tick.
//!
//! One call scans the agent's surroundings, grows its spatial memory,
//! narrows the ranked events to its attention bandwidth, drops the ones it
//! already remembers and records the rest.

use std::sync::atomic::Ordering;

use tracing::{debug, debug_span};

use crate::attention;
use crate::embedding::EmbeddingOracle;
use crate::error::Result;
use crate::memory::MemoryNode;
use crate::metrics::{PerceptCounters, spans};
use crate::novelty::{self, CandidateEvent};
use crate::persona::Persona;
use crate::recorder::Recorder;
use crate::scan;
use crate::scoring::PoignancyOracle;
use crate::world::World;

/// Oracles and optional counters shared by every agent's tick.
#[derive(Clone, Copy)]
pub struct Perceiver<'a> {
    embedder: &'a dyn EmbeddingOracle,
    scorer: &'a dyn PoignancyOracle,
    counters: Option<&'a PerceptCounters>,
}

impl<'a> Perceiver<'a> {
    /// A perceiver using the given oracles.
    #[must_use]
    pub fn new(embedder: &'a dyn EmbeddingOracle, scorer: &'a dyn PoignancyOracle) -> Self {
        Self {
            embedder,
            scorer,
            counters: None,
        }
    }

    /// Count pipeline activity into `counters`.
    #[must_use]
    pub fn with_counters(mut self, counters: &'a PerceptCounters) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Run one perception tick for `persona` in `world`.
    ///
    /// Returns the newly created event nodes in attention order (nearest
    /// first). Chat nodes are reachable through each event's links.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Config` if the persona's vision radius,
    /// attention bandwidth or retention is negative. Nothing is mutated
    /// in that case.
    pub fn perceive<W: World + ?Sized>(
        &self,
        persona: &mut Persona,
        world: &W,
    ) -> Result<Vec<MemoryNode>> {
        let _span = debug_span!(spans::PERCEIVE, agent = %persona.scratch.name).entered();

        let limits = match persona.scratch.limits() {
            Ok(limits) => limits,
            Err(err) => {
                self.count(|c| &c.config_rejections, 1);
                return Err(err);
            }
        };
        let position = persona.scratch.curr_tile;

        let scanned = scan::scan(world, position, limits.vision_radius);
        self.count(|c| &c.tiles_scanned, scanned.nearby.len());
        self.count(|c| &c.events_ranked, scanned.ranked.len());

        persona
            .spatial
            .merge_all(scanned.nearby.iter().filter_map(|&coord| world.tile(coord)));

        let attended = attention::select(scanned.ranked, limits.attention_bandwidth);
        self.count(|c| &c.events_attended, attended.len());
        debug!(
            attended = attended.len(),
            bandwidth = limits.attention_bandwidth,
            "Selected events"
        );

        let Persona {
            scratch,
            memory,
            embeddings,
            importance,
            ..
        } = persona;
        let mut recorder = Recorder {
            store: memory,
            embeddings,
            importance,
            scratch,
            embedder: self.embedder,
            scorer: self.scorer,
            counters: self.counters,
        };

        let mut recorded = Vec::new();
        let mut stale = 0_usize;
        for ranked in &attended {
            let candidate = CandidateEvent::from_tile_event(&ranked.event);
            if !novelty::is_novel(&*recorder.store, &candidate.triple(), limits.retention) {
                stale += 1;
                continue;
            }
            recorded.push(recorder.record(&candidate));
        }

        self.count(|c| &c.events_stale, stale);
        self.count(|c| &c.ticks, 1);
        debug!(
            recorded = recorded.len(),
            stale,
            trigger_curr = recorder.importance.trigger_curr,
            "Perception tick complete"
        );

        Ok(recorded)
    }

    fn count(&self, field: impl Fn(&PerceptCounters) -> &std::sync::atomic::AtomicU64, n: usize) {
        if let Some(c) = self.counters {
            field(c).fetch_add(n as u64, Ordering::Relaxed);
        }
    }
}

/// Run one perception tick without counters.
///
/// # Errors
///
/// See [`Perceiver::perceive`].
pub fn perceive<W: World + ?Sized>(
    persona: &mut Persona,
    world: &W,
    embedder: &dyn EmbeddingOracle,
    scorer: &dyn PoignancyOracle,
) -> Result<Vec<MemoryNode>> {
    Perceiver::new(embedder, scorer).perceive(persona, world)
}
