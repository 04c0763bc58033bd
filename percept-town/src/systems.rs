//! The town and its tick driver.
//!
//! Every tick runs in two phases:
//!
//! 1. **Publish**: each persona's current activity is written onto its
//!    tile, replacing whatever it published last tick.
//! 2. **Perceive**: every persona runs the perception pipeline against
//!    the maze. Personas are independent; a persona whose limits are
//!    invalid is reported in the [`TickReport`] and the rest carry on.
//!
//! ## Tick Budget
//!
//! [`Simulation`] times each tick with a
//! [`TickBudgetMonitor`](percept_core::metrics::TickBudgetMonitor) and warns
//! when a tick runs over.

use std::time::Instant;

use chrono::{NaiveDateTime, TimeDelta};
use percept_core::config::PerceptConfig;
use percept_core::metrics::{PerceptCounters, TickBudgetMonitor, spans};
use percept_core::persistence::PersistenceEngine;
use percept_core::{
    AgentId, EmbeddingOracle, Perceiver, Persona, PoignancyOracle, Scratch, SimTimestamp,
    TileCoord, TileEvent, Triple,
};
use percept_llm::LlmOracle;
use tracing::{debug, info, info_span, warn};

use crate::error::{Result, TownError};
use crate::maze::Maze;

/// Outcome of one town tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Step the tick ran at.
    pub step: u64,
    /// New event nodes recorded per persona, in persona order.
    pub recorded: Vec<(AgentId, usize)>,
    /// Personas that could not publish or perceive this tick.
    pub failures: Vec<(AgentId, TownError)>,
    /// Personas whose importance budget is spent and should reflect.
    pub reflection_due: Vec<AgentId>,
    /// Wall-clock duration of the tick.
    pub elapsed_ms: f64,
}

impl TickReport {
    /// Total nodes recorded across all personas.
    #[must_use]
    pub fn total_recorded(&self) -> usize {
        self.recorded.iter().map(|(_, n)| n).sum()
    }

    /// Nodes recorded by `id`, or `None` if it failed or is unknown.
    #[must_use]
    pub fn recorded_by(&self, id: AgentId) -> Option<usize> {
        self.recorded.iter().find(|(a, _)| *a == id).map(|(_, n)| *n)
    }
}

/// A maze and the personas living in it.
#[derive(Debug, Clone)]
pub struct Town {
    /// The map.
    pub maze: Maze,
    /// Residents, ticked in this order.
    pub personas: Vec<Persona>,
    time: SimTimestamp,
    seconds_per_step: i64,
}

impl Town {
    /// An empty town whose clock starts at `start` and advances by
    /// `seconds_per_step` each tick.
    #[must_use]
    pub fn new(maze: Maze, start: NaiveDateTime, seconds_per_step: i64) -> Self {
        Self {
            maze,
            personas: Vec::new(),
            time: SimTimestamp::new(0, start),
            seconds_per_step,
        }
    }

    /// The current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTimestamp {
        self.time
    }

    /// Create a persona named `name` on `tile` with limits from `config`.
    ///
    /// # Errors
    ///
    /// Returns `TownError::OutOfBounds` if `tile` is off the map, or
    /// `TownError::Layout` if the name is already taken.
    pub fn spawn(&mut self, name: &str, tile: TileCoord, config: &PerceptConfig) -> Result<AgentId> {
        let scratch = Scratch::new(name, tile, &config.perception);
        self.add_persona(Persona::new(scratch, &config.importance))
    }

    /// Move an existing persona into the town.
    ///
    /// # Errors
    ///
    /// Same as [`Town::spawn`].
    pub fn add_persona(&mut self, persona: Persona) -> Result<AgentId> {
        if !self.maze.contains(persona.scratch.curr_tile) {
            return Err(TownError::OutOfBounds(persona.scratch.curr_tile));
        }
        if self.persona(persona.name()).is_some() {
            return Err(TownError::Layout(format!(
                "a persona named '{}' already lives here",
                persona.name()
            )));
        }
        let id = persona.id;
        debug!(agent = %persona.name(), tile = %persona.scratch.curr_tile, "Persona joined town");
        self.personas.push(persona);
        Ok(id)
    }

    /// Look up a persona by name.
    #[must_use]
    pub fn persona(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name() == name)
    }

    /// Look up a persona by name, mutably.
    pub fn persona_mut(&mut self, name: &str) -> Option<&mut Persona> {
        self.personas.iter_mut().find(|p| p.name() == name)
    }

    /// Walk a persona to `tile`.
    ///
    /// # Errors
    ///
    /// Returns `TownError::UnknownPersona` or `TownError::OutOfBounds`.
    pub fn move_persona(&mut self, name: &str, tile: TileCoord) -> Result<()> {
        if !self.maze.contains(tile) {
            return Err(TownError::OutOfBounds(tile));
        }
        let persona = self
            .persona_mut(name)
            .ok_or_else(|| TownError::UnknownPersona(name.to_string()))?;
        persona.scratch.curr_tile = tile;
        Ok(())
    }

    /// Set what a persona is doing. An empty predicate means idle.
    ///
    /// # Errors
    ///
    /// Returns `TownError::UnknownPersona`.
    pub fn set_activity(
        &mut self,
        name: &str,
        predicate: &str,
        object: &str,
        description: &str,
    ) -> Result<()> {
        let persona = self
            .persona_mut(name)
            .ok_or_else(|| TownError::UnknownPersona(name.to_string()))?;
        persona.scratch.act_event = Triple::new(name, predicate, object);
        persona.scratch.act_description = description.to_string();
        Ok(())
    }

    /// Run one tick: publish every activity, then let every persona perceive.
    pub fn tick(&mut self, perceiver: &Perceiver<'_>) -> TickReport {
        let _span = info_span!(spans::TOWN_TICK, step = self.time.step).entered();
        let start = Instant::now();
        let mut report = TickReport {
            step: self.time.step,
            ..TickReport::default()
        };

        let mut unpublished = Vec::new();
        for persona in &mut self.personas {
            persona.scratch.curr_time = self.time;
            self.maze.remove_subject_events(&persona.scratch.name);
            let event = activity_event(&persona.scratch);
            if let Err(err) = self.maze.add_event(persona.scratch.curr_tile, event) {
                warn!(agent = %persona.scratch.name, error = %err, "Could not publish activity");
                unpublished.push(persona.id);
                report.failures.push((persona.id, err));
            }
        }

        for persona in &mut self.personas {
            if unpublished.contains(&persona.id) {
                continue;
            }
            match perceiver.perceive(persona, &self.maze) {
                Ok(nodes) => {
                    report.recorded.push((persona.id, nodes.len()));
                    if persona.importance.is_triggered() {
                        report.reflection_due.push(persona.id);
                    }
                }
                Err(err) => {
                    warn!(agent = %persona.scratch.name, error = %err, "Perception failed");
                    report.failures.push((persona.id, err.into()));
                }
            }
        }

        self.advance_clock();
        report.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            step = report.step,
            recorded = report.total_recorded(),
            failures = report.failures.len(),
            elapsed_ms = report.elapsed_ms,
            "Town tick complete"
        );
        report
    }

    /// Save every persona. Returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns the first persistence failure.
    pub fn save(&self, engine: &PersistenceEngine) -> Result<usize> {
        for persona in &self.personas {
            engine.save_persona(persona)?;
        }
        Ok(self.personas.len())
    }

    /// Replace every persona that has a saved copy with that copy.
    /// Returns how many were restored.
    ///
    /// # Errors
    ///
    /// Returns the first persistence failure.
    pub fn restore(&mut self, engine: &PersistenceEngine) -> Result<usize> {
        let mut restored = 0;
        for persona in &mut self.personas {
            if let Some(saved) = engine.load_persona(&persona.id)? {
                *persona = saved;
                restored += 1;
            }
        }
        Ok(restored)
    }

    fn advance_clock(&mut self) {
        let clock = TimeDelta::try_seconds(self.seconds_per_step)
            .and_then(|d| self.time.clock.checked_add_signed(d))
            .unwrap_or(self.time.clock);
        self.time = SimTimestamp::new(self.time.step + 1, clock);
    }
}

/// The event a persona shows on its own tile.
fn activity_event(scratch: &Scratch) -> TileEvent {
    let act = &scratch.act_event;
    if act.predicate.is_empty() {
        return TileEvent::idle(&scratch.name);
    }
    TileEvent {
        subject: scratch.name.clone(),
        predicate: Some(act.predicate.clone()),
        object: Some(act.object.clone()),
        description: (!scratch.act_description.is_empty()).then(|| scratch.act_description.clone()),
    }
}

/// A town bundled with its oracles, counters and tick timer.
pub struct Simulation<O> {
    /// The simulated town.
    pub town: Town,
    oracle: O,
    counters: PerceptCounters,
    monitor: TickBudgetMonitor,
}

impl<O: EmbeddingOracle + PoignancyOracle> Simulation<O> {
    /// Drive `town` with `oracle`, warning when a tick exceeds `budget_ms`.
    #[must_use]
    pub fn new(town: Town, oracle: O, budget_ms: f64) -> Self {
        Self {
            town,
            oracle,
            counters: PerceptCounters::new(),
            monitor: TickBudgetMonitor::new(budget_ms),
        }
    }

    /// Run one tick.
    pub fn step(&mut self) -> TickReport {
        let perceiver = Perceiver::new(&self.oracle, &self.oracle).with_counters(&self.counters);
        let report = {
            let _guard = self.monitor.begin_tick();
            self.town.tick(&perceiver)
        };
        if self.monitor.is_over_budget() {
            warn!(
                step = report.step,
                tick_ms = self.monitor.last_tick_ms(),
                budget_ms = self.monitor.budget_ms(),
                "Tick over budget"
            );
        }
        report
    }

    /// Run `steps` ticks.
    pub fn run(&mut self, steps: u64) -> Vec<TickReport> {
        (0..steps).map(|_| self.step()).collect()
    }

    /// Pipeline counters accumulated so far.
    #[must_use]
    pub fn counters(&self) -> &PerceptCounters {
        &self.counters
    }

    /// Tick timings.
    #[must_use]
    pub fn monitor(&self) -> &TickBudgetMonitor {
        &self.monitor
    }

    /// The oracle in use.
    #[must_use]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

impl Simulation<LlmOracle> {
    /// Drive `town` with an LLM oracle built from `config.llm`.
    ///
    /// # Errors
    ///
    /// Returns `TownError::Llm` if the oracle cannot be built.
    pub fn from_config(town: Town, config: &PerceptConfig, budget_ms: f64) -> Result<Self> {
        let oracle = LlmOracle::from_config(&config.llm)?;
        info!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            personas = town.personas.len(),
            "Simulation ready"
        );
        Ok(Self::new(town, oracle, budget_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::MazeLayout;
    use percept_core::Embedding;
    use percept_core::PoignancyKind;
    use percept_core::config::PersistenceConfig;

    struct FixedOracle;

    impl EmbeddingOracle for FixedOracle {
        fn embed(&self, text: &str) -> Embedding {
            #[allow(clippy::cast_precision_loss)]
            Embedding(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    impl PoignancyOracle for FixedOracle {
        fn score(&self, _kind: PoignancyKind, _text: &str) -> f32 {
            5.0
        }
    }

    const LAYOUT: &str = r#"
        world = "the Ville"
        width = 8
        height = 4

        [[areas]]
        sector = "Lin family's house"
        arena = "kitchen"
        x = 0
        y = 0
        width = 4
        height = 4

        [[areas]]
        sector = "Lin family's house"
        arena = "garden"
        x = 4
        y = 0
        width = 4
        height = 4
    "#;

    fn start() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2023, 2, 13)
            .and_then(|d| d.and_hms_opt(7, 0, 0))
            .expect("valid date")
    }

    fn town() -> Town {
        let maze = Maze::from_layout(&MazeLayout::from_toml(LAYOUT).expect("layout")).expect("maze");
        let mut town = Town::new(maze, start(), 10);
        let config = PerceptConfig::default();
        town.spawn("Ann Lin", TileCoord::new(1, 1), &config).expect("spawn Ann");
        town.spawn("Bob Lin", TileCoord::new(2, 1), &config).expect("spawn Bob");
        town.set_activity("Ann Lin", "cooking", "eggs", "cooking eggs").expect("activity");
        town
    }

    #[test]
    fn activities_are_published_and_perceived() {
        let mut town = town();
        let oracle = FixedOracle;
        let perceiver = Perceiver::new(&oracle, &oracle);

        let report = town.tick(&perceiver);
        assert!(report.failures.is_empty());
        assert_eq!(report.step, 0);
        // Each sees Ann cooking and Bob idle.
        assert_eq!(report.total_recorded(), 4);

        let bob = town.persona("Bob Lin").expect("Bob");
        let descriptions: Vec<&str> = bob.memory.nodes().map(|n| n.description.as_str()).collect();
        assert!(descriptions.contains(&"Ann Lin is cooking eggs"));
        assert!(descriptions.contains(&"Bob Lin is idle"));

        // Nothing changed, so nothing is novel.
        let second = town.tick(&perceiver);
        assert_eq!(second.step, 1);
        assert_eq!(second.total_recorded(), 0);
        assert_eq!(town.time().step, 2);
        assert_eq!(town.time().clock, start() + TimeDelta::seconds(20));
    }

    #[test]
    fn republishing_replaces_the_old_activity() {
        let mut town = town();
        let oracle = FixedOracle;
        let perceiver = Perceiver::new(&oracle, &oracle);
        town.tick(&perceiver);

        town.set_activity("Ann Lin", "eating", "eggs", "eating breakfast").expect("activity");
        town.tick(&perceiver);

        let tile = percept_core::World::tile(&town.maze, TileCoord::new(1, 1)).expect("tile");
        assert_eq!(tile.events.len(), 1);
        assert_eq!(tile.events[0].predicate.as_deref(), Some("eating"));
    }

    #[test]
    fn one_bad_persona_does_not_stop_the_others() {
        let mut town = town();
        let bob_id = town.persona("Bob Lin").expect("Bob").id;
        let ann_id = town.persona("Ann Lin").expect("Ann").id;
        town.persona_mut("Bob Lin").expect("Bob").scratch.vision_r = -1;

        let oracle = FixedOracle;
        let counters = PerceptCounters::new();
        let perceiver = Perceiver::new(&oracle, &oracle).with_counters(&counters);
        let report = town.tick(&perceiver);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, bob_id);
        assert!(matches!(report.failures[0].1, TownError::Core(_)));
        assert_eq!(report.recorded_by(ann_id), Some(2));
        assert_eq!(report.recorded_by(bob_id), None);
        assert_eq!(counters.snapshot().config_rejections, 1);
        assert!(town.persona("Bob Lin").expect("Bob").memory.is_empty());
    }

    #[test]
    fn other_arena_is_not_perceived() {
        let mut town = town();
        town.move_persona("Bob Lin", TileCoord::new(4, 1)).expect("move");
        let oracle = FixedOracle;
        let report = town.tick(&Perceiver::new(&oracle, &oracle));

        // Bob stands in the garden and only sees himself.
        let bob = town.persona("Bob Lin").expect("Bob");
        assert_eq!(report.recorded_by(bob.id), Some(1));
        assert!(bob.spatial.contains_arena(&percept_core::ArenaPath::new(
            "the Ville",
            "Lin family's house",
            "kitchen"
        )));
    }

    #[test]
    fn town_rejects_bad_moves_and_duplicates() {
        let mut town = town();
        assert!(matches!(
            town.move_persona("Ann Lin", TileCoord::new(8, 0)),
            Err(TownError::OutOfBounds(_))
        ));
        assert!(matches!(
            town.move_persona("Carl", TileCoord::new(0, 0)),
            Err(TownError::UnknownPersona(_))
        ));
        assert!(matches!(
            town.spawn("Ann Lin", TileCoord::new(0, 0), &PerceptConfig::default()),
            Err(TownError::Layout(_))
        ));
        assert!(matches!(
            town.spawn("Dee", TileCoord::new(0, 9), &PerceptConfig::default()),
            Err(TownError::OutOfBounds(_))
        ));
    }

    #[test]
    fn save_and_restore_round_trip() {
        let mut town = town();
        let oracle = FixedOracle;
        town.tick(&Perceiver::new(&oracle, &oracle));

        let engine = PersistenceEngine::open_in_memory(&PersistenceConfig::default()).expect("db");
        assert_eq!(town.save(&engine).expect("save"), 2);

        let remembered = town.persona("Ann Lin").expect("Ann").memory.len();
        for persona in &mut town.personas {
            persona.memory = percept_core::AssociativeMemory::new();
        }
        assert_eq!(town.restore(&engine).expect("restore"), 2);
        assert_eq!(town.persona("Ann Lin").expect("Ann").memory.len(), remembered);
    }

    #[test]
    fn simulation_counts_and_times_ticks() {
        let mut sim = Simulation::new(town(), FixedOracle, 1_000.0);
        let reports = sim.run(3);
        assert_eq!(reports.len(), 3);
        assert_eq!(sim.monitor().tick_count(), 3);

        let snap = sim.counters().snapshot();
        assert_eq!(snap.ticks, 6);
        assert_eq!(snap.nodes_recorded, 4);
        assert_eq!(snap.idle_shortcuts, 2);
    }

    #[test]
    fn offline_llm_simulation_uses_fallbacks() {
        let mut config = PerceptConfig::default();
        config.llm.provider = "none".into();
        config.llm.embedding_dimensions = 4;

        let mut sim = Simulation::from_config(town(), &config, 1_000.0).expect("sim");
        let report = sim.step();
        assert!(report.failures.is_empty());

        let ann = sim.town.persona("Ann Lin").expect("Ann");
        let cooking = ann
            .memory
            .nodes()
            .find(|n| n.description == "Ann Lin is cooking eggs")
            .expect("cooking node");
        assert_eq!(cooking.poignancy, sim.oracle().fallback_poignancy());
    }
}
