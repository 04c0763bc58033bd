//! Runtime metrics for the perception pipeline.
//!
//! Lock-free `AtomicU64` counters incremented in the hot path, a tick timing
//! monitor for budget tracking, and the `tracing` span names used by the
//! pipeline.
//!
//! Histograms use `parking_lot::Mutex` since they are only read on export.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for perception events.
pub struct PerceptCounters {
    /// Perception ticks completed.
    pub ticks: AtomicU64,
    /// Ticks rejected for invalid configuration.
    pub config_rejections: AtomicU64,
    /// Tiles returned by nearby-tile queries.
    pub tiles_scanned: AtomicU64,
    /// Events that survived locality filtering and deduplication.
    pub events_ranked: AtomicU64,
    /// Events that fit in the attention bandwidth.
    pub events_attended: AtomicU64,
    /// Attended events dropped as already remembered.
    pub events_stale: AtomicU64,
    /// Event nodes written to memory.
    pub nodes_recorded: AtomicU64,
    /// Chat nodes written to memory.
    pub chat_nodes_recorded: AtomicU64,
    /// Embedding cache hits.
    pub embedding_cache_hits: AtomicU64,
    /// Embedding cache misses (oracle calls).
    pub embedding_cache_misses: AtomicU64,
    /// Poignancy oracle calls.
    pub poignancy_oracle_calls: AtomicU64,
    /// Idle descriptions scored without the oracle.
    pub idle_shortcuts: AtomicU64,
}

impl PerceptCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            config_rejections: AtomicU64::new(0),
            tiles_scanned: AtomicU64::new(0),
            events_ranked: AtomicU64::new(0),
            events_attended: AtomicU64::new(0),
            events_stale: AtomicU64::new(0),
            nodes_recorded: AtomicU64::new(0),
            chat_nodes_recorded: AtomicU64::new(0),
            embedding_cache_hits: AtomicU64::new(0),
            embedding_cache_misses: AtomicU64::new(0),
            poignancy_oracle_calls: AtomicU64::new(0),
            idle_shortcuts: AtomicU64::new(0),
        }
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            config_rejections: self.config_rejections.load(Ordering::Relaxed),
            tiles_scanned: self.tiles_scanned.load(Ordering::Relaxed),
            events_ranked: self.events_ranked.load(Ordering::Relaxed),
            events_attended: self.events_attended.load(Ordering::Relaxed),
            events_stale: self.events_stale.load(Ordering::Relaxed),
            nodes_recorded: self.nodes_recorded.load(Ordering::Relaxed),
            chat_nodes_recorded: self.chat_nodes_recorded.load(Ordering::Relaxed),
            embedding_cache_hits: self.embedding_cache_hits.load(Ordering::Relaxed),
            embedding_cache_misses: self.embedding_cache_misses.load(Ordering::Relaxed),
            poignancy_oracle_calls: self.poignancy_oracle_calls.load(Ordering::Relaxed),
            idle_shortcuts: self.idle_shortcuts.load(Ordering::Relaxed),
        }
    }
}

impl Default for PerceptCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Perception ticks completed.
    pub ticks: u64,
    /// Ticks rejected for invalid configuration.
    pub config_rejections: u64,
    /// Tiles scanned.
    pub tiles_scanned: u64,
    /// Events ranked.
    pub events_ranked: u64,
    /// Events attended.
    pub events_attended: u64,
    /// Events dropped as stale.
    pub events_stale: u64,
    /// Event nodes recorded.
    pub nodes_recorded: u64,
    /// Chat nodes recorded.
    pub chat_nodes_recorded: u64,
    /// Embedding cache hits.
    pub embedding_cache_hits: u64,
    /// Embedding cache misses.
    pub embedding_cache_misses: u64,
    /// Poignancy oracle calls.
    pub poignancy_oracle_calls: u64,
    /// Idle shortcuts.
    pub idle_shortcuts: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 12] = [
            ("percept_ticks_total", "Perception ticks completed", self.ticks),
            ("percept_config_rejections_total", "Ticks rejected for invalid configuration", self.config_rejections),
            ("percept_tiles_scanned_total", "Tiles returned by nearby-tile queries", self.tiles_scanned),
            ("percept_events_ranked_total", "Events ranked after locality filtering", self.events_ranked),
            ("percept_events_attended_total", "Events within attention bandwidth", self.events_attended),
            ("percept_events_stale_total", "Attended events already remembered", self.events_stale),
            ("percept_nodes_recorded_total", "Event nodes written to memory", self.nodes_recorded),
            ("percept_chat_nodes_recorded_total", "Chat nodes written to memory", self.chat_nodes_recorded),
            ("percept_embedding_cache_hits_total", "Embedding cache hits", self.embedding_cache_hits),
            ("percept_embedding_cache_misses_total", "Embedding cache misses", self.embedding_cache_misses),
            ("percept_poignancy_oracle_calls_total", "Poignancy oracle calls", self.poignancy_oracle_calls),
            ("percept_idle_shortcuts_total", "Idle descriptions scored without the oracle", self.idle_shortcuts),
        ];

        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tick Budget Monitor
// ---------------------------------------------------------------------------

/// Tracks how long perception ticks take against a budget.
///
/// Usage:
/// ```rust,no_run
/// # use percept_core::metrics::TickBudgetMonitor;
/// let monitor = TickBudgetMonitor::new(5.0); // 5ms budget
/// {
///     let _guard = monitor.begin_tick();
///     // ... perceive ...
/// }
/// assert_eq!(monitor.tick_count(), 1);
/// ```
pub struct TickBudgetMonitor {
    /// Maximum allowed milliseconds per tick.
    budget_ms: f64,
    /// Timing history (last N ticks).
    history: Mutex<TickHistory>,
}

struct TickHistory {
    /// Ring buffer of recent tick timings (milliseconds).
    timings: Vec<f64>,
    /// Next write index.
    write_idx: usize,
    /// Number of ticks recorded.
    count: u64,
    /// Whether the last tick exceeded the budget.
    last_over_budget: bool,
}

impl TickBudgetMonitor {
    /// Create a new monitor with the given budget (milliseconds).
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            history: Mutex::new(TickHistory {
                timings: vec![0.0; 256],
                write_idx: 0,
                count: 0,
                last_over_budget: false,
            }),
        }
    }

    /// Begin timing a tick. Returns a guard that records elapsed time on drop.
    pub fn begin_tick(&self) -> TickGuard<'_> {
        TickGuard {
            monitor: self,
            start: Instant::now(),
        }
    }

    /// Record a tick timing manually (milliseconds).
    pub fn record(&self, ms: f64) {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        let len = h.timings.len();
        h.timings[idx] = ms;
        h.write_idx = (idx + 1) % len;
        h.count += 1;
        h.last_over_budget = ms > self.budget_ms;
    }

    /// The last tick's timing (milliseconds).
    #[must_use]
    pub fn last_tick_ms(&self) -> f64 {
        let h = self.history.lock();
        if h.count == 0 {
            return 0.0;
        }
        let idx = if h.write_idx == 0 {
            h.timings.len() - 1
        } else {
            h.write_idx - 1
        };
        h.timings[idx]
    }

    /// Whether the last tick exceeded the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.history.lock().last_over_budget
    }

    /// P50, P95, P99 and max over the history buffer (milliseconds).
    #[must_use]
    pub fn percentiles(&self) -> TickPercentiles {
        let h = self.history.lock();
        let n = usize::try_from(h.count).unwrap_or(usize::MAX).min(h.timings.len());
        if n == 0 {
            return TickPercentiles::default();
        }

        let mut sorted = h.timings[..n].to_vec();
        sorted.sort_by(f64::total_cmp);

        let at = |q: f64| sorted[((n as f64 * q) as usize).min(n - 1)];
        let over_count = sorted.iter().filter(|&&t| t > self.budget_ms).count();

        TickPercentiles {
            p50: at(0.50),
            p95: at(0.95),
            p99: at(0.99),
            max: sorted[n - 1],
            over_budget_ratio: over_count as f64 / n as f64,
        }
    }

    /// Total number of ticks recorded.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.history.lock().count
    }

    /// The configured budget in milliseconds.
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }
}

/// RAII guard that records elapsed time when dropped.
pub struct TickGuard<'a> {
    monitor: &'a TickBudgetMonitor,
    start: Instant,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Percentile statistics for tick timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickPercentiles {
    /// 50th percentile (median) in milliseconds.
    pub p50: f64,
    /// 95th percentile in milliseconds.
    pub p95: f64,
    /// 99th percentile in milliseconds.
    pub p99: f64,
    /// Maximum observed timing.
    pub max: f64,
    /// Ratio of ticks that exceeded the budget (0.0–1.0).
    pub over_budget_ratio: f64,
}

impl TickPercentiles {
    /// Format as a human-readable summary.
    #[must_use]
    pub fn summary(&self, budget_ms: f64) -> String {
        format!(
            "P50={:.2}ms  P95={:.2}ms  P99={:.2}ms  Max={:.2}ms  Budget={budget_ms:.1}ms  \
             Over-budget={:.1}%",
            self.p50,
            self.p95,
            self.p99,
            self.max,
            self.over_budget_ratio * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracing Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// One agent's perception tick.
    pub const PERCEIVE: &str = "percept::perceive";
    /// One simulation step across all agents.
    pub const TOWN_TICK: &str = "percept::town::tick";
    /// Persistence save.
    pub const PERSIST_SAVE: &str = "percept::persist::save";
    /// Persistence load.
    pub const PERSIST_LOAD: &str = "percept::persist::load";
    /// LLM oracle call.
    pub const LLM_CALL: &str = "percept::llm::call";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
