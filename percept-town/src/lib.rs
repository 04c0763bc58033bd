//! # percept-town — a tile-world host for the perception pipeline
//!
//! `percept-core` never owns a world. This crate supplies one: a grid
//! [`Maze`] painted from a layout file, a [`Town`] of personas living in
//! it, and a [`Simulation`] that ticks the town with real oracles.
//!
//! ```text
//! MazeLayout (TOML/JSON) ──► Maze ──┐
//!                                   ├──► Town::tick ──► publish activities
//! PerceptConfig ──► spawn personas ─┘                └─► perceive (each persona)
//!                                                           │
//!                     Simulation ── LlmOracle, counters ────┘
//! ```
//!
//! ## Modules
//!
//! - `maze` — the grid, its layout format and event editing
//! - `systems` — `Town`, `TickReport` and the `Simulation` driver
//! - `error` — `TownError`

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod maze;
pub mod systems;

pub use error::TownError;
pub use maze::{AreaSpec, Maze, MazeLayout};
pub use systems::{Simulation, TickReport, Town};

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` (e.g.
/// `"percept=info"`) is used. With `json` set, events are written as
/// one JSON object per line.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(default_filter: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
