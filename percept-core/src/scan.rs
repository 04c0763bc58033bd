//! Tile scanning and distance ranking.
//!
//! Collects the events happening around the agent, restricted to the arena
//! the agent is standing in, and orders them nearest-first.

use std::collections::HashSet;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::types::TileCoord;
use crate::world::{TileEvent, World};

/// A raw event annotated with where it was seen and how far away.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEvent {
    /// The event as the world reported it.
    pub event: TileEvent,
    /// Tile the event was first discovered on.
    pub tile: TileCoord,
    /// Euclidean distance from the agent to `tile`.
    pub distance: f64,
}

/// Output of one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Every tile within the vision radius, in world discovery order.
    pub nearby: Vec<TileCoord>,
    /// Locality-filtered, deduplicated events, nearest first.
    pub ranked: Vec<RankedEvent>,
}

/// Scan the tiles around `position` and rank the events in the agent's arena.
///
/// Events on tiles whose arena differs from the agent's own are ignored
/// regardless of distance. An event reported by several tiles is kept once,
/// at the tile where it was discovered first. Ties in distance keep
/// discovery order.
pub fn scan<W: World + ?Sized>(world: &W, position: TileCoord, vision_radius: u32) -> ScanResult {
    let nearby = world.nearby_tiles(position, vision_radius);

    let Some(current_arena) = world.arena_path(position) else {
        debug!(%position, "Agent tile is outside the world; no events perceived");
        return ScanResult {
            nearby,
            ranked: Vec::new(),
        };
    };

    let mut seen: HashSet<&TileEvent> = HashSet::new();
    let mut ranked = Vec::new();

    for &coord in &nearby {
        let Some(tile) = world.tile(coord) else {
            continue;
        };
        if tile.events.is_empty() {
            continue;
        }
        if world.arena_path(coord).as_ref() != Some(&current_arena) {
            continue;
        }

        let distance = position.distance(&coord);
        for event in &tile.events {
            if seen.insert(event) {
                ranked.push(RankedEvent {
                    event: event.clone(),
                    tile: coord,
                    distance,
                });
            }
        }
    }

    // `sort_by_key` is stable, so equal distances keep discovery order.
    ranked.sort_by_key(|r| OrderedFloat(r.distance));

    debug!(
        %position,
        arena = %current_arena,
        nearby = nearby.len(),
        ranked = ranked.len(),
        "Scanned nearby tiles"
    );

    ScanResult { nearby, ranked }
}
