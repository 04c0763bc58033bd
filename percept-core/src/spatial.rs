//! Spatial knowledge — what places the agent knows about.
//!
//! A four-level tree, world → sector → arena → objects, grown as tiles come
//! into view. Levels are created lazily on first observation and nothing is
//! ever removed. Objects keep the order in which they were first seen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ArenaPath;
use crate::world::TileObservation;

type Arenas = BTreeMap<String, Vec<String>>;
type Sectors = BTreeMap<String, Arenas>;

/// The agent's hierarchical spatial knowledge.
///
/// Serializes to the nested-object layout
/// `{"world": {"sector": {"arena": ["object", ...]}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialMemory {
    tree: BTreeMap<String, Sectors>,
}

impl SpatialMemory {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observed tile into the tree.
    ///
    /// The chain is resolved top-down: a level is only recorded if every
    /// level above it is resolved on the same tile. Unresolved levels stop
    /// the walk without error.
    pub fn merge(&mut self, tile: &TileObservation) {
        if tile.world.is_empty() {
            return;
        }
        let sectors = self.tree.entry(tile.world.clone()).or_default();

        if tile.sector.is_empty() {
            return;
        }
        let arenas = sectors.entry(tile.sector.clone()).or_default();

        if tile.arena.is_empty() {
            return;
        }
        let objects = arenas.entry(tile.arena.clone()).or_default();

        if !tile.game_object.is_empty() && !objects.contains(&tile.game_object) {
            objects.push(tile.game_object.clone());
        }
    }

    /// Fold a sequence of tiles into the tree.
    pub fn merge_all<'a>(&mut self, tiles: impl IntoIterator<Item = &'a TileObservation>) {
        for tile in tiles {
            self.merge(tile);
        }
    }

    /// Whether the arena at `path` is known.
    #[must_use]
    pub fn contains_arena(&self, path: &ArenaPath) -> bool {
        self.arenas(&path.world, &path.sector)
            .is_some_and(|arenas| arenas.contains_key(&path.arena))
    }

    /// Known sectors of `world`, comma-separated. Empty if the world is unknown.
    #[must_use]
    pub fn accessible_sectors(&self, world: &str) -> String {
        self.tree
            .get(world)
            .map(|sectors| join_keys(sectors.keys()))
            .unwrap_or_default()
    }

    /// Known arenas of `world:sector`, comma-separated.
    #[must_use]
    pub fn accessible_arenas(&self, world: &str, sector: &str) -> String {
        self.arenas(world, sector)
            .map(|arenas| join_keys(arenas.keys()))
            .unwrap_or_default()
    }

    /// Known objects of `world:sector:arena`, comma-separated, in first-seen order.
    #[must_use]
    pub fn accessible_objects(&self, world: &str, sector: &str, arena: &str) -> String {
        self.arenas(world, sector)
            .and_then(|arenas| arenas.get(arena))
            .map(|objects| objects.join(", "))
            .unwrap_or_default()
    }

    /// Number of known worlds.
    #[must_use]
    pub fn world_count(&self) -> usize {
        self.tree.len()
    }

    /// Total number of known objects across every arena.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.tree
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Parse a saved tree from its JSON layout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PerceptError::Serialization`] if the JSON does not
    /// have the nested world/sector/arena/objects shape.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the tree as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PerceptError::Serialization`] on encoding failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn arenas(&self, world: &str, sector: &str) -> Option<&Arenas> {
        self.tree.get(world).and_then(|sectors| sectors.get(sector))
    }
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    keys.map(String::as_str).collect::<Vec<_>>().join(", ")
}
