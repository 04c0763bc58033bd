//! The world collaborator boundary.
//!
//! The perception core never owns the world. It reads tiles through the
//! [`World`] trait, which a concrete simulation (see `percept-town`)
//! implements over its own map representation.

use serde::{Deserialize, Serialize};

use crate::types::{ArenaPath, TileCoord};

/// A raw event sitting on a tile, exactly as the world reports it.
///
/// Values are compared by identity: an object that spans several tiles
/// reports the same `TileEvent` on each of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileEvent {
    /// Event subject, possibly colon-qualified (`"the Ville:cafe:counter:stove"`).
    pub subject: String,
    /// `None` means the subject is present but doing nothing.
    pub predicate: Option<String>,
    /// Event object.
    pub object: Option<String>,
    /// Free-text description, e.g. `"having breakfast"`.
    pub description: Option<String>,
}

impl TileEvent {
    /// A fully specified event.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: Some(predicate.into()),
            object: Some(object.into()),
            description: Some(description.into()),
        }
    }

    /// An event carrying only its subject.
    #[must_use]
    pub fn idle(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate: None,
            object: None,
            description: None,
        }
    }

    /// Whether the event has no predicate.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.predicate.as_deref().is_none_or(str::is_empty)
    }
}

/// Read-only description of one tile.
///
/// An empty string at any level means "not resolved at this level".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileObservation {
    /// World name.
    #[serde(default)]
    pub world: String,
    /// Sector name.
    #[serde(default)]
    pub sector: String,
    /// Arena name.
    #[serde(default)]
    pub arena: String,
    /// Game object occupying the tile.
    #[serde(default)]
    pub game_object: String,
    /// Events currently happening on the tile.
    #[serde(default)]
    pub events: Vec<TileEvent>,
}

impl TileObservation {
    /// The tile's arena path. Unresolved levels appear as empty segments.
    #[must_use]
    pub fn arena_path(&self) -> ArenaPath {
        ArenaPath::new(&self.world, &self.sector, &self.arena)
    }
}

/// Queries the perception pipeline makes against the world.
pub trait World {
    /// Tiles within `radius` of `position`, in the world's discovery order.
    ///
    /// Whether the window is square or round is the world's choice.
    fn nearby_tiles(&self, position: TileCoord, radius: u32) -> Vec<TileCoord>;

    /// Contents of a tile, or `None` if the coordinate is outside the world.
    fn tile(&self, coord: TileCoord) -> Option<&TileObservation>;

    /// Arena path of a tile, or `None` if the coordinate is outside the world.
    fn arena_path(&self, coord: TileCoord) -> Option<ArenaPath> {
        self.tile(coord).map(TileObservation::arena_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_detection() {
        assert!(TileEvent::idle("bed").is_idle());
        let mut empty = TileEvent::new("Bob", "", "x", "y");
        assert!(empty.is_idle());
        empty.predicate = Some("sleeping".into());
        assert!(!empty.is_idle());
    }

    #[test]
    fn arena_path_of_partial_tile() {
        let tile = TileObservation {
            world: "the Ville".into(),
            sector: "Hobbs Cafe".into(),
            ..TileObservation::default()
        };
        assert_eq!(tile.arena_path().to_string(), "the Ville:Hobbs Cafe:");
    }
}
