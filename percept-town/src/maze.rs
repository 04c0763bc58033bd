//! The town map: a rectangular grid of tiles.
//!
//! Built from a [`MazeLayout`] that paints named areas as rectangles, in
//! order, so later areas overwrite earlier ones:
//!
//! ```toml
//! world = "the Ville"
//! width = 20
//! height = 10
//!
//! [[areas]]
//! sector = "Lin family's house"
//! arena = "kitchen"
//! x = 0
//! y = 0
//! width = 6
//! height = 5
//!
//! [[areas]]
//! sector = "Lin family's house"
//! arena = "kitchen"
//! game_object = "stove"
//! x = 2
//! y = 1
//! width = 1
//! height = 1
//! ```

use percept_core::{TileCoord, TileEvent, TileObservation, World};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TownError};

/// Serialized description of a town map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeLayout {
    /// World name shared by every tile.
    pub world: String,
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Areas painted onto the grid, in order.
    #[serde(default)]
    pub areas: Vec<AreaSpec>,
}

/// One painted rectangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSpec {
    /// Sector name.
    pub sector: String,
    /// Arena name; empty for sector-only ground such as streets.
    #[serde(default)]
    pub arena: String,
    /// Object occupying every tile of the rectangle.
    #[serde(default)]
    pub game_object: String,
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in tiles.
    #[serde(default = "one")]
    pub width: u32,
    /// Height in tiles.
    #[serde(default = "one")]
    pub height: u32,
}

fn one() -> u32 {
    1
}

impl MazeLayout {
    /// Parse a layout from TOML.
    ///
    /// # Errors
    ///
    /// Returns `TownError::Layout` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| TownError::Layout(e.to_string()))
    }

    /// Parse a layout from JSON.
    ///
    /// # Errors
    ///
    /// Returns `TownError::Layout` if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TownError::Layout(e.to_string()))
    }
}

/// The grid of tiles agents perceive.
#[derive(Debug, Clone, PartialEq)]
pub struct Maze {
    width: u32,
    height: u32,
    /// Row-major: `tiles[y * width + x]`.
    tiles: Vec<TileObservation>,
}

impl Maze {
    /// Paint `layout` onto a fresh grid.
    ///
    /// # Errors
    ///
    /// Returns `TownError::Layout` if the grid is empty or an area does not
    /// fit inside it.
    pub fn from_layout(layout: &MazeLayout) -> Result<Self> {
        if layout.width == 0 || layout.height == 0 {
            return Err(TownError::Layout(format!(
                "grid must be non-empty, got {}x{}",
                layout.width, layout.height
            )));
        }

        let blank = TileObservation {
            world: layout.world.clone(),
            ..TileObservation::default()
        };
        let cells = layout.width as usize * layout.height as usize;
        let mut maze = Self {
            width: layout.width,
            height: layout.height,
            tiles: vec![blank; cells],
        };

        for area in &layout.areas {
            let fits_x = area.x.checked_add(area.width).is_some_and(|end| end <= layout.width);
            let fits_y = area.y.checked_add(area.height).is_some_and(|end| end <= layout.height);
            if !fits_x || !fits_y {
                return Err(TownError::Layout(format!(
                    "area {}:{} at ({}, {}) size {}x{} does not fit a {}x{} grid",
                    area.sector,
                    area.arena,
                    area.x,
                    area.y,
                    area.width,
                    area.height,
                    layout.width,
                    layout.height
                )));
            }
            for y in area.y..area.y + area.height {
                for x in area.x..area.x + area.width {
                    let idx = maze.index(TileCoord::new(x, y));
                    let tile = &mut maze.tiles[idx];
                    tile.sector.clone_from(&area.sector);
                    tile.arena.clone_from(&area.arena);
                    tile.game_object.clone_from(&area.game_object);
                }
            }
        }

        debug!(
            world = %layout.world,
            width = layout.width,
            height = layout.height,
            areas = layout.areas.len(),
            "Built maze"
        );
        Ok(maze)
    }

    /// Grid width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `coord` lies on the grid.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    // ------------------------------------------------------------------
    // Event editing
    // ------------------------------------------------------------------

    /// Add `event` to a tile. Adding an event the tile already has is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TownError::OutOfBounds` if `coord` is off the grid.
    pub fn add_event(&mut self, coord: TileCoord, event: TileEvent) -> Result<()> {
        let tile = self.tile_mut(coord)?;
        if !tile.events.contains(&event) {
            tile.events.push(event);
        }
        Ok(())
    }

    /// Remove `event` from a tile. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `TownError::OutOfBounds` if `coord` is off the grid.
    pub fn remove_event(&mut self, coord: TileCoord, event: &TileEvent) -> Result<bool> {
        let tile = self.tile_mut(coord)?;
        let before = tile.events.len();
        tile.events.retain(|e| e != event);
        Ok(tile.events.len() != before)
    }

    /// Replace `event` on a tile with an idle event of the same subject.
    /// Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `TownError::OutOfBounds` if `coord` is off the grid.
    pub fn turn_event_idle(&mut self, coord: TileCoord, event: &TileEvent) -> Result<bool> {
        let tile = self.tile_mut(coord)?;
        let Some(pos) = tile.events.iter().position(|e| e == event) else {
            return Ok(false);
        };
        let idle = TileEvent::idle(event.subject.clone());
        if tile.events.contains(&idle) {
            tile.events.remove(pos);
        } else {
            tile.events[pos] = idle;
        }
        Ok(true)
    }

    /// Remove every event whose subject is `subject`, anywhere on the grid.
    /// Returns how many were removed.
    pub fn remove_subject_events(&mut self, subject: &str) -> usize {
        let mut removed = 0;
        for tile in &mut self.tiles {
            let before = tile.events.len();
            tile.events.retain(|e| e.subject != subject);
            removed += before - tile.events.len();
        }
        removed
    }

    /// Every tile showing `game_object`, row-major.
    #[must_use]
    pub fn tiles_with_object(&self, game_object: &str) -> Vec<TileCoord> {
        self.coords()
            .filter(|&c| self.tiles[self.index(c)].game_object == game_object)
            .collect()
    }

    fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| TileCoord::new(x, y)))
    }

    fn index(&self, coord: TileCoord) -> usize {
        coord.y as usize * self.width as usize + coord.x as usize
    }

    fn tile_mut(&mut self, coord: TileCoord) -> Result<&mut TileObservation> {
        if !self.contains(coord) {
            return Err(TownError::OutOfBounds(coord));
        }
        let idx = self.index(coord);
        Ok(&mut self.tiles[idx])
    }
}

impl World for Maze {
    /// The square window of side `2r + 1` around `position`, clamped to the
    /// grid, row-major.
    fn nearby_tiles(&self, position: TileCoord, radius: u32) -> Vec<TileCoord> {
        if !self.contains(position) {
            return Vec::new();
        }
        let x_end = position.x.saturating_add(radius).min(self.width - 1);
        let y_end = position.y.saturating_add(radius).min(self.height - 1);

        let mut out = Vec::new();
        for y in position.y.saturating_sub(radius)..=y_end {
            for x in position.x.saturating_sub(radius)..=x_end {
                out.push(TileCoord::new(x, y));
            }
        }
        out
    }

    fn tile(&self, coord: TileCoord) -> Option<&TileObservation> {
        if self.contains(coord) {
            self.tiles.get(self.index(coord))
        } else {
            None
        }
    }
}
