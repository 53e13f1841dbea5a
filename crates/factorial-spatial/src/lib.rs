//! Spatial grid module for machine placement, obstacle lookups, and the
//! site that receives finished entity placements.
//!
//! Provides integer grid primitives, a bounded site rectangle, an occupancy
//! index mapping tiles to whatever occupies them (machines, transport
//! entities), and the [`SiteSink`] boundary the layout engine emits into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod site;
pub use site::{EntityPlacement, Site, SiteEntryId, SiteError, SiteSink};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// The adjacent position one step in `dir`.
    pub fn step(&self, dir: Direction) -> GridPosition {
        let (dx, dy) = dir.offset();
        GridPosition::new(self.x + dx, self.y + dy)
    }
}

/// The footprint (size) of a machine or entity on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingFootprint {
    pub width: u32,
    pub height: u32,
}

impl BuildingFootprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 entity (belt segment, inserter).
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    /// Iterate over all tiles occupied by this footprint at the given origin.
    /// Origin is the top-left corner.
    pub fn tiles(&self, origin: GridPosition) -> impl Iterator<Item = GridPosition> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ox = origin.x;
        let oy = origin.y;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridPosition::new(ox + dx, oy + dy)))
    }

    /// Whether `pos` lies inside this footprint placed at `origin`.
    pub fn contains(&self, origin: GridPosition, pos: GridPosition) -> bool {
        pos.x >= origin.x
            && pos.y >= origin.y
            && pos.x < origin.x + self.width as i32
            && pos.y < origin.y + self.height as i32
    }

    /// Whether two placed footprints share at least one tile.
    pub fn intersects(
        &self,
        origin: GridPosition,
        other: &BuildingFootprint,
        other_origin: GridPosition,
    ) -> bool {
        origin.x < other_origin.x + other.width as i32
            && other_origin.x < origin.x + self.width as i32
            && origin.y < other_origin.y + other.height as i32
            && other_origin.y < origin.y + self.height as i32
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction. North is toward smaller `y`.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The opposite direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Eight-way orientation code used by the site: 0, 2, 4, 6 for
    /// north, east, south, west.
    pub fn orientation(&self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 6,
        }
    }

    /// The direction of a single orthogonal step from `from` to `to`, or
    /// `None` when the cells are not 4-adjacent.
    pub fn between(from: GridPosition, to: GridPosition) -> Option<Direction> {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

/// The bounded rectangle every placement must fit inside. Origin at (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for SiteBounds {
    fn default() -> Self {
        Self {
            width: 96,
            height: 96,
        }
    }
}

impl SiteBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Largest valid origin for a footprint, as `(W - w, H - h)`.
    /// `None` if the footprint does not fit at all.
    pub fn max_origin(&self, footprint: BuildingFootprint) -> Option<(u32, u32)> {
        Some((
            self.width.checked_sub(footprint.width)?,
            self.height.checked_sub(footprint.height)?,
        ))
    }

    /// Whether a footprint at `origin` lies fully inside the site.
    pub fn contains(&self, origin: GridPosition, footprint: BuildingFootprint) -> bool {
        origin.x >= 0
            && origin.y >= 0
            && (origin.x as i64 + footprint.width as i64) <= self.width as i64
            && (origin.y as i64 + footprint.height as i64) <= self.height as i64
    }

    /// Whether a single tile lies inside the site.
    pub fn contains_tile(&self, pos: GridPosition) -> bool {
        self.contains(pos, BuildingFootprint::single())
    }
}

/// Errors from spatial operations.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    #[error("position is occupied")]
    Occupied,
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// A spatial index mapping grid tiles to their occupants.
///
/// The key type is whatever the caller uses to identify occupants; the
/// router keys it by machine and by routed connection.
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    tiles: BTreeMap<GridPosition, K>,
}

impl<K> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self {
            tiles: BTreeMap::new(),
        }
    }
}

impl<K: Copy + Ord> SpatialIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a footprint on the grid. Origin is the top-left corner.
    /// Fails without changes if any tile is taken.
    pub fn place(
        &mut self,
        key: K,
        position: GridPosition,
        footprint: BuildingFootprint,
    ) -> Result<(), SpatialError> {
        if !self.can_place(position, footprint) {
            return Err(SpatialError::Occupied);
        }
        for tile in footprint.tiles(position) {
            self.tiles.insert(tile, key);
        }
        Ok(())
    }

    /// Mark individual tiles as belonging to `key`, e.g. a routed path.
    /// Fails without changes if any tile is taken.
    pub fn claim_tiles(&mut self, key: K, tiles: &[GridPosition]) -> Result<(), SpatialError> {
        if tiles.iter().any(|t| self.tiles.contains_key(t)) {
            return Err(SpatialError::Occupied);
        }
        for &tile in tiles {
            self.tiles.insert(tile, key);
        }
        Ok(())
    }

    /// Check if a footprint can be placed at the given position.
    pub fn can_place(&self, position: GridPosition, footprint: BuildingFootprint) -> bool {
        footprint
            .tiles(position)
            .all(|tile| !self.tiles.contains_key(&tile))
    }

    /// Get the occupant at a grid position.
    pub fn occupant_at(&self, pos: GridPosition) -> Option<K> {
        self.tiles.get(&pos).copied()
    }

    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.tiles.contains_key(&pos)
    }
}
