//! The construction site: the sink that receives finished entity
//! placements and checks them against the site bounds and against each
//! other.

use crate::{BuildingFootprint, GridPosition, SiteBounds};
use factorial_core::id::RecipeId;
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Unique identifier for an entity placed on a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SiteEntryId(pub u64);

/// One placement command: which entity, where, facing which way, and the
/// recipe it runs (machines only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityPlacement {
    pub name: String,
    pub position: GridPosition,
    pub orientation: u8,
    pub recipe: Option<RecipeId>,
}

/// Errors from site placement.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("'{name}' at {position:?} lies outside the site")]
    OutOfBounds { name: String, position: GridPosition },
    #[error("'{name}' at {position:?} collides with '{existing}'")]
    Collision {
        name: String,
        position: GridPosition,
        existing: String,
    },
}

/// Anything that accepts entity placements.
///
/// The layout engine only ever talks to this trait; validation and
/// persistence belong to the implementor.
pub trait SiteSink {
    fn add_entity(
        &mut self,
        name: &str,
        position: GridPosition,
        orientation: u8,
        recipe: Option<RecipeId>,
    ) -> Result<(), SiteError>;
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// An in-memory site that records placements and rejects any that leave
/// the bounds or overlap an earlier one.
///
/// Entity sizes come from footprints registered by name; unregistered names
/// are 1x1.
#[derive(Debug, Clone)]
pub struct Site {
    bounds: SiteBounds,
    footprints: BTreeMap<String, BuildingFootprint>,
    entries: BTreeMap<SiteEntryId, EntityPlacement>,
    tiles: BTreeMap<GridPosition, SiteEntryId>,
    next_id: u64,
}

impl Site {
    /// Create an empty site.
    pub fn new(bounds: SiteBounds) -> Self {
        Self {
            bounds,
            footprints: BTreeMap::new(),
            entries: BTreeMap::new(),
            tiles: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn bounds(&self) -> SiteBounds {
        self.bounds
    }

    /// Declare the footprint of every entity named `name`.
    pub fn register_footprint(&mut self, name: &str, footprint: BuildingFootprint) {
        self.footprints.insert(name.to_string(), footprint);
    }

    /// The footprint used for entities named `name`.
    pub fn footprint_of(&self, name: &str) -> BuildingFootprint {
        self.footprints
            .get(name)
            .copied()
            .unwrap_or_else(BuildingFootprint::single)
    }

    /// Get a placement by ID.
    pub fn get(&self, id: SiteEntryId) -> Option<&EntityPlacement> {
        self.entries.get(&id)
    }

    /// Iterate over all placements in the order they were made.
    pub fn entries(&self) -> impl Iterator<Item = &EntityPlacement> {
        self.entries.values()
    }

    /// All placements of entities named `name`.
    pub fn entries_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EntityPlacement> {
        self.entries.values().filter(move |e| e.name == name)
    }

    /// The placement covering `pos`, if any.
    pub fn entity_at(&self, pos: GridPosition) -> Option<&EntityPlacement> {
        self.tiles.get(&pos).and_then(|id| self.entries.get(id))
    }

    /// Number of placements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been placed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every placement, keeping bounds and registered footprints.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tiles.clear();
    }
}

impl SiteSink for Site {
    fn add_entity(
        &mut self,
        name: &str,
        position: GridPosition,
        orientation: u8,
        recipe: Option<RecipeId>,
    ) -> Result<(), SiteError> {
        let footprint = self.footprint_of(name);
        if !self.bounds.contains(position, footprint) {
            return Err(SiteError::OutOfBounds {
                name: name.to_string(),
                position,
            });
        }
        for tile in footprint.tiles(position) {
            if let Some(existing) = self.tiles.get(&tile).and_then(|id| self.entries.get(id)) {
                return Err(SiteError::Collision {
                    name: name.to_string(),
                    position,
                    existing: existing.name.clone(),
                });
            }
        }

        let id = SiteEntryId(self.next_id);
        self.next_id += 1;
        for tile in footprint.tiles(position) {
            self.tiles.insert(tile, id);
        }
        self.entries.insert(
            id,
            EntityPlacement {
                name: name.to_string(),
                position,
                orientation,
                recipe,
            },
        );
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_site() -> Site {
        let mut site = Site::new(SiteBounds::new(20, 20));
        site.register_footprint("assembling-machine-1", BuildingFootprint::new(3, 3));
        site
    }

    #[test]
    fn add_records_placement() {
        let mut site = make_site();
        site.add_entity("inserter", GridPosition::new(4, 4), 2, None)
            .unwrap();

        assert_eq!(site.len(), 1);
        let placed = site.entity_at(GridPosition::new(4, 4)).unwrap();
        assert_eq!(placed.name, "inserter");
        assert_eq!(placed.orientation, 2);
    }

    #[test]
    fn registered_footprint_covers_tiles() {
        let mut site = make_site();
        site.add_entity(
            "assembling-machine-1",
            GridPosition::new(5, 5),
            0,
            Some(RecipeId(3)),
        )
        .unwrap();

        for tile in BuildingFootprint::new(3, 3).tiles(GridPosition::new(5, 5)) {
            assert_eq!(site.entity_at(tile).unwrap().recipe, Some(RecipeId(3)));
        }
        assert!(site.entity_at(GridPosition::new(8, 5)).is_none());
    }

    #[test]
    fn collision_rejected() {
        let mut site = make_site();
        site.add_entity("assembling-machine-1", GridPosition::new(5, 5), 0, None)
            .unwrap();

        let result = site.add_entity("transport-belt", GridPosition::new(7, 7), 0, None);
        match result {
            Err(SiteError::Collision { existing, .. }) => {
                assert_eq!(existing, "assembling-machine-1");
            }
            other => panic!("expected Collision, got: {other:?}"),
        }
        assert_eq!(site.len(), 1);
    }

    #[test]
    fn out_of_bounds_rejected() {
        let mut site = make_site();
        let result = site.add_entity("assembling-machine-1", GridPosition::new(18, 0), 0, None);
        assert!(matches!(result, Err(SiteError::OutOfBounds { .. })));

        let result = site.add_entity("inserter", GridPosition::new(-1, 3), 0, None);
        assert!(matches!(result, Err(SiteError::OutOfBounds { .. })));
        assert!(site.is_empty());
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut site = make_site();
        site.add_entity("inserter", GridPosition::new(0, 0), 0, None)
            .unwrap();
        site.add_entity("transport-belt", GridPosition::new(1, 0), 2, None)
            .unwrap();
        site.add_entity("transport-belt", GridPosition::new(2, 0), 2, None)
            .unwrap();

        let names: Vec<_> = site.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["inserter", "transport-belt", "transport-belt"]);
        assert_eq!(site.entries_named("transport-belt").count(), 2);
        assert_eq!(site.get(SiteEntryId(1)).unwrap().name, "inserter");
    }

    #[test]
    fn clear_resets_entries() {
        let mut site = make_site();
        site.add_entity("inserter", GridPosition::new(0, 0), 0, None)
            .unwrap();
        site.clear();
        assert!(site.is_empty());
        assert!(site.entity_at(GridPosition::new(0, 0)).is_none());
        // Footprints survive a clear.
        assert_eq!(
            site.footprint_of("assembling-machine-1"),
            BuildingFootprint::new(3, 3)
        );
    }
}
