//! The layout arena: every placed machine and every connection between
//! them, plus the random placement that seeds a run.

use crate::error::LayoutError;
use crate::model::ProductionModel;
use factorial_core::id::{ItemTypeId, MachineTypeId};
use factorial_core::rng::SimRng;
use factorial_spatial::{BuildingFootprint, GridPosition, SiteBounds};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::BTreeSet;

new_key_type! {
    /// Identifies a placed machine in a [`Layout`].
    pub struct MachineId;

    /// Identifies a consumer -> producer connection in a [`Layout`].
    pub struct ConnectionId;
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// A real-valued 2D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(&self) -> Option<Vec2> {
        let len = self.length();
        (len > 1e-9).then(|| Vec2::new(self.x / len, self.y / len))
    }

    pub fn scale(&self, s: f64) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// A machine instance with a position on the site.
///
/// `position` is the top-left corner. It is real-valued while relaxing and
/// integral after discretization.
#[derive(Debug, Clone)]
pub struct PlacedMachine {
    pub machine_type: MachineTypeId,
    pub footprint: BuildingFootprint,
    pub position: Vec2,
    /// Outgoing connections to the machines this one takes items from.
    pub connections: Vec<ConnectionId>,
}

impl PlacedMachine {
    /// Center of the footprint in site coordinates.
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + self.footprint.width as f64 / 2.0,
            self.position.y + self.footprint.height as f64 / 2.0,
        )
    }

    /// Position truncated toward zero onto the grid.
    pub fn grid_position(&self) -> GridPosition {
        GridPosition::new(self.position.x.trunc() as i32, self.position.y.trunc() as i32)
    }

    /// Whether both coordinates are whole numbers.
    pub fn is_integral(&self) -> bool {
        self.position.x.fract() == 0.0 && self.position.y.fract() == 0.0
    }
}

/// A directed edge consumer -> producer, labelled with the items that flow
/// the other way. There is at most one per pair of machines.
#[derive(Debug, Clone)]
pub struct Connection {
    pub consumer: MachineId,
    pub producer: MachineId,
    pub items: BTreeSet<ItemTypeId>,
    /// Grid cells of the routed transport path, set once by the router.
    pub path: Option<Vec<GridPosition>>,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Owns every placed machine and connection of one layout run.
///
/// Connections refer to machines by [`MachineId`]; machines list their
/// outgoing connections by [`ConnectionId`]. Iteration follows insertion
/// order, which keeps every stage deterministic.
#[derive(Debug, Clone)]
pub struct Layout {
    bounds: SiteBounds,
    machines: SlotMap<MachineId, PlacedMachine>,
    connections: SlotMap<ConnectionId, Connection>,
}

impl Layout {
    /// Create an empty layout for a site.
    pub fn new(bounds: SiteBounds) -> Self {
        Self {
            bounds,
            machines: SlotMap::with_key(),
            connections: SlotMap::with_key(),
        }
    }

    /// Place one machine per requested template at a uniformly random
    /// position within `[0, W - w] x [0, H - h]`. Overlap is allowed.
    pub fn random<M: ProductionModel>(
        model: &M,
        machines: impl IntoIterator<Item = MachineTypeId>,
        bounds: SiteBounds,
        rng: &mut SimRng,
    ) -> Result<Self, LayoutError> {
        let mut layout = Layout::new(bounds);
        for machine_type in machines {
            let footprint = model
                .footprint(machine_type)
                .ok_or(LayoutError::UnknownMachineType(machine_type))?;
            let (max_x, max_y) = bounds
                .max_origin(footprint)
                .ok_or(LayoutError::FootprintTooLarge {
                    machine: machine_type,
                })?;
            let position = Vec2::new(rng.range_f64(max_x as f64), rng.range_f64(max_y as f64));
            layout.add_machine(machine_type, footprint, position);
        }
        tracing::debug!(machines = layout.machine_count(), "placed machines at random");
        Ok(layout)
    }

    /// Add a machine at an explicit position.
    pub fn add_machine(
        &mut self,
        machine_type: MachineTypeId,
        footprint: BuildingFootprint,
        position: Vec2,
    ) -> MachineId {
        self.machines.insert(PlacedMachine {
            machine_type,
            footprint,
            position,
            connections: Vec::new(),
        })
    }

    /// Connect `consumer` to the `producer` of `item`. If the two machines
    /// are already connected, `item` joins the existing connection and its
    /// id is returned.
    pub fn connect(
        &mut self,
        consumer: MachineId,
        producer: MachineId,
        item: ItemTypeId,
    ) -> Result<ConnectionId, LayoutError> {
        if !self.machines.contains_key(producer) {
            return Err(LayoutError::MachineNotFound(producer));
        }
        let Some(machine) = self.machines.get_mut(consumer) else {
            return Err(LayoutError::MachineNotFound(consumer));
        };
        let existing = machine
            .connections
            .iter()
            .copied()
            .find(|&id| self.connections.get(id).is_some_and(|c| c.producer == producer));
        if let Some(id) = existing
            && let Some(conn) = self.connections.get_mut(id)
        {
            conn.items.insert(item);
            return Ok(id);
        }
        let id = self.connections.insert(Connection {
            consumer,
            producer,
            items: BTreeSet::from([item]),
            path: None,
        });
        machine.connections.push(id);
        Ok(id)
    }

    /// Drop every connection, keeping machines where they are.
    pub fn clear_connections(&mut self) {
        self.connections.clear();
        for machine in self.machines.values_mut() {
            machine.connections.clear();
        }
    }

    // -- Queries --

    pub fn bounds(&self) -> SiteBounds {
        self.bounds
    }

    pub fn machine(&self, id: MachineId) -> Option<&PlacedMachine> {
        self.machines.get(id)
    }

    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut PlacedMachine> {
        self.machines.get_mut(id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub(crate) fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn machines(&self) -> impl Iterator<Item = (MachineId, &PlacedMachine)> {
        self.machines.iter()
    }

    pub fn machines_mut(&mut self) -> impl Iterator<Item = (MachineId, &mut PlacedMachine)> {
        self.machines.iter_mut()
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> {
        self.connections.iter()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections for which `producer` is the supplier.
    pub fn consumer_count(&self, producer: MachineId) -> usize {
        self.connections
            .values()
            .filter(|c| c.producer == producer)
            .count()
    }

    // -- Invariant checks --

    /// Pairs of machines whose footprints, at their truncated grid
    /// positions, share a tile.
    pub fn overlapping_pairs(&self) -> Vec<(MachineId, MachineId)> {
        let placed: Vec<_> = self
            .machines
            .iter()
            .map(|(id, m)| (id, m.grid_position(), m.footprint))
            .collect();
        let mut pairs = Vec::new();
        for (i, &(a, pos_a, fp_a)) in placed.iter().enumerate() {
            for &(b, pos_b, fp_b) in &placed[i + 1..] {
                if fp_a.intersects(pos_a, &fp_b, pos_b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Machines not fully inside the site.
    pub fn out_of_bounds(&self) -> Vec<MachineId> {
        self.machines
            .iter()
            .filter(|(_, m)| {
                let max_x = self.bounds.width as f64 - m.footprint.width as f64;
                let max_y = self.bounds.height as f64 - m.footprint.height as f64;
                !(0.0..=max_x).contains(&m.position.x) || !(0.0..=max_y).contains(&m.position.y)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether every machine sits on whole-number coordinates.
    pub fn is_integral(&self) -> bool {
        self.machines.values().all(PlacedMachine::is_integral)
    }

    /// Sum of center-to-center distances over all connections.
    pub fn total_connection_length(&self) -> f64 {
        self.connections
            .values()
            .filter_map(|c| {
                let a = self.machines.get(c.consumer)?;
                let b = self.machines.get(c.producer)?;
                Some((a.center() - b.center()).length())
            })
            .sum()
    }
}
