//! Router: turns every connection of a discretized layout into transport
//! placements (input loader, belts, output loader) and emits them to a
//! [`SiteSink`].
//!
//! Routing is two-phase. [`Router::plan`] computes every path against an
//! obstacle map of machines and already-planned transport and collects all
//! failures; only a fully successful plan is ever emitted.

pub mod search;

pub use search::{AStarSearch, Endpoint, PathSearch, SearchRequest, StraightWalk};

use crate::error::{GeometryKind, LayoutError};
use crate::layout::{ConnectionId, Layout, MachineId};
use factorial_spatial::{Direction, GridPosition, SiteSink, SpatialIndex};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What covers a tile in the router's obstacle map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Occupant {
    Machine(MachineId),
    Transport(ConnectionId),
}

/// Which path search the router uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterKind {
    /// Greedy walk between anchors; rejects awkward geometry.
    #[default]
    StraightWalk,
    /// Obstacle-aware search.
    AStar,
}

/// Router settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub kind: RouterKind,
    /// Expanded-state budget per connection for [`RouterKind::AStar`].
    pub max_search_nodes: usize,
    /// Entity placed at both ends of a corridor.
    pub loader_entity: String,
    /// Entity placed on interior corridor cells.
    pub belt_entity: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            kind: RouterKind::StraightWalk,
            max_search_nodes: AStarSearch::default().max_nodes,
            loader_entity: "inserter".to_string(),
            belt_entity: "transport-belt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Loader,
    Belt,
}

/// One transport entity to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPlacement {
    pub kind: TransportKind,
    pub position: GridPosition,
    pub direction: Direction,
}

/// A planned connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPath {
    pub connection: ConnectionId,
    /// Every cell of the path, from a source footprint cell to a
    /// destination footprint cell.
    pub cells: Vec<GridPosition>,
    /// Placements in travel order.
    pub placements: Vec<TransportPlacement>,
}

impl RoutedPath {
    pub fn belt_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| p.kind == TransportKind::Belt)
            .count()
    }

    pub fn loader_count(&self) -> usize {
        self.placements.len() - self.belt_count()
    }
}

/// Direction of travel from `from` toward `to`, by the dominant axis (x on
/// a tie). Equal cells face north.
pub fn orientation(from: GridPosition, to: GridPosition) -> Direction {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if dx != 0 && dx.abs() >= dy.abs() {
        if dx > 0 { Direction::East } else { Direction::West }
    } else if dy > 0 {
        Direction::South
    } else {
        Direction::North
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Plans and emits transport for a discretized layout.
pub struct Router {
    search: Box<dyn PathSearch + Send + Sync>,
    loader_entity: String,
    belt_entity: String,
}

impl Router {
    pub fn new(config: &RouterConfig) -> Self {
        let search: Box<dyn PathSearch + Send + Sync> = match config.kind {
            RouterKind::StraightWalk => Box::new(StraightWalk),
            RouterKind::AStar => Box::new(AStarSearch::new(config.max_search_nodes)),
        };
        Self {
            search,
            loader_entity: config.loader_entity.clone(),
            belt_entity: config.belt_entity.clone(),
        }
    }

    /// Use a custom path search with the default entity names.
    pub fn with_search(search: impl PathSearch + Send + Sync + 'static) -> Self {
        let defaults = RouterConfig::default();
        Self {
            search: Box::new(search),
            loader_entity: defaults.loader_entity,
            belt_entity: defaults.belt_entity,
        }
    }

    /// Obstacle map holding every machine at its grid position. Fails on the
    /// first machine whose footprint lands on an earlier one.
    fn machine_obstacles(layout: &Layout) -> Result<SpatialIndex<Occupant>, LayoutError> {
        let mut index = SpatialIndex::new();
        for (id, machine) in layout.machines() {
            let origin = machine.grid_position();
            if index
                .place(Occupant::Machine(id), origin, machine.footprint)
                .is_err()
            {
                let first = machine
                    .footprint
                    .tiles(origin)
                    .find_map(|tile| match index.occupant_at(tile) {
                        Some(Occupant::Machine(other)) => Some(other),
                        _ => None,
                    })
                    .unwrap_or(id);
                return Err(LayoutError::MachineOverlap { first, second: id });
            }
        }
        Ok(index)
    }

    fn endpoints(layout: &Layout, connection: ConnectionId) -> Result<(Endpoint, Endpoint), LayoutError> {
        let conn = layout
            .connection(connection)
            .ok_or(LayoutError::ConnectionNotFound(connection))?;
        let endpoint = |id: MachineId| {
            layout
                .machine(id)
                .map(|m| Endpoint::new(m.grid_position(), m.footprint))
                .ok_or(LayoutError::MachineNotFound(id))
        };
        // Items flow from the producer to the consumer.
        Ok((endpoint(conn.producer)?, endpoint(conn.consumer)?))
    }

    /// Route one connection against `obstacles` and claim its corridor.
    fn route_one(
        &self,
        layout: &Layout,
        connection: ConnectionId,
        obstacles: &mut SpatialIndex<Occupant>,
    ) -> Result<RoutedPath, LayoutError> {
        let (source, dest) = Self::endpoints(layout, connection)?;
        let request = SearchRequest {
            connection,
            source,
            dest,
            obstacles: &*obstacles,
            bounds: layout.bounds(),
        };
        let cells = self.search.find_path(&request)?;
        let corridor = corridor(&cells, &source, &dest).ok_or(LayoutError::InfeasibleGeometry {
            connection,
            kind: GeometryKind::Touching,
        })?;

        let mut claimed = Vec::with_capacity(corridor.len());
        for &(position, _) in &corridor {
            if !layout.bounds().contains_tile(position) || obstacles.is_occupied(position) {
                return Err(LayoutError::PathBlocked {
                    connection,
                    position,
                });
            }
            claimed.push(position);
        }
        obstacles
            .claim_tiles(Occupant::Transport(connection), &claimed)
            .map_err(|_| LayoutError::PathBlocked {
                connection,
                position: claimed[0],
            })?;

        let last = corridor.len() - 1;
        let placements = corridor
            .iter()
            .enumerate()
            .map(|(i, &(position, direction))| TransportPlacement {
                kind: if i == 0 || (i == last && last >= 2) {
                    TransportKind::Loader
                } else {
                    TransportKind::Belt
                },
                position,
                direction,
            })
            // A corridor too short for a belt takes a single loader.
            .take(if last >= 2 { corridor.len() } else { 1 })
            .collect();

        Ok(RoutedPath {
            connection,
            cells,
            placements,
        })
    }

    /// Route a single connection in isolation, with only machines as
    /// obstacles.
    pub fn route_connection(
        &self,
        layout: &Layout,
        connection: ConnectionId,
    ) -> Result<RoutedPath, LayoutError> {
        let mut obstacles = Self::machine_obstacles(layout)?;
        self.route_one(layout, connection, &mut obstacles)
    }

    /// Route every connection. Paths are planned in connection order, each
    /// avoiding the ones before it. Fails with
    /// [`LayoutError::RoutingFailed`] listing every connection that could
    /// not be routed, or with [`LayoutError::MachineOverlap`] before routing
    /// anything if two machines share a tile.
    pub fn plan(&self, layout: &Layout) -> Result<Vec<RoutedPath>, LayoutError> {
        let mut obstacles = Self::machine_obstacles(layout)?;
        let mut routes = Vec::with_capacity(layout.connection_count());
        let mut failures = Vec::new();

        for (connection, _) in layout.connections() {
            match self.route_one(layout, connection, &mut obstacles) {
                Ok(route) => {
                    tracing::debug!(
                        ?connection,
                        cells = route.cells.len(),
                        belts = route.belt_count(),
                        "routed connection"
                    );
                    routes.push(route);
                }
                Err(err) => {
                    tracing::warn!(?connection, error = %err, "connection could not be routed");
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(routes)
        } else {
            Err(LayoutError::RoutingFailed { failures })
        }
    }

    /// Send planned transport to the site. Returns the number of entities
    /// placed.
    pub fn emit<S: SiteSink + ?Sized>(
        &self,
        routes: &[RoutedPath],
        sink: &mut S,
    ) -> Result<usize, LayoutError> {
        let mut placed = 0;
        for route in routes {
            for p in &route.placements {
                let name = match p.kind {
                    TransportKind::Loader => &self.loader_entity,
                    TransportKind::Belt => &self.belt_entity,
                };
                sink.add_entity(name, p.position, p.direction.orientation(), None)?;
                placed += 1;
            }
        }
        Ok(placed)
    }

    /// Plan every connection, record each path on its connection, and emit
    /// the transport. Nothing is emitted or recorded if any connection
    /// fails.
    pub fn route_all<S: SiteSink + ?Sized>(
        &self,
        layout: &mut Layout,
        sink: &mut S,
    ) -> Result<Vec<RoutedPath>, LayoutError> {
        let routes = self.plan(layout)?;
        for route in &routes {
            if let Some(conn) = layout.connection_mut(route.connection) {
                conn.path = Some(route.cells.clone());
            }
        }
        self.emit(&routes, sink)?;
        Ok(routes)
    }
}

/// Corridor cells of a path with their travel direction: the cells after
/// the last source cell up to the first destination cell. `None` if the
/// path does not run from source to destination through at least one free
/// cell.
fn corridor(
    cells: &[GridPosition],
    source: &Endpoint,
    dest: &Endpoint,
) -> Option<Vec<(GridPosition, Direction)>> {
    let first_dest = cells.iter().position(|&c| dest.contains(c))?;
    let last_source = cells[..first_dest].iter().rposition(|&c| source.contains(c))?;
    if first_dest - last_source < 2 {
        return None;
    }
    Some(
        (last_source + 1..first_dest)
            .map(|i| (cells[i], orientation(cells[i], cells[i + 1])))
            .collect(),
    )
}
