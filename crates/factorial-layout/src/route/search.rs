//! Path search strategies for the router.
//!
//! A search returns the cells of one transport path: the first cell lies in
//! the source machine's footprint, the last in the destination's, every
//! step is orthogonal, and the cells strictly between them form the
//! corridor that receives loaders and belts.

use super::Occupant;
use crate::error::{GeometryKind, LayoutError};
use crate::layout::ConnectionId;
use factorial_spatial::{BuildingFootprint, Direction, GridPosition, SiteBounds, SpatialIndex};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// A machine footprint at a grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub origin: GridPosition,
    pub footprint: BuildingFootprint,
}

impl Endpoint {
    pub fn new(origin: GridPosition, footprint: BuildingFootprint) -> Self {
        Self { origin, footprint }
    }

    /// The reference cell paths start from and aim at: the footprint's
    /// center cell, rounded toward the origin.
    pub fn anchor(&self) -> GridPosition {
        GridPosition::new(
            self.origin.x + (self.footprint.width / 2) as i32,
            self.origin.y + (self.footprint.height / 2) as i32,
        )
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        self.footprint.contains(self.origin, pos)
    }

    pub fn intersects(&self, other: &Endpoint) -> bool {
        self.footprint
            .intersects(self.origin, &other.footprint, other.origin)
    }

    /// Manhattan distance from `pos` to the nearest cell of the footprint.
    fn distance_from(&self, pos: GridPosition) -> u32 {
        let max_x = self.origin.x + self.footprint.width as i32 - 1;
        let max_y = self.origin.y + self.footprint.height as i32 - 1;
        let dx = (self.origin.x - pos.x).max(pos.x - max_x).max(0);
        let dy = (self.origin.y - pos.y).max(pos.y - max_y).max(0);
        (dx + dy) as u32
    }
}

/// Everything a search needs to know about one connection.
pub struct SearchRequest<'a> {
    pub connection: ConnectionId,
    pub source: Endpoint,
    pub dest: Endpoint,
    /// Machines and transport routed so far.
    pub obstacles: &'a SpatialIndex<Occupant>,
    pub bounds: SiteBounds,
}

/// A strategy for finding the cells of one transport path.
pub trait PathSearch {
    fn find_path(&self, request: &SearchRequest<'_>) -> Result<Vec<GridPosition>, LayoutError>;
}

// ---------------------------------------------------------------------------
// Straight walk
// ---------------------------------------------------------------------------

/// Greedy walk from the source anchor to the destination anchor, covering
/// the axis with the larger offset first (x on a tie).
///
/// It ignores obstacles and rejects geometry it cannot walk: machines whose
/// origins are closer than one footprint (`Overlap`), exactly one footprint
/// apart (`Touching`), or offset on the minor axis by less than a footprint
/// without being aligned (`NearDiagonalOffset`).
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightWalk;

impl StraightWalk {
    fn check_geometry(request: &SearchRequest<'_>) -> Result<(), GeometryKind> {
        let (s, d) = (request.source, request.dest);
        let reach = s
            .footprint
            .width
            .max(s.footprint.height)
            .max(d.footprint.width)
            .max(d.footprint.height) as i32;
        let ox = (d.origin.x - s.origin.x).abs();
        let oy = (d.origin.y - s.origin.y).abs();

        if (1..reach).contains(&ox.min(oy)) {
            return Err(GeometryKind::NearDiagonalOffset);
        }
        let chebyshev = ox.max(oy);
        if chebyshev < reach || s.intersects(&d) {
            return Err(GeometryKind::Overlap);
        }
        if chebyshev == reach {
            return Err(GeometryKind::Touching);
        }
        Ok(())
    }
}

impl PathSearch for StraightWalk {
    fn find_path(&self, request: &SearchRequest<'_>) -> Result<Vec<GridPosition>, LayoutError> {
        Self::check_geometry(request).map_err(|kind| LayoutError::InfeasibleGeometry {
            connection: request.connection,
            kind,
        })?;

        let from = request.source.anchor();
        let to = request.dest.anchor();
        let x_first = (to.x - from.x).abs() >= (to.y - from.y).abs();

        let mut cells = vec![from];
        let mut pos = from;
        let walk_x = |pos: &mut GridPosition, cells: &mut Vec<GridPosition>| {
            while pos.x != to.x {
                pos.x += (to.x - pos.x).signum();
                cells.push(*pos);
            }
        };
        let walk_y = |pos: &mut GridPosition, cells: &mut Vec<GridPosition>| {
            while pos.y != to.y {
                pos.y += (to.y - pos.y).signum();
                cells.push(*pos);
            }
        };
        if x_first {
            walk_x(&mut pos, &mut cells);
            walk_y(&mut pos, &mut cells);
        } else {
            walk_y(&mut pos, &mut cells);
            walk_x(&mut pos, &mut cells);
        }

        // Stop at the first destination cell.
        if let Some(end) = cells.iter().position(|&c| request.dest.contains(c)) {
            cells.truncate(end + 1);
        }
        Ok(cells)
    }
}

// ---------------------------------------------------------------------------
// A*
// ---------------------------------------------------------------------------

/// Cost of one step.
const STEP_COST: u32 = 2;
/// Extra cost of changing direction.
const TURN_COST: u32 = 1;

/// Obstacle-aware shortest path over free grid cells.
///
/// Machines and previously routed transport block; the path leaves the
/// source and enters the destination through a free cell, and both loader
/// cells are straight (the path keeps its direction through them). Turns
/// cost extra, so among shortest paths the straightest wins.
#[derive(Debug, Clone, Copy)]
pub struct AStarSearch {
    /// Expanded-state budget before giving up.
    pub max_nodes: usize,
}

impl Default for AStarSearch {
    fn default() -> Self {
        Self { max_nodes: 200_000 }
    }
}

/// A search state: a corridor cell and the direction it was entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct State {
    pos: GridPosition,
    dir: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    state: State,
    g: u32,
    f: u32,
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap behavior; deeper nodes first on equal f.
        other
            .f
            .cmp(&self.f)
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| other.state.cmp(&self.state))
    }
}

impl AStarSearch {
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    fn is_free(request: &SearchRequest<'_>, pos: GridPosition) -> bool {
        request.bounds.contains_tile(pos)
            && !request.obstacles.is_occupied(pos)
            && !request.source.contains(pos)
            && !request.dest.contains(pos)
    }

    fn heuristic(request: &SearchRequest<'_>, state: State) -> u32 {
        if request.dest.contains(state.pos) {
            0
        } else {
            STEP_COST * request.dest.distance_from(state.pos)
        }
    }

    /// First corridor cells: free cells adjacent to the source, entered
    /// moving away from it.
    fn starts(request: &SearchRequest<'_>) -> Vec<State> {
        let source = request.source;
        let mut starts = Vec::new();
        for cell in source.footprint.tiles(source.origin) {
            for dir in Direction::all() {
                let pos = cell.step(dir);
                if Self::is_free(request, pos) {
                    starts.push(State { pos, dir });
                }
            }
        }
        starts.sort();
        starts.dedup();
        starts
    }

    fn reconstruct(
        request: &SearchRequest<'_>,
        goal: State,
        came_from: &HashMap<State, State>,
    ) -> Vec<GridPosition> {
        let mut states = vec![goal];
        let mut current = goal;
        while let Some(&prev) = came_from.get(&current) {
            states.push(prev);
            current = prev;
        }
        states.reverse();

        let first = states[0];
        let mut cells = Vec::with_capacity(states.len() + 1);
        cells.push(first.pos.step(first.dir.opposite()));
        cells.extend(states.iter().map(|s| s.pos));
        debug_assert!(request.source.contains(cells[0]));
        cells
    }
}

impl PathSearch for AStarSearch {
    fn find_path(&self, request: &SearchRequest<'_>) -> Result<Vec<GridPosition>, LayoutError> {
        if request.source.intersects(&request.dest) {
            return Err(LayoutError::InfeasibleGeometry {
                connection: request.connection,
                kind: GeometryKind::Overlap,
            });
        }

        let mut open = BinaryHeap::new();
        let mut came_from: HashMap<State, State> = HashMap::new();
        let mut g_score: HashMap<State, u32> = HashMap::new();

        for start in Self::starts(request) {
            g_score.insert(start, 0);
            open.push(Node {
                state: start,
                g: 0,
                f: Self::heuristic(request, start),
            });
        }

        let mut expanded = 0usize;
        while let Some(current) = open.pop() {
            if request.dest.contains(current.state.pos) {
                return Ok(Self::reconstruct(request, current.state, &came_from));
            }
            match g_score.get(&current.state) {
                Some(&best) if current.g > best => continue,
                None => continue,
                _ => {}
            }

            expanded += 1;
            if expanded > self.max_nodes {
                break;
            }

            let State { pos, dir } = current.state;
            // The input loader keeps the direction it left the source in.
            let leaving_source = request.source.contains(pos.step(dir.opposite()));

            for next_dir in Direction::all() {
                if next_dir == dir.opposite() || (leaving_source && next_dir != dir) {
                    continue;
                }
                let next_pos = pos.step(next_dir);
                let entering_dest = request.dest.contains(next_pos);
                // The output loader passes straight into the destination.
                if entering_dest && next_dir != dir {
                    continue;
                }
                if !entering_dest && !Self::is_free(request, next_pos) {
                    continue;
                }

                let turn = if next_dir == dir { 0 } else { TURN_COST };
                let tentative_g = current.g + STEP_COST + turn;
                let next = State {
                    pos: next_pos,
                    dir: next_dir,
                };
                let is_better = g_score.get(&next).is_none_or(|&score| tentative_g < score);
                if is_better {
                    came_from.insert(next, current.state);
                    g_score.insert(next, tentative_g);
                    open.push(Node {
                        state: next,
                        g: tentative_g,
                        f: tentative_g + Self::heuristic(request, next),
                    });
                }
            }
        }

        tracing::debug!(
            connection = ?request.connection,
            expanded,
            "no transport path found"
        );
        Err(LayoutError::NoPath {
            connection: request.connection,
        })
    }
}
