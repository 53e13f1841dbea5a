use crate::layout::{ConnectionId, MachineId};
use factorial_core::id::{ItemTypeId, MachineTypeId};
use factorial_spatial::{GridPosition, SiteError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a connection's endpoints cannot be joined by a transport path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// The two machines' footprints overlap.
    Overlap,
    /// The machines are adjacent with no room for a loader between them.
    Touching,
    /// One axis offset is 1 or 2 cells, which the straight walk cannot bend
    /// around.
    NearDiagonalOffset,
}

/// Errors that can occur while laying out a factory.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("machine template {0:?} is not in the production model")]
    UnknownMachineType(MachineTypeId),
    #[error("machine template {machine:?} does not fit on the site")]
    FootprintTooLarge { machine: MachineTypeId },
    #[error("machine {0:?} is not in the layout")]
    MachineNotFound(MachineId),
    #[error("connection {0:?} is not in the layout")]
    ConnectionNotFound(ConnectionId),
    #[error("item {item:?} needed by {consumer:?} has several producers: {candidates:?}")]
    AmbiguousProducer {
        consumer: MachineId,
        item: ItemTypeId,
        candidates: Vec<MachineId>,
    },
    #[error(
        "relaxation did not converge after {iterations} iterations \
         (max displacement {max_displacement:.4}, {conflicts} conflicting pairs)"
    )]
    NonConvergence {
        iterations: u32,
        max_displacement: f64,
        conflicts: usize,
    },
    #[error("machines {first:?} and {second:?} overlap on the grid")]
    MachineOverlap { first: MachineId, second: MachineId },
    #[error("connection {connection:?} cannot be routed: {kind:?}")]
    InfeasibleGeometry {
        connection: ConnectionId,
        kind: GeometryKind,
    },
    #[error("no transport path found for connection {connection:?}")]
    NoPath { connection: ConnectionId },
    #[error("path for connection {connection:?} is blocked at {position:?}")]
    PathBlocked {
        connection: ConnectionId,
        position: GridPosition,
    },
    #[error("{} connection(s) failed to route", failures.len())]
    RoutingFailed { failures: Vec<LayoutError> },
    #[error("site rejected a placement: {0}")]
    Site(#[from] SiteError),
}

impl LayoutError {
    /// The connection this error is about, for per-connection failures.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            LayoutError::InfeasibleGeometry { connection, .. }
            | LayoutError::NoPath { connection }
            | LayoutError::PathBlocked { connection, .. } => Some(*connection),
            _ => None,
        }
    }

    /// Whether a fresh random initial layout might avoid this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LayoutError::NonConvergence { .. })
    }
}
