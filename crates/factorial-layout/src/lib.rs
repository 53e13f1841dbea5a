//! Factorial Layout -- automatic factory layout from a production plan.
//!
//! Given the machines a plan needs, the crate places them on a bounded
//! site, connects every consumer to the producer of each input, relaxes the
//! placement with a force model until no two footprints crowd each other,
//! snaps it to the grid, routes a loader/belt path for every connection,
//! and emits the result to a [`factorial_spatial::SiteSink`].
//!
//! # Stages
//!
//! | Stage | Entry point |
//! |---|---|
//! | Placement initializer | [`Layout::random`] |
//! | Dependency resolver | [`resolve_dependencies`] |
//! | Layout relaxer | [`relax`] |
//! | Discretizer | [`discretize`] |
//! | Router | [`Router`] |
//!
//! [`LayoutPipeline`] runs all of them in order. Every stage is
//! deterministic for a given [`LayoutConfig::seed`].

pub mod config;
pub mod discretize;
pub mod error;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod relax;
pub mod resolve;
pub mod route;

pub use config::LayoutConfig;
pub use discretize::discretize;
pub use error::{GeometryKind, LayoutError};
pub use layout::{Connection, ConnectionId, Layout, MachineId, PlacedMachine, Vec2};
pub use model::ProductionModel;
pub use pipeline::{LayoutOutcome, LayoutPipeline};
pub use relax::{RelaxConfig, RelaxReport, relax};
pub use resolve::{ExternalInput, ProducerPolicy, ResolveReport, resolve_dependencies};
pub use route::{
    AStarSearch, PathSearch, RoutedPath, Router, RouterConfig, RouterKind, StraightWalk,
    TransportKind, TransportPlacement, orientation,
};
