//! Factorial Core -- shared vocabulary for factory layout generation.
//!
//! This crate provides the identifiers, the production-model registry, and
//! the deterministic random source that every other Factorial crate
//! depends on.
//!
//! # Key Types
//!
//! - [`registry::Registry`] -- Immutable registry of item types, recipes,
//!   and machine templates (frozen at startup). Each machine template
//!   carries its footprint and the recipe it runs.
//! - [`rng::SimRng`] -- SplitMix64 generator injected wherever randomness is
//!   needed, so layout runs are reproducible under a fixed seed.
//! - [`id`] -- Copyable newtype ids for items, recipes and machine templates.

pub mod id;
pub mod registry;
pub mod rng;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
