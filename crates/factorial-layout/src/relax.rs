//! Force-directed relaxation.
//!
//! Each step computes, from one snapshot of all positions, a displacement
//! per machine and only then moves every machine:
//!
//! - connections act as springs between centers with a rest length, scaled
//!   by the current step size, which decays geometrically;
//! - pairs whose footprints, inflated by the clearance margin, overlap are
//!   pushed apart along the line between their centers in proportion to
//!   the penetration depth. This correction is not scaled by the step size,
//!   so once the springs have cooled nothing holds two machines together;
//! - positions are clamped to the site after every step.
//!
//! This departs from the plain `position += step * net_force` update on
//! purpose: only the spring term is scaled by the step. A decaying step
//! applied to the push as well would stall separation of machines that
//! still overlap once the step has cooled.
//!
//! The run converges when the largest displacement falls below the
//! threshold and no pair violates the clearance. Hitting the iteration cap
//! first is an error.

use crate::error::LayoutError;
use crate::layout::{Layout, MachineId, Vec2};
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Penetration below this is not a conflict. Must stay well under the
/// clearance so truncation to the grid cannot create an overlap.
const CONFLICT_TOLERANCE: f64 = 1e-3;

/// Golden angle in radians, for spreading coincident pairs.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Tuning for [`relax`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxConfig {
    /// Spring stiffness per unit of stretch.
    pub spring_constant: f64,
    /// Center-to-center distance a connection relaxes toward.
    pub rest_length: f64,
    /// Gap kept free around every footprint. At least 1.0 keeps
    /// truncation from reintroducing overlap.
    pub clearance: f64,
    /// Fraction of the penetration depth each machine of a conflicting
    /// pair moves per step.
    pub repulsion: f64,
    pub initial_step: f64,
    /// Multiplier applied to the step size after every iteration.
    pub step_decay: f64,
    /// Largest per-machine displacement that still counts as at rest.
    pub convergence_threshold: f64,
    pub max_iterations: u32,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            spring_constant: 0.1,
            rest_length: 4.0,
            clearance: 1.0,
            repulsion: 0.25,
            initial_step: 1.0,
            step_decay: 0.995,
            convergence_threshold: 0.01,
            max_iterations: 10_000,
        }
    }
}

/// Outcome of a converged relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxReport {
    pub iterations: u32,
    pub max_displacement: f64,
    pub total_connection_length: f64,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Body {
    center: Vec2,
    half: Vec2,
}

/// Positions frozen at the start of a step. All displacements of a step are
/// computed against this.
struct Snapshot<'a> {
    bodies: Vec<Body>,
    centroid: Vec2,
    springs: &'a [Vec<usize>],
    config: &'a RelaxConfig,
}

impl Snapshot<'_> {
    /// Displacement of machine `i` for this step.
    fn displacement(&self, i: usize, step: f64) -> Vec2 {
        let body = self.bodies[i];
        let cfg = self.config;

        let mut spring = Vec2::ZERO;
        for &j in &self.springs[i] {
            let delta = self.bodies[j].center - body.center;
            if let Some(dir) = delta.normalized() {
                spring += dir.scale(cfg.spring_constant * (delta.length() - cfg.rest_length));
            }
        }

        let mut push = Vec2::ZERO;
        for j in 0..self.bodies.len() {
            if j == i {
                continue;
            }
            if let Some(depth) = self.penetration(i, j) {
                push += self.separation(i, j).scale(cfg.repulsion * depth);
            }
        }

        spring.scale(step) + push
    }

    /// Clearance-inflated overlap depth of a pair, if any.
    fn penetration(&self, i: usize, j: usize) -> Option<f64> {
        let (a, b) = (self.bodies[i], self.bodies[j]);
        let delta = a.center - b.center;
        let ox = a.half.x + b.half.x + self.config.clearance - delta.x.abs();
        let oy = a.half.y + b.half.y + self.config.clearance - delta.y.abs();
        (ox > 0.0 && oy > 0.0).then(|| ox.min(oy))
    }

    /// Unit direction pushing `i` away from `j`. Opposite for `(j, i)`.
    fn separation(&self, i: usize, j: usize) -> Vec2 {
        let delta = self.bodies[i].center - self.bodies[j].center;
        if let Some(dir) = delta.normalized() {
            return dir;
        }
        // Coincident centers: the lower index moves away from the centroid
        // (or along a fixed angle if it sits on it), the other the opposite way.
        let (low, sign) = if i < j { (i, 1.0) } else { (j, -1.0) };
        let dir = (self.bodies[low].center - self.centroid)
            .normalized()
            .unwrap_or_else(|| {
                let angle = low as f64 * GOLDEN_ANGLE;
                Vec2::new(angle.cos(), angle.sin())
            });
        dir.scale(sign)
    }

    fn conflicts(&self) -> usize {
        let n = self.bodies.len();
        (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| {
                self.penetration(i, j)
                    .is_some_and(|depth| depth > CONFLICT_TOLERANCE)
            })
            .count()
    }
}

// ---------------------------------------------------------------------------
// Relaxer
// ---------------------------------------------------------------------------

/// Relax the layout in place. See the module docs for the model.
pub fn relax(layout: &mut Layout, config: &RelaxConfig) -> Result<RelaxReport, LayoutError> {
    let ids: Vec<MachineId> = layout.machines().map(|(id, _)| id).collect();
    let mut index: SecondaryMap<MachineId, usize> = SecondaryMap::new();
    for (i, &id) in ids.iter().enumerate() {
        index.insert(id, i);
    }

    let mut springs = vec![Vec::new(); ids.len()];
    for (_, conn) in layout.connections() {
        if let (Some(&a), Some(&b)) = (index.get(conn.consumer), index.get(conn.producer)) {
            springs[a].push(b);
            springs[b].push(a);
        }
    }

    let bounds = layout.bounds();
    let mut step = config.initial_step;
    let mut max_displacement = 0.0;

    for iteration in 1..=config.max_iterations {
        let snapshot = take_snapshot(layout, &ids, &springs, config);

        #[cfg(feature = "parallel")]
        let moves: Vec<Vec2> = (0..ids.len())
            .into_par_iter()
            .map(|i| snapshot.displacement(i, step))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let moves: Vec<Vec2> = (0..ids.len())
            .map(|i| snapshot.displacement(i, step))
            .collect();

        max_displacement = 0.0;
        for (&id, delta) in ids.iter().zip(moves) {
            let Some(machine) = layout.machine_mut(id) else {
                continue;
            };
            let max_x = (bounds.width as f64 - machine.footprint.width as f64).max(0.0);
            let max_y = (bounds.height as f64 - machine.footprint.height as f64).max(0.0);
            let old = machine.position;
            machine.position = Vec2::new(
                (old.x + delta.x).clamp(0.0, max_x),
                (old.y + delta.y).clamp(0.0, max_y),
            );
            max_displacement = f64::max(max_displacement, (machine.position - old).length());
        }
        step *= config.step_decay;

        if max_displacement < config.convergence_threshold
            && take_snapshot(layout, &ids, &springs, config).conflicts() == 0
        {
            let report = RelaxReport {
                iterations: iteration,
                max_displacement,
                total_connection_length: layout.total_connection_length(),
            };
            tracing::debug!(
                iterations = report.iterations,
                length = report.total_connection_length,
                "relaxation converged"
            );
            return Ok(report);
        }

        if iteration % 1000 == 0 {
            tracing::debug!(iteration, max_displacement, step, "relaxing");
        }
    }

    let conflicts = take_snapshot(layout, &ids, &springs, config).conflicts();
    tracing::warn!(
        iterations = config.max_iterations,
        max_displacement,
        conflicts,
        "relaxation hit the iteration cap"
    );
    Err(LayoutError::NonConvergence {
        iterations: config.max_iterations,
        max_displacement,
        conflicts,
    })
}

fn take_snapshot<'a>(
    layout: &Layout,
    ids: &[MachineId],
    springs: &'a [Vec<usize>],
    config: &'a RelaxConfig,
) -> Snapshot<'a> {
    let bodies: Vec<Body> = ids
        .iter()
        .filter_map(|&id| layout.machine(id))
        .map(|m| Body {
            center: m.center(),
            half: Vec2::new(m.footprint.width as f64 / 2.0, m.footprint.height as f64 / 2.0),
        })
        .collect();
    let centroid = if bodies.is_empty() {
        Vec2::ZERO
    } else {
        let sum = bodies.iter().fold(Vec2::ZERO, |acc, b| acc + b.center);
        sum.scale(1.0 / bodies.len() as f64)
    };
    Snapshot {
        bodies,
        centroid,
        springs,
        config,
    }
}
