//! Dependency resolution: for every item a machine consumes, find the one
//! machine in the layout that produces it.

use crate::error::LayoutError;
use crate::layout::{Layout, MachineId};
use crate::model::ProductionModel;
use factorial_core::id::ItemTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do when more than one machine produces a consumed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerPolicy {
    /// Fail with [`LayoutError::AmbiguousProducer`].
    #[default]
    Strict,
    /// Pick the candidate that already supplies the most consumers; ties go
    /// to the earliest-placed machine.
    MostUtilized,
}

/// An input with no producer in the layout; it has to be fed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalInput {
    pub consumer: MachineId,
    pub item: ItemTypeId,
}

/// Outcome of [`resolve_dependencies`].
#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    /// Connections created, one per (consumer, producer) pair no matter how
    /// many items the pair shares.
    pub connected: usize,
    /// Inputs nothing in the layout produces.
    pub external_inputs: Vec<ExternalInput>,
}

/// Connect every machine to the producers of its inputs.
///
/// Replaces any connections already in the layout. A machine never supplies
/// itself. On error the layout keeps no connections.
pub fn resolve_dependencies<M: ProductionModel>(
    layout: &mut Layout,
    model: &M,
    policy: ProducerPolicy,
) -> Result<ResolveReport, LayoutError> {
    layout.clear_connections();

    // Outputs per machine, computed once.
    let producers: Vec<(MachineId, _)> = layout
        .machines()
        .map(|(id, m)| (id, model.outputs(m.machine_type)))
        .collect();
    let consumers: Vec<(MachineId, _)> = layout
        .machines()
        .map(|(id, m)| (id, model.inputs(m.machine_type)))
        .collect();

    let mut planned: Vec<(MachineId, MachineId, ItemTypeId)> = Vec::new();
    let mut utilization: BTreeMap<MachineId, usize> = BTreeMap::new();
    let mut report = ResolveReport::default();

    for (consumer, inputs) in &consumers {
        for &item in inputs {
            let candidates: Vec<MachineId> = producers
                .iter()
                .filter(|(id, outputs)| id != consumer && outputs.contains(&item))
                .map(|(id, _)| *id)
                .collect();

            let producer = match candidates.as_slice() {
                [] => {
                    tracing::debug!(?consumer, ?item, "external input");
                    report.external_inputs.push(ExternalInput {
                        consumer: *consumer,
                        item,
                    });
                    continue;
                }
                [only] => *only,
                _ => match policy {
                    ProducerPolicy::Strict => {
                        return Err(LayoutError::AmbiguousProducer {
                            consumer: *consumer,
                            item,
                            candidates,
                        });
                    }
                    ProducerPolicy::MostUtilized => {
                        let chosen = most_utilized(&candidates, &utilization);
                        tracing::warn!(
                            ?consumer,
                            ?item,
                            candidates = candidates.len(),
                            ?chosen,
                            "ambiguous producer resolved by utilization"
                        );
                        chosen
                    }
                },
            };

            // Utilization counts consumers, not items.
            if !planned
                .iter()
                .any(|&(c, p, _)| c == *consumer && p == producer)
            {
                *utilization.entry(producer).or_default() += 1;
            }
            planned.push((*consumer, producer, item));
        }
    }

    for (consumer, producer, item) in planned {
        layout.connect(consumer, producer, item)?;
    }
    report.connected = layout.connection_count();

    tracing::debug!(
        connections = report.connected,
        external = report.external_inputs.len(),
        "resolved dependencies"
    );
    Ok(report)
}

/// Candidate with the highest utilization; the first one wins ties.
fn most_utilized(candidates: &[MachineId], utilization: &BTreeMap<MachineId, usize>) -> MachineId {
    let mut best = candidates[0];
    let mut best_count = utilization.get(&best).copied().unwrap_or(0);
    for &candidate in &candidates[1..] {
        let count = utilization.get(&candidate).copied().unwrap_or(0);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}
