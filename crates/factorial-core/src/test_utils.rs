//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::id::*;
use crate::registry::*;

// ===========================================================================
// Recipe helpers
// ===========================================================================

/// One-of-each recipe entries for a list of items.
pub fn entries(items: &[ItemTypeId]) -> Vec<RecipeEntry> {
    items
        .iter()
        .map(|&item| RecipeEntry { item, quantity: 1 })
        .collect()
}

// ===========================================================================
// Electronic circuit chain
// ===========================================================================

/// Handles into the circuit-chain registry built by [`circuit_chain`].
#[derive(Debug, Clone, Copy)]
pub struct CircuitChain {
    pub iron_plate: ItemTypeId,
    pub copper_plate: ItemTypeId,
    pub copper_cable: ItemTypeId,
    pub gear: ItemTypeId,
    pub circuit: ItemTypeId,
    pub cable_assembler: MachineTypeId,
    pub gear_assembler: MachineTypeId,
    pub circuit_assembler: MachineTypeId,
    /// A second template producing copper cable, for ambiguity tests.
    pub cable_assembler_2: MachineTypeId,
}

/// Build a small production model: plates are external inputs, cable and
/// gears are intermediates, circuits are the product. Every machine is a 3x3
/// assembler.
pub fn circuit_chain() -> (Registry, CircuitChain) {
    let mut b = RegistryBuilder::new();
    let iron_plate = b.register_item("iron-plate");
    let copper_plate = b.register_item("copper-plate");
    let copper_cable = b.register_item("copper-cable");
    let gear = b.register_item("iron-gear-wheel");
    let circuit = b.register_item("electronic-circuit");

    let cable_recipe =
        b.register_recipe("copper-cable", entries(&[copper_plate]), entries(&[copper_cable]));
    let gear_recipe = b.register_recipe("iron-gear-wheel", entries(&[iron_plate]), entries(&[gear]));
    let circuit_recipe = b.register_recipe(
        "electronic-circuit",
        entries(&[iron_plate, copper_cable]),
        entries(&[circuit]),
    );

    let cable_assembler =
        b.register_machine("cable-assembler", "assembling-machine-1", 3, 3, Some(cable_recipe));
    let gear_assembler =
        b.register_machine("gear-assembler", "assembling-machine-1", 3, 3, Some(gear_recipe));
    let circuit_assembler = b.register_machine(
        "circuit-assembler",
        "assembling-machine-1",
        3,
        3,
        Some(circuit_recipe),
    );
    let cable_assembler_2 =
        b.register_machine("cable-assembler-2", "assembling-machine-2", 3, 3, Some(cable_recipe));

    let registry = b.build().expect("circuit chain registry is valid");
    (
        registry,
        CircuitChain {
            iron_plate,
            copper_plate,
            copper_cable,
            gear,
            circuit,
            cable_assembler,
            gear_assembler,
            circuit_assembler,
            cable_assembler_2,
        },
    )
}

/// A registry with a single recipe-less 3x3 machine template, for pure
/// repulsion tests. Returns the registry and the template id.
pub fn plain_machines() -> (Registry, MachineTypeId) {
    let mut b = RegistryBuilder::new();
    let id = b.register_machine("idle-assembler", "assembling-machine-1", 3, 3, None);
    let registry = b.build().expect("plain registry is valid");
    (registry, id)
}

// ===========================================================================
// Two-output producer
// ===========================================================================

/// Handles into the registry built by [`split_join`].
#[derive(Debug, Clone, Copy)]
pub struct SplitJoin {
    pub ore: ItemTypeId,
    pub light: ItemTypeId,
    pub heavy: ItemTypeId,
    pub product: ItemTypeId,
    /// Turns ore into both fractions.
    pub splitter: MachineTypeId,
    /// Consumes both fractions.
    pub joiner: MachineTypeId,
}

/// A producer whose recipe yields two items that one consumer needs both of.
pub fn split_join() -> (Registry, SplitJoin) {
    let mut b = RegistryBuilder::new();
    let ore = b.register_item("ore");
    let light = b.register_item("light-fraction");
    let heavy = b.register_item("heavy-fraction");
    let product = b.register_item("alloy");

    let split = b.register_recipe("split", entries(&[ore]), entries(&[light, heavy]));
    let join = b.register_recipe("join", entries(&[light, heavy]), entries(&[product]));
    let splitter = b.register_machine("splitter", "assembling-machine-1", 3, 3, Some(split));
    let joiner = b.register_machine("joiner", "assembling-machine-1", 3, 3, Some(join));

    let registry = b.build().expect("split/join registry is valid");
    (
        registry,
        SplitJoin {
            ore,
            light,
            heavy,
            product,
            splitter,
            joiner,
        },
    )
}
