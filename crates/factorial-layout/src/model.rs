//! The production model as the layout engine sees it: per machine template,
//! a footprint, an entity name, and the item sets its recipe consumes and
//! produces.

use factorial_core::id::{ItemTypeId, MachineTypeId, RecipeId};
use factorial_core::registry::Registry;
use factorial_spatial::BuildingFootprint;
use std::collections::BTreeSet;

/// Read-only queries the layout engine makes against the recipe database.
pub trait ProductionModel {
    /// Footprint of a machine template, or `None` if the template is unknown.
    fn footprint(&self, machine: MachineTypeId) -> Option<BuildingFootprint>;

    /// Entity name placed on the site for this template.
    fn entity_name(&self, machine: MachineTypeId) -> Option<&str>;

    /// The recipe the machine runs, if any.
    fn recipe(&self, machine: MachineTypeId) -> Option<RecipeId>;

    /// Items the machine's recipe consumes. Empty without a recipe.
    fn inputs(&self, machine: MachineTypeId) -> BTreeSet<ItemTypeId>;

    /// Items the machine's recipe produces. Empty without a recipe.
    fn outputs(&self, machine: MachineTypeId) -> BTreeSet<ItemTypeId>;
}

impl ProductionModel for Registry {
    fn footprint(&self, machine: MachineTypeId) -> Option<BuildingFootprint> {
        self.get_machine(machine)
            .map(|m| BuildingFootprint::new(m.width, m.height))
    }

    fn entity_name(&self, machine: MachineTypeId) -> Option<&str> {
        self.get_machine(machine).map(|m| m.entity.as_str())
    }

    fn recipe(&self, machine: MachineTypeId) -> Option<RecipeId> {
        self.get_machine(machine).and_then(|m| m.recipe)
    }

    fn inputs(&self, machine: MachineTypeId) -> BTreeSet<ItemTypeId> {
        self.machine_recipe(machine)
            .map(|r| r.input_items())
            .unwrap_or_default()
    }

    fn outputs(&self, machine: MachineTypeId) -> BTreeSet<ItemTypeId> {
        self.machine_recipe(machine)
            .map(|r| r.output_items())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorial_core::test_utils::{circuit_chain, plain_machines};

    #[test]
    fn registry_exposes_footprint_and_name() {
        let (reg, chain) = circuit_chain();
        assert_eq!(
            reg.footprint(chain.gear_assembler),
            Some(BuildingFootprint::new(3, 3))
        );
        assert_eq!(
            reg.entity_name(chain.gear_assembler),
            Some("assembling-machine-1")
        );
        assert!(reg.recipe(chain.gear_assembler).is_some());
    }

    #[test]
    fn registry_exposes_recipe_items() {
        let (reg, chain) = circuit_chain();
        let inputs = reg.inputs(chain.circuit_assembler);
        assert!(inputs.contains(&chain.iron_plate));
        assert!(inputs.contains(&chain.copper_cable));
        assert_eq!(inputs.len(), 2);
        assert_eq!(
            reg.outputs(chain.circuit_assembler),
            BTreeSet::from([chain.circuit])
        );
    }

    #[test]
    fn no_recipe_means_no_items() {
        let (reg, idle) = plain_machines();
        assert!(reg.inputs(idle).is_empty());
        assert!(reg.outputs(idle).is_empty());
        assert!(reg.recipe(idle).is_none());
    }

    #[test]
    fn unknown_template_has_no_footprint() {
        let (reg, _) = plain_machines();
        assert!(reg.footprint(MachineTypeId(42)).is_none());
        assert!(reg.entity_name(MachineTypeId(42)).is_none());
    }
}
