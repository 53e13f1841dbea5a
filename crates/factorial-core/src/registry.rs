use crate::id::*;
use std::collections::{BTreeSet, HashMap};

/// An item type definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemTypeDef {
    pub name: String,
}

/// A recipe input/output entry.
#[derive(Debug, Clone)]
pub struct RecipeEntry {
    pub item: ItemTypeId,
    pub quantity: u32,
}

/// A recipe definition.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    pub inputs: Vec<RecipeEntry>,
    pub outputs: Vec<RecipeEntry>,
}

impl RecipeDef {
    /// Distinct item types consumed by this recipe.
    pub fn input_items(&self) -> BTreeSet<ItemTypeId> {
        self.inputs.iter().map(|e| e.item).collect()
    }

    /// Distinct item types produced by this recipe.
    pub fn output_items(&self) -> BTreeSet<ItemTypeId> {
        self.outputs.iter().map(|e| e.item).collect()
    }
}

/// A machine template definition: footprint plus the recipe it is set to.
///
/// `name` is the template key (unique per registry); `entity` is the
/// prototype placed on the site, shared by every template built from the
/// same kind of machine.
#[derive(Debug, Clone)]
pub struct MachineTypeDef {
    pub name: String,
    pub entity: String,
    pub width: u32,
    pub height: u32,
    pub recipe: Option<RecipeId>,
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug)]
pub struct RegistryBuilder {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    machines: Vec<MachineTypeDef>,
    machine_name_to_id: HashMap<String, MachineTypeId>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            item_name_to_id: HashMap::new(),
            recipes: Vec::new(),
            recipe_name_to_id: HashMap::new(),
            machines: Vec::new(),
            machine_name_to_id: HashMap::new(),
        }
    }

    /// Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemTypeDef {
            name: name.to_string(),
        });
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a recipe. Returns its ID.
    pub fn register_recipe(
        &mut self,
        name: &str,
        inputs: Vec<RecipeEntry>,
        outputs: Vec<RecipeEntry>,
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            inputs,
            outputs,
        });
        self.recipe_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a machine template. Returns its ID.
    pub fn register_machine(
        &mut self,
        name: &str,
        entity: &str,
        width: u32,
        height: u32,
        recipe: Option<RecipeId>,
    ) -> MachineTypeId {
        let id = MachineTypeId(self.machines.len() as u32);
        self.machines.push(MachineTypeDef {
            name: name.to_string(),
            entity: entity.to_string(),
            width,
            height,
            recipe,
        });
        self.machine_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Lookup item type ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Lookup recipe ID by name.
    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Lookup machine template ID by name.
    pub fn machine_id(&self, name: &str) -> Option<MachineTypeId> {
        self.machine_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        // Validate: all recipe item references must exist
        for recipe in &self.recipes {
            for entry in recipe.inputs.iter().chain(recipe.outputs.iter()) {
                if entry.item.0 as usize >= self.items.len() {
                    return Err(RegistryError::InvalidItemRef(entry.item));
                }
            }
        }
        for machine in &self.machines {
            if let Some(recipe) = machine.recipe
                && recipe.0 as usize >= self.recipes.len()
            {
                return Err(RegistryError::InvalidRecipeRef(recipe));
            }
            if machine.width == 0 || machine.height == 0 {
                return Err(RegistryError::EmptyFootprint(machine.name.clone()));
            }
        }

        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            machines: self.machines,
            machine_name_to_id: self.machine_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    machines: Vec<MachineTypeDef>,
    machine_name_to_id: HashMap<String, MachineTypeId>,
}

impl Registry {
    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get_machine(&self, id: MachineTypeId) -> Option<&MachineTypeDef> {
        self.machines.get(id.0 as usize)
    }

    /// The recipe a machine template is set to, if any.
    pub fn machine_recipe(&self, id: MachineTypeId) -> Option<&RecipeDef> {
        self.get_machine(id)
            .and_then(|m| m.recipe)
            .and_then(|r| self.get_recipe(r))
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineTypeId> {
        self.machine_name_to_id.get(name).copied()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("invalid recipe reference: {0:?}")]
    InvalidRecipeRef(RecipeId),
    #[error("machine '{0}' has an empty footprint")]
    EmptyFootprint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> RegistryBuilder {
        let mut b = RegistryBuilder::new();
        let iron_ore = b.register_item("iron-ore");
        let iron_plate = b.register_item("iron-plate");
        b.register_recipe(
            "iron-plate",
            vec![RecipeEntry {
                item: iron_ore,
                quantity: 1,
            }],
            vec![RecipeEntry {
                item: iron_plate,
                quantity: 1,
            }],
        );
        b.register_machine("iron-smelter", "stone-furnace", 2, 2, b.recipe_id("iron-plate"));
        b
    }

    #[test]
    fn register_and_build() {
        let builder = setup_builder();
        let reg = builder.build().unwrap();
        assert_eq!(reg.item_count(), 2);
        assert_eq!(reg.recipe_count(), 1);
        assert_eq!(reg.machine_count(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let builder = setup_builder();
        let reg = builder.build().unwrap();
        assert!(reg.item_id("iron-ore").is_some());
        assert!(reg.item_id("nonexistent").is_none());
        assert!(reg.machine_id("iron-smelter").is_some());
    }

    #[test]
    fn machine_recipe_resolves_items() {
        let reg = setup_builder().build().unwrap();
        let furnace = reg.machine_id("iron-smelter").unwrap();
        let recipe = reg.machine_recipe(furnace).unwrap();
        assert_eq!(
            recipe.input_items().into_iter().collect::<Vec<_>>(),
            vec![reg.item_id("iron-ore").unwrap()]
        );
        assert_eq!(
            recipe.output_items().into_iter().collect::<Vec<_>>(),
            vec![reg.item_id("iron-plate").unwrap()]
        );
    }

    #[test]
    fn machine_without_recipe_has_none() {
        let mut b = setup_builder();
        let chest = b.register_machine("buffer", "wooden-chest", 1, 1, None);
        let reg = b.build().unwrap();
        assert!(reg.machine_recipe(chest).is_none());
    }

    #[test]
    fn duplicate_item_entries_collapse_to_set() {
        let mut b = RegistryBuilder::new();
        let plate = b.register_item("iron-plate");
        let gear = b.register_item("iron-gear-wheel");
        let recipe = b.register_recipe(
            "odd",
            vec![
                RecipeEntry {
                    item: plate,
                    quantity: 1,
                },
                RecipeEntry {
                    item: plate,
                    quantity: 1,
                },
            ],
            vec![RecipeEntry {
                item: gear,
                quantity: 1,
            }],
        );
        let reg = b.build().unwrap();
        assert_eq!(reg.get_recipe(recipe).unwrap().input_items().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Error path tests
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_item_ref_error_variant() {
        let mut b = RegistryBuilder::new();
        b.register_recipe(
            "bad_output",
            vec![],
            vec![RecipeEntry {
                item: ItemTypeId(999),
                quantity: 1,
            }],
        );
        match b.build() {
            Err(RegistryError::InvalidItemRef(id)) => {
                assert_eq!(id, ItemTypeId(999));
                let msg = format!("{}", RegistryError::InvalidItemRef(id));
                assert!(msg.contains("invalid item reference"), "got: {msg}");
            }
            other => panic!("expected InvalidItemRef, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_recipe_ref_fails() {
        let mut b = RegistryBuilder::new();
        b.register_machine("gears", "assembling-machine-1", 3, 3, Some(RecipeId(7)));
        assert!(matches!(
            b.build(),
            Err(RegistryError::InvalidRecipeRef(RecipeId(7)))
        ));
    }

    #[test]
    fn empty_footprint_fails() {
        let mut b = RegistryBuilder::new();
        b.register_machine("ghost", "assembling-machine-1", 0, 3, None);
        assert!(matches!(b.build(), Err(RegistryError::EmptyFootprint(_))));
    }

    #[test]
    fn registry_get_nonexistent_returns_none() {
        let reg = setup_builder().build().unwrap();
        assert!(reg.get_recipe(RecipeId(999)).is_none());
        assert!(reg.get_machine(MachineTypeId(999)).is_none());
        assert!(reg.machine_recipe(MachineTypeId(999)).is_none());
    }

    #[test]
    fn empty_registry_builds_successfully() {
        let reg = RegistryBuilder::new().build().unwrap();
        assert_eq!(reg.item_count(), 0);
        assert_eq!(reg.recipe_count(), 0);
        assert_eq!(reg.machine_count(), 0);
    }
}
