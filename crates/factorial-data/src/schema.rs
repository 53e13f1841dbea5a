//! Serde data file structs for the production model and the plan.
//!
//! These structs define the on-disk format for items, recipes, machine
//! templates and the production plan. They are deserialized from RON, JSON,
//! or TOML data files and then resolved into registry types by the loader.

use serde::Deserialize;

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe ingredient or product, in short tuple form or full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeEntryData {
    /// Short form: `("item_name", quantity)`.
    Short(String, u32),
    /// Full form; quantity defaults to one.
    Full {
        item: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
}

impl RecipeEntryData {
    pub fn item(&self) -> &str {
        match self {
            RecipeEntryData::Short(item, _) | RecipeEntryData::Full { item, .. } => item,
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            RecipeEntryData::Short(_, quantity) | RecipeEntryData::Full { quantity, .. } => {
                *quantity
            }
        }
    }
}

fn default_quantity() -> u32 {
    1
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<RecipeEntryData>,
    pub outputs: Vec<RecipeEntryData>,
}

// ===========================================================================
// Machines
// ===========================================================================

/// A machine template in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub name: String,
    /// Entity placed on the site; the template name when omitted.
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default = "default_footprint")]
    pub footprint: FootprintData,
    /// Name of the recipe the machine runs.
    #[serde(default)]
    pub recipe: Option<String>,
}

/// The footprint (size) of a machine on the grid.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FootprintData {
    pub width: u32,
    pub height: u32,
}

fn default_footprint() -> FootprintData {
    FootprintData {
        width: 3,
        height: 3,
    }
}

// ===========================================================================
// Plan
// ===========================================================================

/// How many instances of a machine template the layout needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanEntryData {
    pub machine: String,
    #[serde(default = "default_quantity")]
    pub count: u32,
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// TOML wrapper for items (TOML requires a top-level table).
#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_entries_accept_both_forms() {
        let recipe: RecipeData = ron::from_str(
            r#"(
                name: "circuit",
                inputs: [("iron-plate", 1), (item: "copper-cable", quantity: 3)],
                outputs: [(item: "electronic-circuit")],
            )"#,
        )
        .unwrap();

        assert_eq!(recipe.inputs[0].item(), "iron-plate");
        assert_eq!(recipe.inputs[0].quantity(), 1);
        assert_eq!(recipe.inputs[1].item(), "copper-cable");
        assert_eq!(recipe.inputs[1].quantity(), 3);
        assert_eq!(recipe.outputs[0].quantity(), 1);
    }

    #[test]
    fn machine_defaults() {
        let machine: MachineData = serde_json::from_str(r#"{ "name": "assembler" }"#).unwrap();
        assert!(machine.entity.is_none());
        assert!(machine.recipe.is_none());
        assert_eq!(machine.footprint.width, 3);
        assert_eq!(machine.footprint.height, 3);
    }

    #[test]
    fn plan_count_defaults_to_one() {
        let plan: Vec<PlanEntryData> =
            serde_json::from_str(r#"[{ "machine": "a" }, { "machine": "b", "count": 4 }]"#)
                .unwrap();
        assert_eq!(plan[0].count, 1);
        assert_eq!(plan[1].count, 4);
    }
}
