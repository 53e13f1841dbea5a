//! Resolution pipeline: reads data files, resolves cross-references, builds
//! the registry and the machine list of the production plan.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_layout_data`] which ties them
//! together.

use crate::schema::*;
use factorial_core::id::{ItemTypeId, MachineTypeId, RecipeId};
use factorial_core::registry::{RecipeEntry, Registry, RegistryBuilder, RegistryError};
use factorial_layout::LayoutConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions do not form a valid registry.
    #[error("invalid production model: {0}")]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML files hold the array under
/// `toml_key` in a top-level table; RON and JSON hold it directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<V: Copy>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<V, DataLoadError> {
    map.get(name)
        .copied()
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_string(),
            expected_kind,
        })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything needed to run a layout, loaded from one directory.
#[derive(Debug)]
pub struct LayoutData {
    pub registry: Registry,
    /// One entry per machine instance, in plan order.
    pub plan: Vec<MachineTypeId>,
    pub config: LayoutConfig,
}

/// Load `items`, `recipes`, `machines` and `plan` (all required) and
/// `layout` (optional; defaults otherwise) from `dir`.
///
/// Each file may be `.ron`, `.toml` or `.json`. Names are resolved in that
/// order, so recipes may only mention known items and machines known
/// recipes.
pub fn load_layout_data(dir: &Path) -> Result<LayoutData, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    // Items.
    let items_path = require_data_file(dir, "items")?;
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    let mut item_ids: HashMap<String, ItemTypeId> = HashMap::new();
    for item in &items {
        check_duplicate(&item_ids, &item.name, &items_path)?;
        item_ids.insert(item.name.clone(), builder.register_item(&item.name));
    }

    // Recipes.
    let recipes_path = require_data_file(dir, "recipes")?;
    let recipes: Vec<RecipeData> = deserialize_list(&recipes_path, "recipes")?;
    let mut recipe_ids: HashMap<String, RecipeId> = HashMap::new();
    for recipe in &recipes {
        check_duplicate(&recipe_ids, &recipe.name, &recipes_path)?;
        let resolve = |entries: &[RecipeEntryData]| {
            entries
                .iter()
                .map(|e| {
                    Ok(RecipeEntry {
                        item: resolve_name(&item_ids, e.item(), &recipes_path, "item")?,
                        quantity: e.quantity(),
                    })
                })
                .collect::<Result<Vec<_>, DataLoadError>>()
        };
        let id = builder.register_recipe(
            &recipe.name,
            resolve(&recipe.inputs)?,
            resolve(&recipe.outputs)?,
        );
        recipe_ids.insert(recipe.name.clone(), id);
    }

    // Machine templates.
    let machines_path = require_data_file(dir, "machines")?;
    let machines: Vec<MachineData> = deserialize_list(&machines_path, "machines")?;
    let mut machine_ids: HashMap<String, MachineTypeId> = HashMap::new();
    for machine in &machines {
        check_duplicate(&machine_ids, &machine.name, &machines_path)?;
        let recipe = machine
            .recipe
            .as_deref()
            .map(|name| resolve_name(&recipe_ids, name, &machines_path, "recipe"))
            .transpose()?;
        let id = builder.register_machine(
            &machine.name,
            machine.entity.as_deref().unwrap_or(&machine.name),
            machine.footprint.width,
            machine.footprint.height,
            recipe,
        );
        machine_ids.insert(machine.name.clone(), id);
    }

    // Plan.
    let plan_path = require_data_file(dir, "plan")?;
    let entries: Vec<PlanEntryData> = deserialize_list(&plan_path, "plan")?;
    let mut plan = Vec::new();
    for entry in &entries {
        let id = resolve_name(&machine_ids, &entry.machine, &plan_path, "machine")?;
        plan.extend(std::iter::repeat_n(id, entry.count as usize));
    }

    // Layout settings.
    let config = match find_data_file(dir, "layout")? {
        Some(path) => deserialize_file(&path)?,
        None => LayoutConfig::default(),
    };

    let registry = builder.build()?;
    tracing::debug!(
        items = registry.item_count(),
        recipes = registry.recipe_count(),
        machines = registry.machine_count(),
        planned = plan.len(),
        "loaded layout data"
    );
    Ok(LayoutData {
        registry,
        plan,
        config,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use factorial_layout::{ProducerPolicy, RouterKind};
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "factorial_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    /// Write the circuit chain in RON.
    fn write_circuit_chain(dir: &Path) {
        fs::write(
            dir.join("items.ron"),
            r#"[(name: "iron-plate"), (name: "copper-plate"), (name: "copper-cable"), (name: "electronic-circuit")]"#,
        )
        .unwrap();
        fs::write(
            dir.join("recipes.ron"),
            r#"[
                (name: "copper-cable", inputs: [("copper-plate", 1)], outputs: [("copper-cable", 2)]),
                (name: "electronic-circuit",
                 inputs: [("iron-plate", 1), ("copper-cable", 3)],
                 outputs: [("electronic-circuit", 1)]),
            ]"#,
        )
        .unwrap();
        fs::write(
            dir.join("machines.ron"),
            r#"[
                (name: "cable-assembler", entity: Some("assembling-machine-1"), recipe: Some("copper-cable")),
                (name: "circuit-assembler", entity: Some("assembling-machine-1"), recipe: Some("electronic-circuit")),
            ]"#,
        )
        .unwrap();
        fs::write(
            dir.join("plan.ron"),
            r#"[(machine: "cable-assembler", count: 2), (machine: "circuit-assembler")]"#,
        )
        .unwrap();
    }

    // -----------------------------------------------------------------------
    // Format detection and discovery
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("items.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("items")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "items").unwrap(), None);

        fs::write(dir.join("items.json"), "[]").unwrap();
        assert_eq!(
            find_data_file(&dir, "items").unwrap(),
            Some(dir.join("items.json"))
        );

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        let result = find_data_file(&dir, "items");
        assert!(matches!(
            result,
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");

        let result = require_data_file(&dir, "plan");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "plan"
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_all_formats() {
        let dir = make_test_dir("list_formats");
        let ron_path = dir.join("a.ron");
        fs::write(&ron_path, r#"[(name: "iron-plate"), (name: "gear")]"#).unwrap();
        let json_path = dir.join("b.json");
        fs::write(&json_path, r#"[{"name": "iron-plate"}, {"name": "gear"}]"#).unwrap();
        let toml_path = dir.join("c.toml");
        fs::write(
            &toml_path,
            r#"
[[items]]
name = "iron-plate"

[[items]]
name = "gear"
"#,
        )
        .unwrap();

        for path in [&ron_path, &json_path, &toml_path] {
            let items: Vec<ItemData> = deserialize_list(path, "items").unwrap();
            assert_eq!(items.len(), 2, "{path:?}");
            assert_eq!(items[1].name, "gear");
        }

        let wrapper: TomlItems = deserialize_file(&toml_path).unwrap();
        assert_eq!(wrapper.items.len(), 2);

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("items.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        match result {
            Err(DataLoadError::Parse { file, .. }) => assert_eq!(file, path),
            other => panic!("expected Parse, got: {other:?}"),
        }

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Name resolution
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_and_duplicate_checks() {
        let mut map = HashMap::new();
        map.insert("iron-plate".to_string(), 42u32);

        assert_eq!(
            resolve_name(&map, "iron-plate", Path::new("recipes.ron"), "item").unwrap(),
            42
        );
        assert!(matches!(
            resolve_name(&map, "gear", Path::new("recipes.ron"), "item"),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "item", .. }) if name == "gear"
        ));
        assert!(check_duplicate(&map, "gear", Path::new("items.ron")).is_ok());
        assert!(matches!(
            check_duplicate(&map, "iron-plate", Path::new("items.ron")),
            Err(DataLoadError::DuplicateName { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // load_layout_data
    // -----------------------------------------------------------------------

    #[test]
    fn loads_circuit_chain() {
        let dir = make_test_dir("load_chain");
        write_circuit_chain(&dir);

        let data = load_layout_data(&dir).unwrap();

        assert_eq!(data.registry.item_count(), 4);
        assert_eq!(data.registry.recipe_count(), 2);
        assert_eq!(data.registry.machine_count(), 2);

        let cable = data.registry.machine_id("cable-assembler").unwrap();
        let circuit = data.registry.machine_id("circuit-assembler").unwrap();
        assert_eq!(data.plan, vec![cable, cable, circuit]);

        let def = data.registry.get_machine(circuit).unwrap();
        assert_eq!(def.entity, "assembling-machine-1");
        assert_eq!((def.width, def.height), (3, 3));
        let recipe = data.registry.machine_recipe(circuit).unwrap();
        assert_eq!(recipe.inputs[1].quantity, 3);

        assert_eq!(data.config, LayoutConfig::default());

        cleanup(&dir);
    }

    #[test]
    fn layout_config_is_optional_and_partial() {
        let dir = make_test_dir("load_config");
        write_circuit_chain(&dir);
        fs::write(
            dir.join("layout.toml"),
            r#"
seed = 9
producer_policy = "most_utilized"

[site]
width = 64
height = 48

[router]
kind = "a_star"
"#,
        )
        .unwrap();

        let data = load_layout_data(&dir).unwrap();
        assert_eq!(data.config.seed, 9);
        assert_eq!(data.config.producer_policy, ProducerPolicy::MostUtilized);
        assert_eq!(data.config.site.width, 64);
        assert_eq!(data.config.router.kind, RouterKind::AStar);
        assert_eq!(data.config.relax.max_iterations, 10_000);

        cleanup(&dir);
    }

    #[test]
    fn unknown_item_in_recipe() {
        let dir = make_test_dir("load_bad_item");
        write_circuit_chain(&dir);
        fs::write(
            dir.join("recipes.ron"),
            r#"[(name: "gear", inputs: [("iron-plate", 2)], outputs: [("gear", 1)])]"#,
        )
        .unwrap();

        let result = load_layout_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "item", .. }) if name == "gear"
        ));

        cleanup(&dir);
    }

    #[test]
    fn unknown_machine_in_plan() {
        let dir = make_test_dir("load_bad_plan");
        write_circuit_chain(&dir);
        fs::remove_file(dir.join("plan.ron")).unwrap();
        fs::write(dir.join("plan.json"), r#"[{"machine": "smelter"}]"#).unwrap();

        let result = load_layout_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "machine", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn duplicate_item_rejected() {
        let dir = make_test_dir("load_dup");
        write_circuit_chain(&dir);
        fs::write(
            dir.join("items.ron"),
            r#"[(name: "iron-plate"), (name: "iron-plate")]"#,
        )
        .unwrap();

        assert!(matches!(
            load_layout_data(&dir),
            Err(DataLoadError::DuplicateName { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn empty_footprint_rejected_by_registry() {
        let dir = make_test_dir("load_empty_fp");
        write_circuit_chain(&dir);
        fs::write(
            dir.join("machines.json"),
            r#"[{"name": "flat", "footprint": {"width": 0, "height": 3}}]"#,
        )
        .unwrap();
        fs::remove_file(dir.join("machines.ron")).unwrap();
        fs::write(dir.join("plan.ron"), r#"[(machine: "flat")]"#).unwrap();

        assert!(matches!(
            load_layout_data(&dir),
            Err(DataLoadError::Registry(RegistryError::EmptyFootprint(_)))
        ));

        cleanup(&dir);
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
        assert!(format!("{data_err}").contains("file not found"));
    }
}
