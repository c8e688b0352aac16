//! Catalog import from TOML files
//!
//! A catalog file lists items, buildings, recipes and generators, each
//! referring to items by name:
//!
//! ```toml
//! [[item]]
//! name = "Iron Ore"
//! resource = true
//!
//! [[recipe]]
//! name = "Iron Ingot"
//! output = { item = "Iron Ingot", amount = 30 }
//! ingredients = [{ item = "Iron Ore", amount = 30 }]
//! building = "SMELTER"
//! ```
//!
//! Imports merge into an existing catalog: records are matched by name (by
//! type for buildings and generators) and keep their ids, so planners that
//! reference them stay valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::catalog::{Catalog, MemoryCatalog};
use crate::error::{PlannerError, Result};
use crate::models::{
    Building, BuildingId, BuildingType, FuelType, Generator, GeneratorId, GeneratorType, Item,
    ItemAmount, ItemId, Recipe, RecipeId,
};

/// Catalog bundled with the binary for `load-sample`.
pub const SAMPLE_CATALOG: &str = include_str!("../demos/sample_catalog.toml");

#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "item")]
    pub items: Vec<ItemDef>,
    #[serde(default, rename = "building")]
    pub buildings: Vec<BuildingDef>,
    #[serde(default, rename = "recipe")]
    pub recipes: Vec<RecipeDef>,
    #[serde(default, rename = "generator")]
    pub generators: Vec<GeneratorDef>,
}

#[derive(Debug, Deserialize)]
pub struct ItemDef {
    pub name: String,
    #[serde(default)]
    pub resource: bool,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BuildingDef {
    #[serde(rename = "type")]
    pub building_type: String,
    #[serde(default)]
    pub sort_order: i32,
    pub power_usage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountDef {
    pub item: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecipeDef {
    pub name: String,
    pub output: AmountDef,
    #[serde(default)]
    pub ingredients: Vec<AmountDef>,
    pub by_product: Option<AmountDef>,
    pub building: Option<String>,
    #[serde(default)]
    pub alternate: bool,
    #[serde(default)]
    pub space_elevator: bool,
    #[serde(default)]
    pub fuel: bool,
    #[serde(default)]
    pub weapon_or_tool: bool,
    #[serde(default)]
    pub tier: i32,
}

#[derive(Debug, Deserialize)]
pub struct GeneratorDef {
    #[serde(rename = "type")]
    pub generator_type: String,
    pub fuel_type: String,
    pub power_output: f64,
    pub burn_time: f64,
    pub by_product: Option<AmountDef>,
    #[serde(default)]
    pub fuel: Vec<AmountDef>,
}

/// Find all *.toml files under `dir`, sorted for a stable import order
pub fn find_catalog_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PlannerError::Import(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    Ok(files)
}

pub fn parse_catalog_str(text: &str, origin: &str) -> Result<CatalogFile> {
    toml::from_str(text).map_err(|e| PlannerError::Import(format!("{}: {}", origin, e)))
}

/// Parse a single catalog file
pub fn parse_catalog_file(path: &Path) -> Result<CatalogFile> {
    let text = fs::read_to_string(path)
        .map_err(|e| PlannerError::Import(format!("failed to read {}: {}", path.display(), e)))?;
    parse_catalog_str(&text, &path.display().to_string())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportStats {
    pub files: usize,
    pub items: usize,
    pub buildings: usize,
    pub recipes: usize,
    pub generators: usize,
    pub errors: usize,
    /// Existing recipes whose definition changed.
    pub updated_recipes: Vec<RecipeId>,
    /// Recipes dropped by a clearing import.
    pub removed_recipes: Vec<RecipeId>,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} files: {} items, {} buildings, {} recipes ({} changed, {} removed), {} generators. Errors: {}",
            self.files,
            self.items,
            self.buildings,
            self.recipes,
            self.updated_recipes.len(),
            self.removed_recipes.len(),
            self.generators,
            self.errors
        )
    }
}

/// Merge parsed files into a copy of `base`. With `clear`, only what the
/// files define survives, but names already known keep their ids.
///
/// Records that cannot be resolved (unknown item names, bad enum names, bad
/// amounts) are skipped and counted as errors.
pub fn merge(
    base: &MemoryCatalog,
    files: &[CatalogFile],
    clear: bool,
) -> (MemoryCatalog, ImportStats) {
    let mut stats = ImportStats {
        files: files.len(),
        ..ImportStats::default()
    };
    let mut catalog = if clear {
        MemoryCatalog::new()
    } else {
        base.clone()
    };
    let mut ids = IdAllocator::new(base);

    // Items first so every later section can reference any file's items.
    for def in files.iter().flat_map(|f| &f.items) {
        let id = base
            .item_by_name(&def.name)
            .map(|i| i.id)
            .unwrap_or_else(|_| ids.item());
        let item = Item {
            id,
            name: def.name.trim().to_string(),
            is_resource: def.resource,
            icon_key: def.icon.clone(),
        };
        match catalog.insert_item(item) {
            Ok(()) => stats.items += 1,
            Err(e) => skip(&mut stats, "item", &def.name, e),
        }
    }

    for def in files.iter().flat_map(|f| &f.buildings) {
        match def.building_type.parse::<BuildingType>() {
            Ok(building_type) => {
                let id = base
                    .building(building_type)
                    .map(|b| b.id)
                    .unwrap_or_else(|_| ids.building());
                catalog.insert_building(Building {
                    id,
                    building_type,
                    sort_order: def.sort_order,
                    power_usage: def.power_usage,
                });
                stats.buildings += 1;
            }
            Err(e) => skip(&mut stats, "building", &def.building_type, e),
        }
    }

    for def in files.iter().flat_map(|f| &f.recipes) {
        let previous = base.recipe_by_name(&def.name);
        let id = previous.map_or_else(|| ids.recipe(), |r| r.id);
        let result = resolve_recipe(&catalog, id, def)
            .and_then(|recipe| catalog.insert_recipe(recipe.clone()).map(|_| recipe));
        match result {
            Ok(recipe) => {
                stats.recipes += 1;
                if previous.is_some_and(|p| *p != recipe) {
                    stats.updated_recipes.push(id);
                }
            }
            Err(e) => skip(&mut stats, "recipe", &def.name, e),
        }
    }

    for def in files.iter().flat_map(|f| &f.generators) {
        match resolve_generator(&catalog, base, &mut ids, def) {
            Ok(generator) => {
                catalog.insert_generator(generator);
                stats.generators += 1;
            }
            Err(e) => skip(&mut stats, "generator", &def.generator_type, e),
        }
    }

    if clear {
        stats.removed_recipes = base
            .recipes()
            .filter(|r| catalog.recipe(r.id).is_err())
            .map(|r| r.id)
            .collect();
    }
    stats.updated_recipes.sort();
    stats.updated_recipes.dedup();

    (catalog, stats)
}

/// Parse every catalog file under `dir` and merge them. Files that fail to
/// parse are skipped and counted as errors.
pub fn import_directory(
    base: &MemoryCatalog,
    dir: &Path,
    clear: bool,
) -> Result<(MemoryCatalog, ImportStats)> {
    let paths = find_catalog_files(dir)?;
    debug!(dir = %dir.display(), files = paths.len(), "scanning catalog files");

    let mut parsed = Vec::with_capacity(paths.len());
    let mut failed = 0;
    for path in &paths {
        match parse_catalog_file(path) {
            Ok(file) => parsed.push(file),
            Err(e) => {
                warn!(error = %e, "skipping catalog file");
                failed += 1;
            }
        }
    }

    let (catalog, mut stats) = merge(base, &parsed, clear);
    stats.files = paths.len();
    stats.errors += failed;
    Ok((catalog, stats))
}

/// The bundled sample catalog on its own.
pub fn sample_catalog() -> Result<(MemoryCatalog, ImportStats)> {
    let file = parse_catalog_str(SAMPLE_CATALOG, "sample catalog")?;
    Ok(merge(&MemoryCatalog::new(), &[file], true))
}

fn skip(stats: &mut ImportStats, kind: &str, name: &str, error: PlannerError) {
    warn!(kind, name, error = %error, "skipping catalog record");
    stats.errors += 1;
}

fn amount(catalog: &MemoryCatalog, def: &AmountDef) -> Result<ItemAmount> {
    let item = catalog.item_by_name(&def.item)?.clone();
    Ok(ItemAmount::new(item, def.amount))
}

fn resolve_recipe(catalog: &MemoryCatalog, id: RecipeId, def: &RecipeDef) -> Result<Recipe> {
    if let Some(clash) = catalog.recipe_by_name(&def.name).filter(|r| r.id != id) {
        return Err(PlannerError::Conflict(format!(
            "recipe name already used by recipe {}",
            clash.id
        )));
    }
    Ok(Recipe {
        id,
        name: def.name.trim().to_string(),
        output: amount(catalog, &def.output)?,
        ingredients: def
            .ingredients
            .iter()
            .map(|i| amount(catalog, i))
            .collect::<Result<Vec<_>>>()?,
        by_product: def.by_product.as_ref().map(|b| amount(catalog, b)).transpose()?,
        building: def.building.as_deref().map(str::parse::<BuildingType>).transpose()?,
        alternate: def.alternate,
        space_elevator: def.space_elevator,
        fuel: def.fuel,
        weapon_or_tool: def.weapon_or_tool,
        tier: def.tier,
    })
}

fn resolve_generator(
    catalog: &MemoryCatalog,
    base: &MemoryCatalog,
    ids: &mut IdAllocator,
    def: &GeneratorDef,
) -> Result<Generator> {
    let generator_type: GeneratorType = def.generator_type.parse()?;
    let fuel_type: FuelType = def.fuel_type.parse()?;
    if !generator_type.allowed_fuels().is_empty() && !generator_type.burns(fuel_type) {
        return Err(PlannerError::InvalidArgument(format!(
            "{} cannot burn {}",
            generator_type, fuel_type
        )));
    }
    for fuel in &def.fuel {
        let burnable = fuel
            .item
            .parse::<FuelType>()
            .is_ok_and(|f| generator_type.burns(f));
        if !burnable {
            return Err(PlannerError::InvalidArgument(format!(
                "{} cannot burn '{}'",
                generator_type, fuel.item
            )));
        }
    }
    let fuel_items = def
        .fuel
        .iter()
        .map(|f| amount(catalog, f))
        .collect::<Result<Vec<_>>>()?;
    let by_product = def.by_product.as_ref().map(|b| amount(catalog, b)).transpose()?;
    let id = base
        .generators()
        .find(|g| g.generator_type == generator_type)
        .map_or_else(|| ids.generator(), |g| g.id);

    Ok(Generator {
        id,
        generator_type,
        fuel_type,
        power_output: def.power_output,
        burn_time: def.burn_time,
        by_product,
        fuel_items,
    })
}

/// Hands out ids above anything `base` has used, so a clearing import never
/// recycles the id of a removed record.
struct IdAllocator {
    item: i64,
    building: i64,
    recipe: i64,
    generator: i64,
}

impl IdAllocator {
    fn new(base: &MemoryCatalog) -> Self {
        Self {
            item: base.next_item_id().0,
            building: base.buildings().iter().map(|b| b.id.0).max().unwrap_or(0) + 1,
            recipe: base.next_recipe_id().0,
            generator: base.next_generator_id().0,
        }
    }

    fn item(&mut self) -> ItemId {
        self.item += 1;
        ItemId(self.item - 1)
    }

    fn building(&mut self) -> BuildingId {
        self.building += 1;
        BuildingId(self.building - 1)
    }

    fn recipe(&mut self) -> RecipeId {
        self.recipe += 1;
        RecipeId(self.recipe - 1)
    }

    fn generator(&mut self) -> GeneratorId {
        self.generator += 1;
        GeneratorId(self.generator - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATES: &str = r#"
        [[item]]
        name = "Iron Ore"
        resource = true

        [[item]]
        name = "Iron Ingot"

        [[building]]
        type = "smelter"
        sort_order = 1
        power_usage = 4

        [[recipe]]
        name = "Iron Ingot"
        output = { item = "Iron Ingot", amount = 30 }
        ingredients = [{ item = "Iron Ore", amount = 30 }]
        building = "SMELTER"
    "#;

    #[test]
    fn sample_catalog_parses_cleanly() {
        let (catalog, stats) = sample_catalog().unwrap();
        assert_eq!(stats.errors, 0);
        assert!(stats.recipes > 0);
        let burner = catalog.generator_by_type("biomass burner").unwrap();
        assert_eq!(burner.fuel_type, FuelType::Biomass);
        assert!(catalog.building(BuildingType::Assembler).is_ok());
    }

    #[test]
    fn merges_and_resolves_names() {
        let file = parse_catalog_str(PLATES, "plates").unwrap();
        let (catalog, stats) = merge(&MemoryCatalog::new(), &[file], false);
        assert_eq!(stats.items, 2);
        assert_eq!(stats.recipes, 1);
        assert_eq!(stats.errors, 0);

        let ingot = catalog.recipe_by_name("iron ingot").unwrap();
        assert_eq!(ingot.ingredients[0].item.name, "Iron Ore");
        assert_eq!(ingot.building, Some(BuildingType::Smelter));
    }

    #[test]
    fn reimport_keeps_ids_and_reports_changes() {
        let file = parse_catalog_str(PLATES, "plates").unwrap();
        let (first, _) = merge(&MemoryCatalog::new(), &[file], false);
        let ingot_id = first.recipe_by_name("Iron Ingot").unwrap().id;

        let changed = parse_catalog_str(&PLATES.replace("amount = 30 }\n", "amount = 45 }\n"), "plates")
            .unwrap();
        let (second, stats) = merge(&first, &[changed], false);
        assert_eq!(second.recipe_by_name("Iron Ingot").unwrap().id, ingot_id);
        assert_eq!(second.recipe(ingot_id).unwrap().output.amount, 45.0);
        assert_eq!(stats.updated_recipes, vec![ingot_id]);
    }

    #[test]
    fn unknown_item_skips_the_record() {
        let text = r#"
            [[recipe]]
            name = "Mystery"
            output = { item = "Unobtainium", amount = 1 }
        "#;
        let file = parse_catalog_str(text, "mystery").unwrap();
        let (catalog, stats) = merge(&MemoryCatalog::new(), &[file], false);
        assert_eq!(stats.errors, 1);
        assert!(catalog.recipe_by_name("Mystery").is_none());
    }

    #[test]
    fn generator_with_foreign_fuel_is_skipped() {
        let text = r#"
            [[item]]
            name = "Coal"
            resource = true

            [[item]]
            name = "Biomass"

            [[generator]]
            type = "COAL_GENERATOR"
            fuel_type = "COAL"
            power_output = 75
            burn_time = 4
            fuel = [{ item = "Coal", amount = 15 }, { item = "Biomass", amount = 10 }]

            [[generator]]
            type = "BIOMASS_BURNER"
            fuel_type = "COAL"
            power_output = 30
            burn_time = 18
            fuel = [{ item = "Biomass", amount = 10 }]
        "#;
        let file = parse_catalog_str(text, "power").unwrap();
        let (catalog, stats) = merge(&MemoryCatalog::new(), &[file], false);
        assert_eq!(stats.generators, 0);
        assert_eq!(stats.errors, 2);
        assert!(catalog.generator_by_type("coal generator").is_none());
        assert!(catalog.generator_by_type("biomass burner").is_none());
    }

    #[test]
    fn clearing_import_reports_removed_recipes() {
        let file = parse_catalog_str(PLATES, "plates").unwrap();
        let (first, _) = merge(&MemoryCatalog::new(), &[file], false);
        let ingot_id = first.recipe_by_name("Iron Ingot").unwrap().id;

        let (second, stats) = merge(&first, &[CatalogFile::default()], true);
        assert_eq!(second.recipes().count(), 0);
        assert_eq!(stats.removed_recipes, vec![ingot_id]);
    }

    #[test]
    fn malformed_toml_is_an_import_error() {
        assert!(matches!(
            parse_catalog_str("[[item]\nname =", "broken"),
            Err(PlannerError::Import(_))
        ));
    }
}
