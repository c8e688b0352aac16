//! Read-only catalog lookups: items, recipes, buildings and generators

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::models::{
    Building, BuildingType, Generator, GeneratorId, Item, ItemAmount, ItemId, Recipe, RecipeId,
};

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("separator pattern is valid"));

/// Lower-case a name and collapse runs of spaces/underscores, so
/// `SOLID_BIOFUEL` and `Solid  Biofuel` compare equal.
pub fn normalize_name(name: &str) -> String {
    SEPARATORS
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// Which kind of recipe a default-recipe lookup settled on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecipeSelection<'a> {
    Standard(&'a Recipe),
    /// No standard recipe exists; the first alternate was used instead.
    AlternateFallback(&'a Recipe),
}

impl<'a> RecipeSelection<'a> {
    pub fn recipe(&self) -> &'a Recipe {
        match self {
            RecipeSelection::Standard(r) | RecipeSelection::AlternateFallback(r) => r,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RecipeSelection::AlternateFallback(_))
    }
}

/// Lookups the planner needs from the catalog.
pub trait Catalog {
    fn item(&self, id: ItemId) -> Result<&Item>;
    fn item_by_name(&self, name: &str) -> Result<&Item>;
    fn recipe(&self, id: RecipeId) -> Result<&Recipe>;
    /// Every recipe producing the named item, in id order.
    fn recipes_for_item(&self, item_name: &str) -> Vec<&Recipe>;
    fn generator(&self, id: GeneratorId) -> Result<&Generator>;
    fn building(&self, building_type: BuildingType) -> Result<&Building>;

    /// First standard recipe for the item, else the first alternate.
    fn default_recipe_for_item(&self, item_name: &str) -> Result<RecipeSelection<'_>> {
        let recipes = self.recipes_for_item(item_name);
        if let Some(r) = recipes.iter().copied().find(|r| !r.alternate) {
            return Ok(RecipeSelection::Standard(r));
        }
        match recipes.into_iter().find(|r| r.alternate) {
            Some(r) => {
                debug!(item = item_name, recipe = %r.name, "falling back to alternate recipe");
                Ok(RecipeSelection::AlternateFallback(r))
            }
            None => Err(PlannerError::not_found("default recipe for item", item_name)),
        }
    }

    /// Recipe to use for `item_name` once `excluded` is gone.
    fn replacement_recipe(&self, item_name: &str, excluded: RecipeId) -> Result<&Recipe> {
        let candidates: Vec<&Recipe> = self
            .recipes_for_item(item_name)
            .into_iter()
            .filter(|r| r.id != excluded)
            .collect();
        candidates
            .iter()
            .find(|r| !r.alternate)
            .or_else(|| candidates.iter().find(|r| r.alternate))
            .copied()
            .ok_or_else(|| {
                PlannerError::not_found(
                    "replacement recipe",
                    format!("'{}' has no other recipe to replace {}", item_name, excluded),
                )
            })
    }
}

/// Find the generator's fuel item for its configured fuel type.
pub fn fuel_item(generator: &Generator) -> Result<&ItemAmount> {
    let wanted = normalize_name(generator.fuel_type.as_str());
    generator
        .fuel_items
        .iter()
        .find(|fuel| normalize_name(&fuel.item.name) == wanted)
        .ok_or_else(|| {
            PlannerError::not_found(
                "fuel item",
                format!("{} on generator {}", generator.fuel_type, generator.id),
            )
        })
}

/// Catalog held entirely in memory, loaded from the database or built in
/// tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: BTreeMap<ItemId, Item>,
    recipes: BTreeMap<RecipeId, Recipe>,
    generators: BTreeMap<GeneratorId, Generator>,
    buildings: HashMap<BuildingType, Building>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        if item.name.trim().is_empty() {
            return Err(PlannerError::InvalidArgument("item name is empty".to_string()));
        }
        if let Some(clash) = self
            .items
            .values()
            .find(|i| i.id != item.id && i.name.eq_ignore_ascii_case(&item.name))
        {
            return Err(PlannerError::Conflict(format!(
                "item name '{}' already used by item {}",
                item.name, clash.id
            )));
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    /// Insert or replace a recipe. Output amounts must be positive so that
    /// building counts are always defined.
    pub fn insert_recipe(&mut self, recipe: Recipe) -> Result<()> {
        let rate = recipe.output_rate();
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlannerError::InvalidArgument(format!(
                "recipe '{}' must output a positive amount, got {}",
                recipe.name, rate
            )));
        }
        if let Some(bad) = recipe
            .ingredients
            .iter()
            .find(|i| !i.amount.is_finite() || i.amount < 0.0)
        {
            return Err(PlannerError::InvalidArgument(format!(
                "recipe '{}' has invalid amount {} for {}",
                recipe.name, bad.amount, bad.item.name
            )));
        }
        self.recipes.insert(recipe.id, recipe);
        Ok(())
    }

    pub fn insert_generator(&mut self, generator: Generator) {
        self.generators.insert(generator.id, generator);
    }

    pub fn insert_building(&mut self, building: Building) {
        self.buildings.insert(building.building_type, building);
    }

    pub fn remove_recipe(&mut self, id: RecipeId) -> Option<Recipe> {
        self.recipes.remove(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values()
    }

    /// Buildings in display order.
    pub fn buildings(&self) -> Vec<&Building> {
        let mut list: Vec<_> = self.buildings.values().collect();
        list.sort_by_key(|b| (b.sort_order, b.building_type));
        list
    }

    pub fn recipe_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes
            .values()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn generator_by_type(&self, name: &str) -> Option<&Generator> {
        let wanted = normalize_name(name);
        self.generators
            .values()
            .find(|g| normalize_name(g.generator_type.as_str()) == wanted)
    }

    pub fn next_item_id(&self) -> ItemId {
        ItemId(self.items.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    pub fn next_recipe_id(&self) -> RecipeId {
        RecipeId(self.recipes.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    pub fn next_generator_id(&self) -> GeneratorId {
        GeneratorId(self.generators.keys().next_back().map_or(1, |id| id.0 + 1))
    }
}

impl Catalog for MemoryCatalog {
    fn item(&self, id: ItemId) -> Result<&Item> {
        self.items
            .get(&id)
            .ok_or_else(|| PlannerError::not_found("item", id))
    }

    fn item_by_name(&self, name: &str) -> Result<&Item> {
        self.items
            .values()
            .find(|i| i.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| PlannerError::not_found("item", name))
    }

    fn recipe(&self, id: RecipeId) -> Result<&Recipe> {
        self.recipes
            .get(&id)
            .ok_or_else(|| PlannerError::not_found("recipe", id))
    }

    fn recipes_for_item(&self, item_name: &str) -> Vec<&Recipe> {
        self.recipes
            .values()
            .filter(|r| r.output.item.name.eq_ignore_ascii_case(item_name))
            .collect()
    }

    fn generator(&self, id: GeneratorId) -> Result<&Generator> {
        self.generators
            .get(&id)
            .ok_or_else(|| PlannerError::not_found("generator", id))
    }

    fn building(&self, building_type: BuildingType) -> Result<&Building> {
        self.buildings
            .get(&building_type)
            .ok_or_else(|| PlannerError::not_found("building", building_type))
    }
}
