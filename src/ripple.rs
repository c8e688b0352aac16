//! Demand propagation ("ripple") over a planner's entry graph
//!
//! After any edit the whole graph is recomputed: recipe allocations are
//! rebuilt from every entry's ingredients, children are created on demand,
//! resized when their demand changes, and entries nobody needs any more are
//! dropped. The walk is an explicit FIFO worklist over items, never
//! recursion, so deep chains cannot overflow the stack.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{PlannerError, Result};
use crate::models::{Allocation, BuildingOverride, Entry, Item, ItemId, Planner, Recipe};
use crate::resources;

/// How often one item may be re-queued before the chain is declared cyclic.
const MAX_VISITS_PER_ITEM: usize = 256;

/// Ripple the planner and refresh its resource totals.
pub fn propagate(planner: &mut Planner, catalog: &impl Catalog) -> Result<()> {
    ripple(planner, catalog)?;
    resources::refresh(planner);
    Ok(())
}

/// Recompute every entry's incoming demand and building count.
pub fn ripple(planner: &mut Planner, catalog: &impl Catalog) -> Result<()> {
    for entry in &mut planner.entries {
        entry.recipe_allocations.clear();
    }
    prune_unreachable(planner);

    let mut arena: Vec<Entry> = std::mem::take(&mut planner.entries);
    let mut index: HashMap<ItemId, usize> = HashMap::with_capacity(arena.len());
    for (i, entry) in arena.iter().enumerate() {
        if entry.target_item.is_resource {
            return Err(PlannerError::DataInconsistency(format!(
                "entry {} targets raw resource '{}'",
                entry.id, entry.target_item.name
            )));
        }
        if index.insert(entry.target_item.id, i).is_some() {
            return Err(PlannerError::DataInconsistency(format!(
                "more than one entry targets '{}'",
                entry.target_item.name
            )));
        }
    }

    // Start every entry with manual demand from that demand alone; consumers
    // add theirs below. Entries nobody consumes get no upsert at all.
    for entry in arena
        .iter_mut()
        .filter(|e| !e.manual_allocations.is_empty())
    {
        entry.settle();
    }

    let mut queue: VecDeque<ItemId> = arena.iter().map(|e| e.target_item.id).collect();
    let mut visits: HashMap<ItemId, usize> = HashMap::new();
    let mut recipes = RecipeCache::new(catalog);

    while let Some(parent_id) = queue.pop_front() {
        let Some(&parent_idx) = index.get(&parent_id) else {
            continue;
        };
        let parent = &arena[parent_idx];
        let visit = visits.entry(parent_id).or_insert(0);
        *visit += 1;
        if *visit > MAX_VISITS_PER_ITEM {
            return Err(PlannerError::DataInconsistency(format!(
                "demand for '{}' never settles; its production chain loops back on itself",
                parent.target_item.name
            )));
        }

        let parent_item = parent.target_item.clone();
        let demands: Vec<(Item, f64)> = parent
            .ingredient_allocations
            .iter()
            .filter(|input| !input.item.is_resource)
            .map(|input| (input.item.clone(), input.amount))
            .collect();

        for (child_item, amount) in demands {
            let (child_idx, created) = match index.get(&child_item.id) {
                Some(&i) => (i, false),
                None => {
                    let recipe = recipes.default_for(&child_item)?;
                    debug!(item = %child_item.name, recipe = %recipe.name, "creating entry");
                    let mut child = Entry::new(planner.id, recipe, 1.0, false);
                    child.target_item = child_item.clone();
                    arena.push(child);
                    index.insert(child_item.id, arena.len() - 1);
                    (arena.len() - 1, true)
                }
            };

            let child = &mut arena[child_idx];
            upsert_recipe_allocation(child, &parent_item, amount);

            let demanded = child.demanded_building_count();
            match child.building_override {
                BuildingOverride::Auto => {
                    if created || demanded != child.building_count {
                        child.resize(demanded);
                        queue.push_back(child.target_item.id);
                    }
                }
                BuildingOverride::Overridden(pinned) => {
                    if created {
                        child.resize(pinned);
                        queue.push_back(child.target_item.id);
                    }
                    if demanded > pinned {
                        warn!(
                            item = %child.target_item.name,
                            pinned,
                            demanded,
                            "demand exceeds pinned building count"
                        );
                    }
                }
            }
        }
    }

    debug!(
        planner = %planner.id,
        entries = arena.len(),
        "ripple settled"
    );
    planner.entries = arena;
    Ok(())
}

/// One recipe allocation per consuming entry: replace the parent's previous
/// demand instead of stacking a second one.
fn upsert_recipe_allocation(child: &mut Entry, parent: &Item, amount: f64) {
    let building_count = child.buildings_for(amount);
    let existing = child
        .recipe_allocations
        .iter_mut()
        .find(|a| a.item.as_ref().is_some_and(|i| i.id == parent.id));
    match existing {
        Some(alloc) => {
            alloc.amount = amount;
            alloc.building_count = building_count;
        }
        None => child.recipe_allocations.push(Allocation {
            item: Some(parent.clone()),
            label: parent.name.clone(),
            amount,
            building_count,
        }),
    }
}

/// Drop entries that no root and no manual allocation leads to.
fn prune_unreachable(planner: &mut Planner) {
    let by_item: HashMap<ItemId, &Entry> = planner
        .entries
        .iter()
        .map(|e| (e.target_item.id, e))
        .collect();

    let mut live: HashSet<ItemId> = HashSet::new();
    let mut stack: Vec<ItemId> = planner
        .entries
        .iter()
        .filter(|e| e.root || !e.manual_allocations.is_empty())
        .map(|e| e.target_item.id)
        .collect();

    while let Some(item) = stack.pop() {
        if !live.insert(item) {
            continue;
        }
        if let Some(entry) = by_item.get(&item) {
            stack.extend(
                entry
                    .ingredient_allocations
                    .iter()
                    .filter(|i| !i.item.is_resource && by_item.contains_key(&i.item.id))
                    .map(|i| i.item.id),
            );
        }
    }

    let before = planner.entries.len();
    planner
        .entries
        .retain(|e| live.contains(&e.target_item.id));
    if planner.entries.len() != before {
        debug!(
            pruned = before - planner.entries.len(),
            "dropped unreachable entries"
        );
    }
}

/// Per-pass cache of "default recipe for item name".
struct RecipeCache<'c, C: Catalog> {
    catalog: &'c C,
    by_name: HashMap<String, Recipe>,
}

impl<'c, C: Catalog> RecipeCache<'c, C> {
    fn new(catalog: &'c C) -> Self {
        Self {
            catalog,
            by_name: HashMap::new(),
        }
    }

    fn default_for(&mut self, item: &Item) -> Result<Recipe> {
        if let Some(recipe) = self.by_name.get(&item.name) {
            return Ok(recipe.clone());
        }
        let recipe = match self.catalog.default_recipe_for_item(&item.name) {
            Ok(selection) => selection.recipe().clone(),
            Err(PlannerError::NotFound { .. }) => {
                return Err(PlannerError::DataInconsistency(format!(
                    "'{}' is not a raw resource but no recipe produces it",
                    item.name
                )));
            }
            Err(e) => return Err(e),
        };
        self.by_name.insert(item.name.clone(), recipe.clone());
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::models::{ItemAmount, PlannerId, PlannerMode, RecipeId};

    fn item(id: i64, name: &str, is_resource: bool) -> Item {
        Item {
            id: ItemId(id),
            name: name.to_string(),
            is_resource,
            icon_key: None,
        }
    }

    fn recipe(id: i64, output: (&Item, f64), ingredients: &[(&Item, f64)]) -> Recipe {
        Recipe {
            id: RecipeId(id),
            name: output.0.name.clone(),
            output: ItemAmount::new(output.0.clone(), output.1),
            ingredients: ingredients
                .iter()
                .map(|(i, a)| ItemAmount::new((*i).clone(), *a))
                .collect(),
            by_product: None,
            building: None,
            alternate: false,
            space_elevator: false,
            fuel: false,
            weapon_or_tool: false,
            tier: 0,
        }
    }

    /// ore -> ingot -> plate, plus rod from ingot.
    fn catalog() -> (MemoryCatalog, Item, Item, Item, Item) {
        let ore = item(1, "Iron Ore", true);
        let ingot = item(2, "Iron Ingot", false);
        let plate = item(3, "Iron Plate", false);
        let rod = item(4, "Iron Rod", false);
        let mut catalog = MemoryCatalog::new();
        for i in [&ore, &ingot, &plate, &rod] {
            catalog.insert_item(i.clone()).unwrap();
        }
        catalog.insert_recipe(recipe(1, (&ingot, 30.0), &[(&ore, 30.0)])).unwrap();
        catalog.insert_recipe(recipe(2, (&plate, 20.0), &[(&ingot, 30.0)])).unwrap();
        catalog.insert_recipe(recipe(3, (&rod, 15.0), &[(&ingot, 15.0)])).unwrap();
        (catalog, ore, ingot, plate, rod)
    }

    fn planner_with(catalog: &MemoryCatalog, recipe_id: i64, count: f64) -> Planner {
        let id = PlannerId::new();
        let recipe = catalog.recipe(RecipeId(recipe_id)).unwrap().clone();
        Planner {
            id,
            name: "test".to_string(),
            mode: PlannerMode::Factory,
            entries: vec![Entry::new(id, recipe, count, true)],
            resources: vec![],
        }
    }

    #[test]
    fn creates_children_and_scales_them() {
        let (catalog, ore, ingot, _, _) = catalog();
        let mut planner = planner_with(&catalog, 2, 2.0);
        propagate(&mut planner, &catalog).unwrap();

        assert_eq!(planner.entries.len(), 2);
        let smelter = planner.entry_for_item(ingot.id).unwrap();
        assert_eq!(smelter.building_count, 2.0);
        assert_eq!(smelter.recipe_allocations.len(), 1);
        assert_eq!(smelter.recipe_allocations[0].amount, 60.0);
        assert!(!smelter.root);
        assert!(planner.entry_for_item(ore.id).is_none());
        assert_eq!(planner.resources[0].amount, 60.0);
    }

    #[test]
    fn shared_child_gets_one_allocation_per_parent() {
        let (catalog, _, ingot, _, _) = catalog();
        let mut planner = planner_with(&catalog, 2, 1.0);
        let rod = catalog.recipe(RecipeId(3)).unwrap().clone();
        planner.entries.push(Entry::new(planner.id, rod, 2.0, true));

        propagate(&mut planner, &catalog).unwrap();
        propagate(&mut planner, &catalog).unwrap();

        let smelter = planner.entry_for_item(ingot.id).unwrap();
        assert_eq!(smelter.recipe_allocations.len(), 2);
        assert_eq!(smelter.building_count, 2.0); // (30 + 30) / 30
    }

    #[test]
    fn overridden_child_keeps_its_count() {
        let (catalog, _, ingot, _, _) = catalog();
        let mut planner = planner_with(&catalog, 2, 1.0);
        propagate(&mut planner, &catalog).unwrap();

        let smelter = planner
            .entries
            .iter_mut()
            .find(|e| e.target_item.id == ingot.id)
            .unwrap();
        smelter.building_override = BuildingOverride::Overridden(5.0);
        smelter.resize(5.0);

        planner.entries[0].resize(3.0);
        propagate(&mut planner, &catalog).unwrap();
        assert_eq!(planner.entry_for_item(ingot.id).unwrap().building_count, 5.0);
        assert_eq!(planner.resources[0].amount, 150.0);
    }

    #[test]
    fn orphaned_children_are_pruned() {
        let (catalog, _, ingot, _, _) = catalog();
        let mut planner = planner_with(&catalog, 2, 1.0);
        propagate(&mut planner, &catalog).unwrap();
        assert!(planner.entry_for_item(ingot.id).is_some());

        planner.entries[0].root = false;
        propagate(&mut planner, &catalog).unwrap();
        assert!(planner.entries.is_empty());
        assert!(planner.resources.is_empty());
    }

    #[test]
    fn missing_recipe_is_data_inconsistency() {
        let (mut catalog, _, _, _, _) = catalog();
        catalog.remove_recipe(RecipeId(1));
        let mut planner = planner_with(&catalog, 2, 1.0);
        assert!(matches!(
            propagate(&mut planner, &catalog),
            Err(PlannerError::DataInconsistency(_))
        ));
    }

    #[test]
    fn cyclic_chain_is_reported() {
        let a = item(1, "Alpha", false);
        let b = item(2, "Beta", false);
        let mut catalog = MemoryCatalog::new();
        catalog.insert_recipe(recipe(1, (&a, 1.0), &[(&b, 2.0)])).unwrap();
        catalog.insert_recipe(recipe(2, (&b, 1.0), &[(&a, 2.0)])).unwrap();
        let mut planner = planner_with(&catalog, 1, 1.0);
        assert!(matches!(
            ripple(&mut planner, &catalog),
            Err(PlannerError::DataInconsistency(_))
        ));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let (catalog, _, _, _, _) = catalog();
        let mut planner = planner_with(&catalog, 2, 3.5);
        propagate(&mut planner, &catalog).unwrap();
        let once = planner.clone();
        propagate(&mut planner, &catalog).unwrap();
        assert_eq!(planner, once);
    }
}
