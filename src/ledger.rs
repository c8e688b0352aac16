//! Edits to a single entry's recipe and allocations
//!
//! These functions only touch the entry (or entry list) they are given. The
//! caller ripples the planner afterwards so the rest of the graph catches up.

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{PlannerError, Result};
use crate::models::{
    Allocation, BuildingOverride, EntryId, GENERATOR_FUEL_LABEL, PLACED_LABEL, Planner, Recipe,
    RecipeId,
};

// Overrides are compared against sums of divided floats.
const OVERRIDE_TOLERANCE: f64 = 1e-9;

// Allocations only the planner itself may write.
fn is_reserved(label: &str) -> bool {
    let label = label.trim();
    label.eq_ignore_ascii_case(GENERATOR_FUEL_LABEL) || label.eq_ignore_ascii_case(PLACED_LABEL)
}

/// Swap the entry's recipe, keeping its building count. With
/// `override_count` the entry is pinned at that many buildings, which must
/// cover everything already drawn from it; without one it goes back to
/// following demand.
pub fn swap_recipe(
    planner: &mut Planner,
    entry_id: EntryId,
    recipe: Recipe,
    override_count: Option<f64>,
) -> Result<()> {
    let entry = planner
        .entry_mut(entry_id)
        .ok_or_else(|| PlannerError::not_found("entry", entry_id))?;

    if recipe.output.item.id != entry.target_item.id {
        return Err(PlannerError::InvalidArgument(format!(
            "recipe '{}' makes '{}', not '{}'",
            recipe.name, recipe.output.item.name, entry.target_item.name
        )));
    }

    // Validate against the new recipe's rates before committing to anything.
    let mut candidate = entry.clone();
    candidate.apply_recipe(recipe);

    match override_count {
        Some(count) => {
            let minimum = candidate.demanded_building_count();
            if !count.is_finite() || count <= 0.0 {
                return Err(PlannerError::InvalidArgument(format!(
                    "building count override must be positive, got {}",
                    count
                )));
            }
            if count + OVERRIDE_TOLERANCE < minimum {
                return Err(PlannerError::InvalidArgument(format!(
                    "cannot set building count for '{}' below the required minimum of {}",
                    candidate.target_item.name, minimum
                )));
            }
            candidate.building_override = BuildingOverride::Overridden(count);
            candidate.resize(count);
        }
        None => candidate.building_override = BuildingOverride::Auto,
    }

    debug!(
        entry = %entry_id,
        recipe = %candidate.recipe.name,
        building_override = ?candidate.building_override,
        "recipe swapped"
    );
    *entry = candidate;
    Ok(())
}

/// Set the manual allocation named `label` to `amount` per minute, creating
/// it when no allocation with that label (ignoring case) exists.
pub fn upsert_manual_allocation(
    planner: &mut Planner,
    entry_id: EntryId,
    label: &str,
    amount: f64,
) -> Result<()> {
    let label = label.trim();
    if label.is_empty() {
        return Err(PlannerError::InvalidArgument(
            "allocation label must not be empty".to_string(),
        ));
    }
    if is_reserved(label) {
        return Err(PlannerError::Conflict(format!(
            "'{}' is managed by the planner and cannot be edited",
            label
        )));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(PlannerError::InvalidArgument(format!(
            "allocation amount must be zero or more, got {}",
            amount
        )));
    }

    let entry = planner
        .entry_mut(entry_id)
        .ok_or_else(|| PlannerError::not_found("entry", entry_id))?;
    let building_count = entry.buildings_for(amount);

    match entry
        .manual_allocations
        .iter_mut()
        .find(|a| a.label.eq_ignore_ascii_case(label))
    {
        Some(alloc) => {
            alloc.amount = amount;
            alloc.building_count = building_count;
        }
        None => entry.manual_allocations.push(Allocation {
            item: None,
            label: label.to_string(),
            amount,
            building_count,
        }),
    }
    entry.settle();
    Ok(())
}

pub fn remove_manual_allocation(
    planner: &mut Planner,
    entry_id: EntryId,
    label: &str,
) -> Result<()> {
    if is_reserved(label) {
        return Err(PlannerError::Conflict(format!(
            "'{}' is managed by the planner and cannot be removed",
            label.trim()
        )));
    }

    let entry = planner
        .entry_mut(entry_id)
        .ok_or_else(|| PlannerError::not_found("entry", entry_id))?;
    let before = entry.manual_allocations.len();
    entry
        .manual_allocations
        .retain(|a| !a.label.eq_ignore_ascii_case(label.trim()));
    if entry.manual_allocations.len() == before {
        return Err(PlannerError::not_found("manual allocation", label));
    }
    entry.settle();
    Ok(())
}

/// Remove an entry nothing depends on. The fuel root can never go.
pub fn delete_entry(planner: &mut Planner, entry_id: EntryId) -> Result<()> {
    let target = planner
        .entry(entry_id)
        .ok_or_else(|| PlannerError::not_found("entry", entry_id))?;

    if planner.is_fuel_root(target) {
        return Err(PlannerError::Conflict(format!(
            "cannot delete the root fuel entry for '{}'",
            target.target_item.name
        )));
    }
    if !target.recipe_allocations.is_empty() {
        let mut deps: Vec<&str> = target
            .recipe_allocations
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        return Err(PlannerError::Conflict(format!(
            "cannot delete '{}' because it is still needed by: {}",
            target.target_item.name,
            deps.join(", ")
        )));
    }

    let item_id = target.target_item.id;
    planner.entries.retain(|e| e.id != entry_id);
    for child in &mut planner.entries {
        child
            .recipe_allocations
            .retain(|a| a.item.as_ref().is_none_or(|i| i.id != item_id));
    }
    Ok(())
}

/// Move every entry off a recipe that is being deleted. Returns how many
/// entries changed.
pub fn replace_recipe(
    planner: &mut Planner,
    deleted: RecipeId,
    catalog: &impl Catalog,
) -> Result<usize> {
    let mut changed = 0;
    for entry in planner.entries.iter_mut().filter(|e| e.recipe.id == deleted) {
        let replacement = catalog.replacement_recipe(&entry.target_item.name, deleted)?;
        debug!(
            item = %entry.target_item.name,
            from = %entry.recipe.name,
            to = %replacement.name,
            "replacing deleted recipe"
        );
        entry.apply_recipe(replacement.clone());
        changed += 1;
    }
    Ok(changed)
}

/// Re-apply an edited recipe to every entry using it, keeping each entry's
/// count and override. Returns how many entries changed.
pub fn refresh_recipe(planner: &mut Planner, recipe: &Recipe) -> Result<usize> {
    let mut changed = 0;
    for entry in planner.entries.iter_mut().filter(|e| e.recipe.id == recipe.id) {
        if recipe.output.item.id != entry.target_item.id {
            return Err(PlannerError::DataInconsistency(format!(
                "recipe '{}' now makes '{}' but entry {} plans '{}'",
                recipe.name, recipe.output.item.name, entry.id, entry.target_item.name
            )));
        }
        entry.apply_recipe(recipe.clone());
        changed += 1;
    }
    Ok(changed)
}
