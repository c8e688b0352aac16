//! Initial entry graphs for new planners

use tracing::debug;

use crate::catalog::{self, Catalog};
use crate::error::{PlannerError, Result};
use crate::models::{
    Allocation, Entry, FuelTarget, Generator, GENERATOR_FUEL_LABEL, Planner, PlannerId,
    PlannerMode, Recipe, TargetType,
};
use crate::ripple;

/// A factory planner starts empty; entries arrive through `place_entry`.
pub fn factory_planner(name: &str) -> Planner {
    Planner {
        id: PlannerId::new(),
        name: name.to_string(),
        mode: PlannerMode::Factory,
        entries: Vec::new(),
        resources: Vec::new(),
    }
}

/// Build a fuel planner with its root chain already propagated.
pub fn fuel_planner(
    name: &str,
    generator: &Generator,
    target_type: TargetType,
    target_amount: f64,
    catalog: &impl Catalog,
) -> Result<Planner> {
    let mut planner = factory_planner(name);
    planner.mode = PlannerMode::Fuel(fuel_target(generator, target_type, target_amount)?);
    build_fuel_chain(&mut planner, catalog)?;
    Ok(planner)
}

/// Resolve the generator's fuel and convert the target into a fuel rate.
pub fn fuel_target(
    generator: &Generator,
    target_type: TargetType,
    target_amount: f64,
) -> Result<FuelTarget> {
    if !target_amount.is_finite() || target_amount <= 0.0 {
        return Err(PlannerError::InvalidArgument(format!(
            "target amount must be positive, got {}",
            target_amount
        )));
    }

    let fuel_item = catalog::fuel_item(generator)?.clone();
    if fuel_item.item.is_resource {
        return Err(PlannerError::InvalidArgument(format!(
            "fuel '{}' is a raw resource; there is no chain to plan",
            fuel_item.item.name
        )));
    }
    if fuel_item.amount <= 0.0 {
        return Err(PlannerError::DataInconsistency(format!(
            "generator {} burns a non-positive amount of '{}'",
            generator.id, fuel_item.item.name
        )));
    }

    let fuel_rate = match target_type {
        TargetType::GeneratorCount => target_amount * fuel_item.amount,
        TargetType::FuelRate => target_amount,
    };

    Ok(FuelTarget {
        generator: generator.clone(),
        target_type,
        target_amount,
        fuel_rate,
        generator_building_count: fuel_rate / fuel_item.amount,
        fuel_item,
    })
}

/// Replace a fuel planner's entries with a fresh root chain for its target.
pub fn build_fuel_chain(planner: &mut Planner, catalog: &impl Catalog) -> Result<()> {
    let target = planner.fuel_target().cloned().ok_or_else(|| {
        PlannerError::Conflict(format!("planner {} is not in fuel mode", planner.id))
    })?;

    let selection = catalog.default_recipe_for_item(&target.fuel_item.item.name)?;
    let recipe = selection.recipe().clone();
    debug!(
        fuel = %target.fuel_item.item.name,
        recipe = %recipe.name,
        fallback = selection.is_fallback(),
        rate = target.fuel_rate,
        "building fuel root"
    );

    let building_count = target.fuel_rate / recipe.output_rate();
    let mut root = Entry::new(planner.id, recipe, building_count, true);
    root.manual_allocations.push(Allocation {
        item: None,
        label: GENERATOR_FUEL_LABEL.to_string(),
        amount: target.fuel_rate,
        building_count,
    });

    planner.entries.clear();
    planner.resources.clear();
    planner.entries.push(root);
    ripple::propagate(planner, catalog)
}

/// Add a user-placed root entry for `recipe` at `building_count` buildings.
pub fn place_entry(
    planner: &mut Planner,
    recipe: Recipe,
    building_count: f64,
    catalog: &impl Catalog,
) -> Result<()> {
    if !building_count.is_finite() || building_count <= 0.0 {
        return Err(PlannerError::InvalidArgument(format!(
            "building count must be positive, got {}",
            building_count
        )));
    }
    let item = &recipe.output.item;
    if item.is_resource {
        return Err(PlannerError::InvalidArgument(format!(
            "'{}' is a raw resource and cannot be planned",
            item.name
        )));
    }
    if planner.entry_for_item(item.id).is_some() {
        return Err(PlannerError::Conflict(format!(
            "planner already has an entry producing '{}'",
            item.name
        )));
    }

    planner
        .entries
        .push(Entry::placed(planner.id, recipe, building_count));
    ripple::propagate(planner, catalog)
}
