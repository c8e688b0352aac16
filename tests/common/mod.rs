//! Shared catalog and helpers for integration tests.
#![allow(dead_code)]

use factory_planner::catalog::MemoryCatalog;
use factory_planner::db;
use factory_planner::models::{
    Building, BuildingId, BuildingType, FuelType, Generator, GeneratorId, GeneratorType, Item,
    ItemAmount, ItemId, Planner, Recipe, RecipeId,
};
use factory_planner::PlannerService;
use rusqlite::Connection;

pub const ORE: ItemId = ItemId(1);
pub const INGOT: ItemId = ItemId(2);
pub const PLATE: ItemId = ItemId(3);
pub const SCREW: ItemId = ItemId(4);
pub const RIP: ItemId = ItemId(5);
pub const LEAVES: ItemId = ItemId(6);
pub const BIOMASS: ItemId = ItemId(7);

pub const INGOT_RECIPE: RecipeId = RecipeId(1);
pub const PLATE_RECIPE: RecipeId = RecipeId(2);
pub const SCREW_RECIPE: RecipeId = RecipeId(3);
pub const RIP_RECIPE: RecipeId = RecipeId(4);
pub const COATED_PLATE_RECIPE: RecipeId = RecipeId(5);
pub const BIOMASS_RECIPE: RecipeId = RecipeId(6);

pub const BURNER: GeneratorId = GeneratorId(1);

pub const EPSILON: f64 = 1e-9;

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON * a.abs().max(b.abs()).max(1.0)
}

fn item(id: ItemId, name: &str, is_resource: bool) -> Item {
    Item {
        id,
        name: name.to_string(),
        is_resource,
        icon_key: None,
    }
}

fn recipe(
    id: RecipeId,
    name: &str,
    output: (&Item, f64),
    ingredients: &[(&Item, f64)],
    alternate: bool,
) -> Recipe {
    Recipe {
        id,
        name: name.to_string(),
        output: ItemAmount::new(output.0.clone(), output.1),
        ingredients: ingredients
            .iter()
            .map(|(i, a)| ItemAmount::new((*i).clone(), *a))
            .collect(),
        by_product: None,
        building: Some(BuildingType::Constructor),
        alternate,
        space_elevator: false,
        fuel: false,
        weapon_or_tool: false,
        tier: 0,
    }
}

/// Iron line ending in Reinforced Iron Plate (5 plates + 1 screw -> 1/min),
/// plus leaves-to-biomass for a Biomass Burner.
pub fn catalog() -> MemoryCatalog {
    let ore = item(ORE, "Iron Ore", true);
    let ingot = item(INGOT, "Iron Ingot", false);
    let plate = item(PLATE, "Iron Plate", false);
    let screw = item(SCREW, "Screw", false);
    let rip = item(RIP, "Reinforced Iron Plate", false);
    let leaves = item(LEAVES, "Leaves", true);
    let biomass = item(BIOMASS, "Biomass", false);

    let mut catalog = MemoryCatalog::new();
    for i in [&ore, &ingot, &plate, &screw, &rip, &leaves, &biomass] {
        catalog.insert_item(i.clone()).unwrap();
    }
    catalog.insert_building(Building {
        id: BuildingId(1),
        building_type: BuildingType::Constructor,
        sort_order: 1,
        power_usage: 4.0,
    });

    let recipes = [
        recipe(INGOT_RECIPE, "Iron Ingot", (&ingot, 30.0), &[(&ore, 30.0)], false),
        recipe(PLATE_RECIPE, "Iron Plate", (&plate, 20.0), &[(&ingot, 30.0)], false),
        recipe(SCREW_RECIPE, "Screw", (&screw, 40.0), &[(&ingot, 10.0)], false),
        recipe(
            RIP_RECIPE,
            "Reinforced Iron Plate",
            (&rip, 1.0),
            &[(&plate, 5.0), (&screw, 1.0)],
            false,
        ),
        recipe(
            COATED_PLATE_RECIPE,
            "Alternate: Coated Plate",
            (&plate, 40.0),
            &[(&ingot, 45.0)],
            true,
        ),
        recipe(BIOMASS_RECIPE, "Biomass (Leaves)", (&biomass, 60.0), &[(&leaves, 120.0)], false),
    ];
    for r in recipes {
        catalog.insert_recipe(r).unwrap();
    }

    catalog.insert_generator(Generator {
        id: BURNER,
        generator_type: GeneratorType::BiomassBurner,
        fuel_type: FuelType::Biomass,
        power_output: 30.0,
        burn_time: 18.0,
        by_product: None,
        fuel_items: vec![ItemAmount::new(leaves, 20.0), ItemAmount::new(biomass, 10.0)],
    });

    catalog
}

/// A service over an in-memory database seeded with `catalog()`.
pub fn service() -> PlannerService {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    db::save_catalog(&conn, &catalog()).unwrap();
    PlannerService::new(conn).unwrap()
}

pub fn entry_count(planner: &Planner, item: ItemId) -> f64 {
    planner
        .entry_for_item(item)
        .map(|e| e.building_count)
        .unwrap_or_else(|| panic!("no entry for item {}", item))
}
