//! Planner service: transactions, persistence and catalog cascades.

mod common;

use common::*;
use factory_planner::catalog::Catalog;
use factory_planner::models::{BuildingOverride, GENERATOR_FUEL_LABEL, TargetType};
use factory_planner::{FuelSettings, PlannerError, PlannerService};

#[test]
fn mutations_are_persisted() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 2.0).unwrap();
    assert_eq!(planner.entries.len(), 4);

    let stored = service.planner(planner.id).unwrap();
    assert_eq!(stored, planner);

    let listed = service.planners().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Main");
    assert_eq!(listed[0].entry_count, 4);
}

#[test]
fn failed_mutation_leaves_planner_unchanged() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();
    let screw = planner.entry_for_item(SCREW).unwrap().id;
    let ingot = planner.entry_for_item(INGOT).unwrap().id;

    assert!(matches!(service.delete_entry(screw), Err(PlannerError::Conflict(_))));
    assert!(matches!(
        service.set_recipe(ingot, INGOT_RECIPE, Some(0.01)),
        Err(PlannerError::InvalidArgument(_))
    ));
    assert!(matches!(
        service.set_recipe(ingot, PLATE_RECIPE, None),
        Err(PlannerError::InvalidArgument(_))
    ));
    assert!(matches!(
        service.add_entry(planner.id, SCREW_RECIPE, 1.0),
        Err(PlannerError::Conflict(_))
    ));

    assert_eq!(service.planner(planner.id).unwrap(), planner);
}

#[test]
fn override_survives_reload_and_later_edits() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();
    let ingot = planner.entry_for_item(INGOT).unwrap().id;
    let plate = planner.entry_for_item(PLATE).unwrap().id;

    service.set_recipe(ingot, INGOT_RECIPE, Some(3.0)).unwrap();
    let planner = service.set_manual_allocation(plate, "Storage", 40.0).unwrap();

    let entry = planner.entry(ingot).unwrap();
    assert_eq!(entry.building_override, BuildingOverride::Overridden(3.0));
    assert_eq!(entry.building_count, 3.0);

    let planner = service.set_recipe(ingot, INGOT_RECIPE, None).unwrap();
    let entry = planner.entry(ingot).unwrap();
    assert!(entry.building_override.is_auto());
    assert!(approx(entry.building_count, entry.demanded_building_count()));
}

#[test]
fn manual_allocation_on_a_root_round_trips_through_storage() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, PLATE_RECIPE, 2.0).unwrap();
    let plate = planner.entry_for_item(PLATE).unwrap().id;

    let planner = service.set_manual_allocation(plate, "Home Base", 30.0).unwrap();
    assert!(approx(entry_count(&planner, PLATE), 3.5));
    assert_eq!(service.planner(planner.id).unwrap(), planner);

    let planner = service.remove_manual_allocation(plate, "Home Base").unwrap();
    assert_eq!(entry_count(&planner, PLATE), 2.0);
    assert!(approx(planner.resources[0].amount, 60.0));

    // A root also feeding another entry carries both demands.
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();
    let root = planner.entry(plate).unwrap();
    assert!(root.root);
    // One RIP building draws 5 plates a minute.
    assert!(approx(root.building_count, 2.0 + 5.0 / 20.0));
    assert!(matches!(
        service.remove_manual_allocation(plate, "Placed"),
        Err(PlannerError::Conflict(_))
    ));
}

#[test]
fn removing_an_unknown_label_is_not_found() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();
    let plate = planner.entry_for_item(PLATE).unwrap().id;

    assert!(matches!(
        service.remove_manual_allocation(plate, "Nowhere"),
        Err(PlannerError::NotFound { .. })
    ));
}

#[test]
fn deleting_the_root_prunes_its_chain() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();
    let rip = planner.entry_for_item(RIP).unwrap().id;

    let planner = service.delete_entry(rip).unwrap();
    assert!(planner.entries.is_empty());
    assert!(planner.resources.is_empty());
}

#[test]
fn fuel_settings_rebuild_the_chain() {
    let mut service = service();
    let planner = service
        .create_fuel_planner("Burners", BURNER, TargetType::GeneratorCount, 5.0)
        .unwrap();
    let root = planner.entries[0].id;

    let unchanged = service
        .update_fuel_settings(planner.id, FuelSettings::default())
        .unwrap();
    assert_eq!(unchanged.entries[0].id, root);

    let planner = service
        .update_fuel_settings(
            planner.id,
            FuelSettings {
                target_type: Some(TargetType::FuelRate),
                target_amount: Some(120.0),
                ..FuelSettings::default()
            },
        )
        .unwrap();
    let target = planner.fuel_target().unwrap();
    assert_eq!(target.fuel_rate, 120.0);
    assert_eq!(target.generator_building_count, 12.0);
    assert_eq!(planner.entries[0].building_count, 2.0);
    assert_eq!(
        planner.entries[0]
            .manual_allocation(GENERATOR_FUEL_LABEL)
            .unwrap()
            .amount,
        120.0
    );
    assert_eq!(planner.resources[0].amount, 240.0);

    let factory = service.create_factory_planner("Main").unwrap();
    assert!(matches!(
        service.update_fuel_settings(factory.id, FuelSettings::default()),
        Err(PlannerError::Conflict(_))
    ));
}

#[test]
fn deleted_recipe_cascades_to_replacement() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();

    assert_eq!(service.delete_recipe(PLATE_RECIPE).unwrap(), 1);
    assert!(service.catalog().recipe(PLATE_RECIPE).is_err());

    let reloaded = service.planner(planner.id).unwrap();
    let plate = reloaded.entry_for_item(PLATE).unwrap();
    assert_eq!(plate.recipe.id, COATED_PLATE_RECIPE);
    assert_eq!(plate.building_count, 0.125);
}

#[test]
fn deleting_a_recipe_without_replacement_is_refused() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();

    assert!(matches!(
        service.delete_recipe(SCREW_RECIPE),
        Err(PlannerError::NotFound { .. })
    ));
    assert!(service.catalog().recipe(SCREW_RECIPE).is_ok());
    assert_eq!(service.planner(planner.id).unwrap(), planner);
}

#[test]
fn updated_recipe_cascades_into_planners() {
    let mut service = service();
    let planner = service.create_factory_planner("Main").unwrap();
    let planner = service.add_entry(planner.id, RIP_RECIPE, 1.0).unwrap();

    let mut screw = service.catalog().recipe(SCREW_RECIPE).unwrap().clone();
    screw.ingredients[0].amount = 20.0;
    assert_eq!(service.update_recipe(screw).unwrap(), 1);

    let reloaded = service.planner(planner.id).unwrap();
    // 7.5 ingots for plates, now 0.5 for screws.
    assert!(approx(entry_count(&reloaded, INGOT), 8.0 / 30.0));
    assert!(approx(reloaded.resources[0].amount, 8.0));
}

#[test]
fn planners_persist_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");

    let planner_id = {
        let mut service = PlannerService::open(&path).unwrap();
        service.load_sample().unwrap();
        let ingot = service.catalog().recipe_by_name("Iron Plate").unwrap().id;
        let planner = service.create_factory_planner("Plates").unwrap();
        service.add_entry(planner.id, ingot, 3.0).unwrap();
        planner.id
    };

    let service = PlannerService::open(&path).unwrap();
    let planner = service.planner(planner_id).unwrap();
    assert_eq!(planner.entries.len(), 2);
    assert_eq!(planner.entries[0].building_count, 3.0);
    assert_eq!(planner.resources[0].item.name, "Iron Ore");
    assert_eq!(planner.resources[0].amount, 90.0);

    let mut service = service;
    service.delete_planner(planner_id).unwrap();
    assert!(matches!(
        service.planner(planner_id),
        Err(PlannerError::NotFound { .. })
    ));
}
