//! Transactional planner operations over a SQLite database
//!
//! Every mutation loads the planner, edits it in memory, ripples, and writes
//! it back inside one IMMEDIATE transaction. Catalog changes and the cascade
//! into every affected planner share one transaction too. Any error drops the
//! transaction before commit, so nothing is left half-applied.

use std::path::Path;

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::builder;
use crate::catalog::{Catalog, MemoryCatalog};
use crate::db::{self, PlannerSummary};
use crate::error::{PlannerError, Result};
use crate::import::{self, ImportStats};
use crate::ledger;
use crate::models::{
    EntryId, GeneratorId, Planner, PlannerId, PlannerMode, Recipe, RecipeId, TargetType,
};
use crate::ripple;

/// Partial update of a fuel planner's target. Unset fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelSettings {
    pub generator_id: Option<GeneratorId>,
    pub target_type: Option<TargetType>,
    pub target_amount: Option<f64>,
}

pub struct PlannerService {
    conn: Connection,
    catalog: MemoryCatalog,
}

impl PlannerService {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn new(conn: Connection) -> Result<Self> {
        db::init_schema(&conn)?;
        let catalog = db::load_catalog(&conn)?;
        Ok(Self { conn, catalog })
    }

    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Load, edit, ripple and store one planner in a single transaction.
    fn mutate<F>(&mut self, planner_id: PlannerId, action: &str, edit: F) -> Result<Planner>
    where
        F: FnOnce(&mut Planner, &MemoryCatalog) -> Result<()>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let planner = apply_in(&tx, &self.catalog, &self.catalog, planner_id, edit)?;
        tx.commit()?;
        info!(
            planner = %planner.id,
            action,
            entries = planner.entries.len(),
            "planner updated"
        );
        Ok(planner)
    }

    fn insert(&mut self, planner: Planner) -> Result<Planner> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        db::save_planner(&tx, &planner)?;
        tx.commit()?;
        info!(
            planner = %planner.id,
            name = %planner.name,
            mode = planner.mode.as_str(),
            "planner created"
        );
        Ok(planner)
    }

    pub fn create_factory_planner(&mut self, name: &str) -> Result<Planner> {
        self.insert(builder::factory_planner(name))
    }

    pub fn create_fuel_planner(
        &mut self,
        name: &str,
        generator_id: GeneratorId,
        target_type: TargetType,
        target_amount: f64,
    ) -> Result<Planner> {
        let generator = self.catalog.generator(generator_id)?;
        let planner =
            builder::fuel_planner(name, generator, target_type, target_amount, &self.catalog)?;
        self.insert(planner)
    }

    /// Place a root entry producing `recipe_id`'s output.
    pub fn add_entry(
        &mut self,
        planner_id: PlannerId,
        recipe_id: RecipeId,
        building_count: f64,
    ) -> Result<Planner> {
        let recipe = self.catalog.recipe(recipe_id)?.clone();
        self.mutate(planner_id, "add entry", |planner, catalog| {
            builder::place_entry(planner, recipe, building_count, catalog)
        })
    }

    pub fn set_recipe(
        &mut self,
        entry_id: EntryId,
        recipe_id: RecipeId,
        override_building_count: Option<f64>,
    ) -> Result<Planner> {
        let recipe = self.catalog.recipe(recipe_id)?.clone();
        let planner_id = db::planner_id_for_entry(&self.conn, entry_id)?;
        self.mutate(planner_id, "set recipe", |planner, _| {
            ledger::swap_recipe(planner, entry_id, recipe, override_building_count)
        })
    }

    pub fn set_manual_allocation(
        &mut self,
        entry_id: EntryId,
        label: &str,
        amount: f64,
    ) -> Result<Planner> {
        let planner_id = db::planner_id_for_entry(&self.conn, entry_id)?;
        self.mutate(planner_id, "set manual allocation", |planner, _| {
            ledger::upsert_manual_allocation(planner, entry_id, label, amount)
        })
    }

    pub fn remove_manual_allocation(&mut self, entry_id: EntryId, label: &str) -> Result<Planner> {
        let planner_id = db::planner_id_for_entry(&self.conn, entry_id)?;
        self.mutate(planner_id, "remove manual allocation", |planner, _| {
            ledger::remove_manual_allocation(planner, entry_id, label)
        })
    }

    pub fn delete_entry(&mut self, entry_id: EntryId) -> Result<Planner> {
        let planner_id = db::planner_id_for_entry(&self.conn, entry_id)?;
        self.mutate(planner_id, "delete entry", |planner, _| {
            ledger::delete_entry(planner, entry_id)
        })
    }

    /// Change a fuel planner's generator or target and rebuild its chain.
    /// Settings equal to the current ones leave the planner as it is.
    pub fn update_fuel_settings(
        &mut self,
        planner_id: PlannerId,
        settings: FuelSettings,
    ) -> Result<Planner> {
        self.mutate(planner_id, "update fuel settings", |planner, catalog| {
            let current = planner.fuel_target().cloned().ok_or_else(|| {
                PlannerError::Conflict(format!(
                    "planner '{}' is a factory planner and has no fuel settings",
                    planner.name
                ))
            })?;

            let generator = match settings.generator_id {
                Some(id) => catalog.generator(id)?.clone(),
                None => current.generator.clone(),
            };
            let target_type = settings.target_type.unwrap_or(current.target_type);
            let target_amount = settings.target_amount.unwrap_or(current.target_amount);

            if generator == current.generator
                && target_type == current.target_type
                && target_amount == current.target_amount
            {
                debug!(planner = %planner.id, "fuel settings unchanged");
                return Ok(());
            }

            planner.mode =
                PlannerMode::Fuel(builder::fuel_target(&generator, target_type, target_amount)?);
            builder::build_fuel_chain(planner, catalog)
        })
    }

    /// Move every planner off `removed`, a recipe the catalog no longer has.
    /// It must already be gone from the in-memory catalog so the ripple
    /// cannot pick it again. Returns the number of planners changed.
    pub fn on_recipe_deleted(&mut self, removed: &Recipe) -> Result<usize> {
        let mut previous = self.catalog.clone();
        previous.insert_recipe(removed.clone())?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = cascade_removed(&tx, &previous, &self.catalog, removed)?;
        tx.commit()?;
        Ok(changed)
    }

    /// Re-apply a changed recipe in every planner using it. Returns the
    /// number of planners changed.
    pub fn on_recipe_updated(&mut self, recipe: &Recipe) -> Result<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = cascade_updated(&tx, &self.catalog, recipe)?;
        tx.commit()?;
        Ok(changed)
    }

    /// Store an edited recipe and cascade it into planners. Nothing is kept
    /// unless every planner using it takes the change.
    pub fn update_recipe(&mut self, recipe: Recipe) -> Result<usize> {
        let previous = self.catalog.recipe(recipe.id)?.clone();
        if previous.output.item.id != recipe.output.item.id {
            return Err(PlannerError::InvalidArgument(format!(
                "recipe '{}' cannot change its output from '{}' to '{}'",
                previous.name, previous.output.item.name, recipe.output.item.name
            )));
        }

        let mut updated = self.catalog.clone();
        updated.insert_recipe(recipe.clone())?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        db::upsert_recipe(&tx, &recipe)?;
        let changed = cascade_updated(&tx, &updated, &recipe)?;
        tx.commit()?;
        self.catalog = updated;
        info!(recipe = %recipe.name, planners = changed, "recipe updated");
        Ok(changed)
    }

    /// Delete a recipe from the catalog after moving every planner off it.
    pub fn delete_recipe(&mut self, recipe_id: RecipeId) -> Result<usize> {
        let mut remaining = self.catalog.clone();
        let removed = remaining
            .remove_recipe(recipe_id)
            .ok_or_else(|| PlannerError::not_found("recipe", recipe_id))?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = cascade_removed(&tx, &self.catalog, &remaining, &removed)?;
        db::delete_recipe(&tx, recipe_id)?;
        tx.commit()?;
        self.catalog = remaining;
        info!(recipe = %removed.name, planners = changed, "recipe deleted");
        Ok(changed)
    }

    /// Import catalog files from `dir`, then cascade removed and changed
    /// recipes into planners.
    pub fn import_catalog(&mut self, dir: &Path, clear: bool) -> Result<ImportStats> {
        let (merged, stats) = import::import_directory(&self.catalog, dir, clear)?;
        self.replace_catalog(merged, &stats)?;
        Ok(stats)
    }

    /// Replace the catalog with the bundled sample.
    pub fn load_sample(&mut self) -> Result<ImportStats> {
        let file = import::parse_catalog_str(import::SAMPLE_CATALOG, "sample catalog")?;
        let (merged, stats) = import::merge(&self.catalog, &[file], true);
        self.replace_catalog(merged, &stats)?;
        Ok(stats)
    }

    /// Store `merged` and cascade it into every planner in one transaction.
    /// If any planner cannot follow, nothing is written and the current
    /// catalog stays in place.
    fn replace_catalog(&mut self, merged: MemoryCatalog, stats: &ImportStats) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        db::save_catalog(&tx, &merged)?;

        // Planners may reference any removed recipe until their cascade ran.
        let mut previous = merged.clone();
        for id in &stats.removed_recipes {
            previous.insert_recipe(self.catalog.recipe(*id)?.clone())?;
        }
        for id in &stats.removed_recipes {
            cascade_removed(&tx, &previous, &merged, previous.recipe(*id)?)?;
        }
        for id in &stats.updated_recipes {
            cascade_updated(&tx, &merged, merged.recipe(*id)?)?;
        }

        // Items and generators can vanish too; every planner must still load.
        for summary in db::list_planners(&tx)? {
            if let Err(e) = db::load_planner(&tx, &merged, summary.id) {
                warn!(planner = %summary.id, error = %e, "import would break planner");
                return Err(PlannerError::Conflict(format!(
                    "catalog import would break planner '{}': {e}",
                    summary.name
                )));
            }
        }

        tx.commit()?;
        self.catalog = merged;
        info!(%stats, "catalog imported");
        Ok(())
    }

    pub fn planner(&self, planner_id: PlannerId) -> Result<Planner> {
        db::load_planner(&self.conn, &self.catalog, planner_id)
    }

    pub fn planners(&self) -> Result<Vec<PlannerSummary>> {
        db::list_planners(&self.conn)
    }

    pub fn delete_planner(&mut self, planner_id: PlannerId) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        db::delete_planner(&tx, planner_id)?;
        tx.commit()?;
        info!(planner = %planner_id, "planner deleted");
        Ok(())
    }
}

/// Load a planner against `load_from`, edit it, ripple against `catalog`,
/// and save it inside the caller's transaction.
fn apply_in<F>(
    tx: &Connection,
    load_from: &MemoryCatalog,
    catalog: &MemoryCatalog,
    planner_id: PlannerId,
    edit: F,
) -> Result<Planner>
where
    F: FnOnce(&mut Planner, &MemoryCatalog) -> Result<()>,
{
    let mut planner = db::load_planner(tx, load_from, planner_id)?;
    edit(&mut planner, catalog)?;
    ripple::propagate(&mut planner, catalog)?;
    db::save_planner(tx, &planner)?;
    Ok(planner)
}

/// Move every planner off `removed`. Stored planners still reference it, so
/// they load from `previous`; the replacement comes from `current`.
fn cascade_removed(
    tx: &Connection,
    previous: &MemoryCatalog,
    current: &MemoryCatalog,
    removed: &Recipe,
) -> Result<usize> {
    let affected = db::planners_using_recipe(tx, removed.id)?;
    for planner_id in &affected {
        apply_in(tx, previous, current, *planner_id, |planner, catalog| {
            ledger::replace_recipe(planner, removed.id, catalog).map(|_| ())
        })?;
        debug!(planner = %planner_id, recipe = %removed.name, "replaced deleted recipe");
    }
    Ok(affected.len())
}

fn cascade_updated(tx: &Connection, catalog: &MemoryCatalog, recipe: &Recipe) -> Result<usize> {
    let affected = db::planners_using_recipe(tx, recipe.id)?;
    for planner_id in &affected {
        apply_in(tx, catalog, catalog, *planner_id, |planner, _| {
            ledger::refresh_recipe(planner, recipe).map(|_| ())
        })?;
        debug!(planner = %planner_id, recipe = %recipe.name, "refreshed updated recipe");
    }
    Ok(affected.len())
}
