//! Database schema and operations

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, params};

use crate::builder;
use crate::catalog::{Catalog, MemoryCatalog};
use crate::error::{PlannerError, Result};
use crate::models::{
    Allocation, Building, BuildingId, BuildingOverride, Entry, EntryId, Generator, GeneratorId,
    Item, ItemAmount, ItemId, Planner, PlannerId, PlannerMode, Recipe, RecipeId,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Catalog: reference data the planners are built from
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            is_resource INTEGER NOT NULL,
            icon_key TEXT
        );

        CREATE TABLE IF NOT EXISTS buildings (
            id INTEGER PRIMARY KEY,
            building_type TEXT NOT NULL UNIQUE,
            sort_order INTEGER NOT NULL,
            power_usage REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            output_item_id INTEGER NOT NULL,
            output_amount REAL NOT NULL,
            by_product_item_id INTEGER,
            by_product_amount REAL,
            building_type TEXT,
            alternate INTEGER NOT NULL,
            space_elevator INTEGER NOT NULL,
            fuel INTEGER NOT NULL,
            weapon_or_tool INTEGER NOT NULL,
            tier INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE TABLE IF NOT EXISTS generators (
            id INTEGER PRIMARY KEY,
            generator_type TEXT NOT NULL,
            fuel_type TEXT NOT NULL,
            power_output REAL NOT NULL,
            burn_time REAL NOT NULL,
            by_product_item_id INTEGER,
            by_product_amount REAL
        );

        CREATE TABLE IF NOT EXISTS generator_fuel_items (
            generator_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (generator_id, position)
        );

        -- Planners: derived fuel figures are recomputed on load
        CREATE TABLE IF NOT EXISTS planners (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            mode TEXT NOT NULL,
            generator_id INTEGER,
            target_type TEXT,
            target_amount REAL
        );

        -- building_override NULL means the entry follows demand
        CREATE TABLE IF NOT EXISTS planner_entries (
            id TEXT PRIMARY KEY,
            planner_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            target_item_id INTEGER NOT NULL,
            recipe_id INTEGER NOT NULL,
            building_count REAL NOT NULL,
            outgoing_amount REAL NOT NULL,
            building_override REAL,
            is_root INTEGER NOT NULL
        );

        -- kind is one of 'ingredient', 'recipe', 'manual'
        CREATE TABLE IF NOT EXISTS entry_allocations (
            entry_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id INTEGER,
            label TEXT NOT NULL,
            amount REAL NOT NULL,
            building_count REAL NOT NULL,
            PRIMARY KEY (entry_id, kind, position)
        );

        CREATE TABLE IF NOT EXISTS planner_resources (
            planner_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (planner_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_item_id);
        CREATE INDEX IF NOT EXISTS idx_entries_planner ON planner_entries(planner_id);
        CREATE INDEX IF NOT EXISTS idx_entries_recipe ON planner_entries(recipe_id);
        "#,
    )?;
    Ok(())
}

/// Stored enum text that no longer parses means the row is corrupt, not that
/// the caller passed a bad argument.
fn parse_column<T>(raw: &str, column: &str) -> Result<T>
where
    T: FromStr<Err = PlannerError>,
{
    raw.parse().map_err(|e: PlannerError| {
        PlannerError::DataInconsistency(format!("bad stored {}: {}", column, e))
    })
}

fn stored_item(catalog: &MemoryCatalog, id: i64, context: &str) -> Result<Item> {
    catalog.item(ItemId(id)).cloned().map_err(|_| {
        PlannerError::DataInconsistency(format!("{} references missing item {}", context, id))
    })
}

fn by_product(
    catalog: &MemoryCatalog,
    item_id: Option<i64>,
    amount: Option<f64>,
    context: &str,
) -> Result<Option<ItemAmount>> {
    match (item_id, amount) {
        (Some(id), Some(amount)) => Ok(Some(ItemAmount::new(
            stored_item(catalog, id, context)?,
            amount,
        ))),
        _ => Ok(None),
    }
}

/// Clear all catalog data (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM generator_fuel_items;
        DELETE FROM generators;
        DELETE FROM recipe_ingredients;
        DELETE FROM recipes;
        DELETE FROM buildings;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// Replace the stored catalog with `catalog`.
pub fn save_catalog(conn: &Connection, catalog: &MemoryCatalog) -> Result<()> {
    clear_catalog(conn)?;

    for item in catalog.items() {
        conn.execute(
            "INSERT INTO items (id, name, is_resource, icon_key) VALUES (?1, ?2, ?3, ?4)",
            params![item.id.0, item.name, item.is_resource, item.icon_key],
        )?;
    }

    for b in catalog.buildings() {
        conn.execute(
            "INSERT INTO buildings (id, building_type, sort_order, power_usage)
             VALUES (?1, ?2, ?3, ?4)",
            params![b.id.0, b.building_type.as_str(), b.sort_order, b.power_usage],
        )?;
    }

    for recipe in catalog.recipes() {
        upsert_recipe(conn, recipe)?;
    }

    for g in catalog.generators() {
        conn.execute(
            "INSERT INTO generators (id, generator_type, fuel_type, power_output, burn_time,
                                     by_product_item_id, by_product_amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                g.id.0,
                g.generator_type.as_str(),
                g.fuel_type.as_str(),
                g.power_output,
                g.burn_time,
                g.by_product.as_ref().map(|b| b.item.id.0),
                g.by_product.as_ref().map(|b| b.amount),
            ],
        )?;
        for (pos, fuel) in g.fuel_items.iter().enumerate() {
            conn.execute(
                "INSERT INTO generator_fuel_items (generator_id, position, item_id, amount)
                 VALUES (?1, ?2, ?3, ?4)",
                params![g.id.0, pos as i64, fuel.item.id.0, fuel.amount],
            )?;
        }
    }

    Ok(())
}

/// Insert or replace a recipe and its ingredient rows
pub fn upsert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    conn.execute("DELETE FROM recipe_ingredients WHERE recipe_id = ?1", [recipe.id.0])?;
    conn.execute(
        "INSERT OR REPLACE INTO recipes (id, name, output_item_id, output_amount, by_product_item_id,
                              by_product_amount, building_type, alternate, space_elevator,
                              fuel, weapon_or_tool, tier)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            recipe.id.0,
            recipe.name,
            recipe.output.item.id.0,
            recipe.output.amount,
            recipe.by_product.as_ref().map(|b| b.item.id.0),
            recipe.by_product.as_ref().map(|b| b.amount),
            recipe.building.map(|b| b.as_str()),
            recipe.alternate,
            recipe.space_elevator,
            recipe.fuel,
            recipe.weapon_or_tool,
            recipe.tier,
        ],
    )?;
    for (pos, input) in recipe.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, position, item_id, amount)
             VALUES (?1, ?2, ?3, ?4)",
            params![recipe.id.0, pos as i64, input.item.id.0, input.amount],
        )?;
    }
    Ok(())
}

/// Delete a single recipe and its ingredient rows
pub fn delete_recipe(conn: &Connection, id: RecipeId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM recipes WHERE id = ?1", [id.0])?;
    if deleted == 0 {
        return Err(PlannerError::not_found("recipe", id));
    }
    conn.execute("DELETE FROM recipe_ingredients WHERE recipe_id = ?1", [id.0])?;
    Ok(())
}

/// Load the whole catalog into memory
pub fn load_catalog(conn: &Connection) -> Result<MemoryCatalog> {
    let mut catalog = MemoryCatalog::new();

    let mut stmt = conn.prepare("SELECT id, name, is_resource, icon_key FROM items ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Item {
            id: ItemId(row.get(0)?),
            name: row.get(1)?,
            is_resource: row.get(2)?,
            icon_key: row.get(3)?,
        })
    })?;
    for row in rows {
        catalog.insert_item(row?)?;
    }

    let mut stmt =
        conn.prepare("SELECT id, building_type, sort_order, power_usage FROM buildings")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i32>(2)?,
            row.get::<_, f64>(3)?,
        ))
    })?;
    for row in rows {
        let (id, kind, sort_order, power_usage) = row?;
        catalog.insert_building(Building {
            id: BuildingId(id),
            building_type: parse_column(&kind, "building type")?,
            sort_order,
            power_usage,
        });
    }

    let mut ingredients = conn.prepare(
        "SELECT item_id, amount FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY position",
    )?;
    let mut stmt = conn.prepare(
        "SELECT id, name, output_item_id, output_amount, by_product_item_id, by_product_amount,
                building_type, alternate, space_elevator, fuel, weapon_or_tool, tier
         FROM recipes ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RecipeRow {
            id: row.get(0)?,
            name: row.get(1)?,
            output_item_id: row.get(2)?,
            output_amount: row.get(3)?,
            by_product_item_id: row.get(4)?,
            by_product_amount: row.get(5)?,
            building_type: row.get(6)?,
            alternate: row.get(7)?,
            space_elevator: row.get(8)?,
            fuel: row.get(9)?,
            weapon_or_tool: row.get(10)?,
            tier: row.get(11)?,
        })
    })?;
    let recipe_rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    for r in recipe_rows {
        let context = format!("recipe '{}'", r.name);
        let inputs = ingredients
            .query_map([r.id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut resolved = Vec::with_capacity(inputs.len());
        for (item_id, amount) in inputs {
            resolved.push(ItemAmount::new(stored_item(&catalog, item_id, &context)?, amount));
        }

        let recipe = Recipe {
            id: RecipeId(r.id),
            output: ItemAmount::new(
                stored_item(&catalog, r.output_item_id, &context)?,
                r.output_amount,
            ),
            ingredients: resolved,
            by_product: by_product(&catalog, r.by_product_item_id, r.by_product_amount, &context)?,
            building: r
                .building_type
                .as_deref()
                .map(|b| parse_column(b, "building type"))
                .transpose()?,
            alternate: r.alternate,
            space_elevator: r.space_elevator,
            fuel: r.fuel,
            weapon_or_tool: r.weapon_or_tool,
            tier: r.tier,
            name: r.name,
        };
        catalog.insert_recipe(recipe)?;
    }

    let mut fuels = conn.prepare(
        "SELECT item_id, amount FROM generator_fuel_items WHERE generator_id = ?1 ORDER BY position",
    )?;
    let mut stmt = conn.prepare(
        "SELECT id, generator_type, fuel_type, power_output, burn_time,
                by_product_item_id, by_product_amount
         FROM generators ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, Option<i64>>(5)?,
            row.get::<_, Option<f64>>(6)?,
        ))
    })?;
    let generator_rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    for (id, generator_type, fuel_type, power_output, burn_time, bp_item, bp_amount) in
        generator_rows
    {
        let context = format!("generator {}", id);
        let stored = fuels
            .query_map([id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut fuel_items = Vec::with_capacity(stored.len());
        for (item_id, amount) in stored {
            fuel_items.push(ItemAmount::new(stored_item(&catalog, item_id, &context)?, amount));
        }

        catalog.insert_generator(Generator {
            id: GeneratorId(id),
            generator_type: parse_column(&generator_type, "generator type")?,
            fuel_type: parse_column(&fuel_type, "fuel type")?,
            power_output,
            burn_time,
            by_product: by_product(&catalog, bp_item, bp_amount, &context)?,
            fuel_items,
        });
    }

    Ok(catalog)
}

struct RecipeRow {
    id: i64,
    name: String,
    output_item_id: i64,
    output_amount: f64,
    by_product_item_id: Option<i64>,
    by_product_amount: Option<f64>,
    building_type: Option<String>,
    alternate: bool,
    space_elevator: bool,
    fuel: bool,
    weapon_or_tool: bool,
    tier: i32,
}

/// One line of the planner list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSummary {
    pub id: PlannerId,
    pub name: String,
    pub mode: String,
    pub entry_count: usize,
}

/// Store a planner, replacing whatever was stored under its id.
pub fn save_planner(conn: &Connection, planner: &Planner) -> Result<()> {
    remove_planner_rows(conn, planner.id)?;

    let (generator_id, target_type, target_amount) = match &planner.mode {
        PlannerMode::Factory => (None, None, None),
        PlannerMode::Fuel(t) => (
            Some(t.generator.id.0),
            Some(t.target_type.as_str()),
            Some(t.target_amount),
        ),
    };
    conn.execute(
        "INSERT INTO planners (id, name, mode, generator_id, target_type, target_amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            planner.id.to_string(),
            planner.name,
            planner.mode.as_str(),
            generator_id,
            target_type,
            target_amount,
        ],
    )?;

    let mut insert_entry = conn.prepare(
        "INSERT INTO planner_entries (id, planner_id, position, target_item_id, recipe_id,
                                      building_count, outgoing_amount, building_override, is_root)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    let mut insert_alloc = conn.prepare(
        "INSERT INTO entry_allocations (entry_id, kind, position, item_id, label, amount,
                                        building_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for (pos, entry) in planner.entries.iter().enumerate() {
        let entry_id = entry.id.to_string();
        let pinned = match entry.building_override {
            BuildingOverride::Auto => None,
            BuildingOverride::Overridden(count) => Some(count),
        };
        insert_entry.execute(params![
            entry_id,
            planner.id.to_string(),
            pos as i64,
            entry.target_item.id.0,
            entry.recipe.id.0,
            entry.building_count,
            entry.outgoing_amount,
            pinned,
            entry.root,
        ])?;

        for (i, input) in entry.ingredient_allocations.iter().enumerate() {
            insert_alloc.execute(params![
                entry_id,
                "ingredient",
                i as i64,
                input.item.id.0,
                input.item.name,
                input.amount,
                entry.buildings_for(input.amount),
            ])?;
        }
        for (kind, allocs) in [
            ("recipe", &entry.recipe_allocations),
            ("manual", &entry.manual_allocations),
        ] {
            for (i, a) in allocs.iter().enumerate() {
                insert_alloc.execute(params![
                    entry_id,
                    kind,
                    i as i64,
                    a.item.as_ref().map(|item| item.id.0),
                    a.label,
                    a.amount,
                    a.building_count,
                ])?;
            }
        }
    }

    let mut insert_resource = conn.prepare(
        "INSERT INTO planner_resources (planner_id, position, item_id, amount)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (pos, r) in planner.resources.iter().enumerate() {
        insert_resource.execute(params![
            planner.id.to_string(),
            pos as i64,
            r.item.id.0,
            r.amount
        ])?;
    }

    Ok(())
}

fn remove_planner_rows(conn: &Connection, id: PlannerId) -> Result<usize> {
    let key = id.to_string();
    conn.execute(
        "DELETE FROM entry_allocations
         WHERE entry_id IN (SELECT id FROM planner_entries WHERE planner_id = ?1)",
        [&key],
    )?;
    conn.execute("DELETE FROM planner_entries WHERE planner_id = ?1", [&key])?;
    conn.execute("DELETE FROM planner_resources WHERE planner_id = ?1", [&key])?;
    Ok(conn.execute("DELETE FROM planners WHERE id = ?1", [&key])?)
}

pub fn delete_planner(conn: &Connection, id: PlannerId) -> Result<()> {
    if remove_planner_rows(conn, id)? == 0 {
        return Err(PlannerError::not_found("planner", id));
    }
    Ok(())
}

struct EntryRow {
    id: String,
    target_item_id: i64,
    recipe_id: i64,
    building_count: f64,
    outgoing_amount: f64,
    building_override: Option<f64>,
    root: bool,
}

/// Load a planner, resolving its items and recipes against `catalog`.
pub fn load_planner(conn: &Connection, catalog: &MemoryCatalog, id: PlannerId) -> Result<Planner> {
    let key = id.to_string();
    let header = conn
        .query_row(
            "SELECT name, mode, generator_id, target_type, target_amount
             FROM planners WHERE id = ?1",
            [&key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| PlannerError::not_found("planner", id))?;
    let (name, mode, generator_id, target_type, target_amount) = header;

    let mode = match (mode.as_str(), generator_id, target_type, target_amount) {
        ("FACTORY", _, _, _) => PlannerMode::Factory,
        ("FUEL", Some(generator_id), Some(target_type), Some(target_amount)) => {
            let generator = catalog.generator(GeneratorId(generator_id))?;
            PlannerMode::Fuel(builder::fuel_target(
                generator,
                parse_column(&target_type, "target type")?,
                target_amount,
            )?)
        }
        (other, ..) => {
            return Err(PlannerError::DataInconsistency(format!(
                "planner {} has unusable mode '{}'",
                id, other
            )));
        }
    };

    let mut stmt = conn.prepare(
        "SELECT id, target_item_id, recipe_id, building_count, outgoing_amount,
                building_override, is_root
         FROM planner_entries WHERE planner_id = ?1 ORDER BY position",
    )?;
    let entry_rows = stmt
        .query_map([&key], |row| {
            Ok(EntryRow {
                id: row.get(0)?,
                target_item_id: row.get(1)?,
                recipe_id: row.get(2)?,
                building_count: row.get(3)?,
                outgoing_amount: row.get(4)?,
                building_override: row.get(5)?,
                root: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut allocs = conn.prepare(
        "SELECT item_id, label, amount, building_count FROM entry_allocations
         WHERE entry_id = ?1 AND kind = ?2 ORDER BY position",
    )?;

    let mut entries = Vec::with_capacity(entry_rows.len());
    for row in entry_rows {
        let context = format!("entry {}", row.id);
        let recipe = catalog.recipe(RecipeId(row.recipe_id)).cloned().map_err(|_| {
            PlannerError::DataInconsistency(format!(
                "{} references missing recipe {}",
                context, row.recipe_id
            ))
        })?;

        let mut load_allocs = |kind: &str| -> Result<Vec<Allocation>> {
            let raw = allocs
                .query_map(params![row.id, kind], |r| {
                    Ok((
                        r.get::<_, Option<i64>>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, f64>(2)?,
                        r.get::<_, f64>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raw.into_iter()
                .map(|(item_id, label, amount, building_count)| -> Result<Allocation> {
                    Ok(Allocation {
                        item: item_id
                            .map(|i| stored_item(catalog, i, &context))
                            .transpose()?,
                        label,
                        amount,
                        building_count,
                    })
                })
                .collect()
        };

        let ingredient_allocations = load_allocs("ingredient")?
            .into_iter()
            .map(|a| {
                a.item
                    .map(|item| ItemAmount::new(item, a.amount))
                    .ok_or_else(|| {
                        PlannerError::DataInconsistency(format!(
                            "{} has an ingredient allocation without an item",
                            context
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let recipe_allocations = load_allocs("recipe")?;
        let manual_allocations = load_allocs("manual")?;

        entries.push(Entry {
            id: parse_column::<EntryId>(&row.id, "entry id")?,
            planner_id: id,
            target_item: stored_item(catalog, row.target_item_id, &context)?,
            recipe,
            building_count: row.building_count,
            outgoing_amount: row.outgoing_amount,
            building_override: row
                .building_override
                .map_or(BuildingOverride::Auto, BuildingOverride::Overridden),
            root: row.root,
            ingredient_allocations,
            recipe_allocations,
            manual_allocations,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT item_id, amount FROM planner_resources WHERE planner_id = ?1 ORDER BY position",
    )?;
    let stored = stmt
        .query_map([&key], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut resources = Vec::with_capacity(stored.len());
    for (item_id, amount) in stored {
        resources.push(ItemAmount::new(
            stored_item(catalog, item_id, "planner resources")?,
            amount,
        ));
    }

    Ok(Planner {
        id,
        name,
        mode,
        entries,
        resources,
    })
}

/// List all planners by name
pub fn list_planners(conn: &Connection) -> Result<Vec<PlannerSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.mode, COUNT(e.id)
         FROM planners p
         LEFT JOIN planner_entries e ON e.planner_id = p.id
         GROUP BY p.id
         ORDER BY p.name, p.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut results = Vec::with_capacity(rows.len());
    for (id, name, mode, count) in rows {
        results.push(PlannerSummary {
            id: parse_column(&id, "planner id")?,
            name,
            mode,
            entry_count: count as usize,
        });
    }
    Ok(results)
}

/// Owning planner of an entry
pub fn planner_id_for_entry(conn: &Connection, entry_id: EntryId) -> Result<PlannerId> {
    let raw: String = conn
        .query_row(
            "SELECT planner_id FROM planner_entries WHERE id = ?1",
            [entry_id.to_string()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| PlannerError::not_found("entry", entry_id))?;
    parse_column(&raw, "planner id")
}

/// Planners with at least one entry running `recipe_id`
pub fn planners_using_recipe(conn: &Connection, recipe_id: RecipeId) -> Result<Vec<PlannerId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT planner_id FROM planner_entries WHERE recipe_id = ?1 ORDER BY planner_id",
    )?;
    let rows = stmt
        .query_map([recipe_id.0], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.iter().map(|raw| parse_column(raw, "planner id")).collect()
}
