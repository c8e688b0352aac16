//! Factory Planner
//!
//! Plans production chains for Satisfactory-style factory games.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use factory_planner::catalog::{Catalog, MemoryCatalog};
use factory_planner::models::{EntryId, GeneratorId, PlannerId, RecipeId, TargetType};
use factory_planner::report::{PlannerReport, format_amount};
use factory_planner::{FuelSettings, PlannerError, PlannerService, overclock};

#[derive(Parser)]
#[command(name = "factory-planner")]
#[command(about = "Production chain planner for Satisfactory-style factory games")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "planner.db", env = "FACTORY_PLANNER_DB")]
    database: PathBuf,

    /// Log ripple passes and catalog lookups
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Replace the catalog with the bundled sample
    LoadSample,

    /// Import catalog TOML files from a directory
    Import {
        /// Directory searched recursively for *.toml files
        dir: PathBuf,

        /// Drop catalog records the files do not define
        #[arg(long)]
        clear: bool,
    },

    /// List all items in the catalog
    Items,

    /// List recipes, optionally only those producing one item
    Recipes {
        #[arg(short, long)]
        item: Option<String>,
    },

    /// List all generators in the catalog
    Generators,

    /// Show the effect of a clock speed on buildings and power
    Overclock {
        /// Clock speed in percent (1-250)
        #[arg(short, long)]
        clock: f64,

        /// Building count at 100%
        #[arg(short, long, default_value = "1.0")]
        buildings: f64,

        /// Power per building at 100%, in MW
        #[arg(short, long, default_value = "0.0")]
        power: f64,

        /// Generator burn time at 100%, in seconds
        #[arg(long)]
        burn_time: Option<f64>,
    },

    /// Create, inspect and edit planners
    #[command(subcommand)]
    Planner(PlannerCommand),

    /// Edit catalog recipes
    #[command(subcommand)]
    Recipe(RecipeCommand),
}

#[derive(Subcommand)]
enum PlannerCommand {
    /// List all planners
    List,

    /// Show a planner's entries and resource totals
    Show {
        planner: PlannerId,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Include a power summary at this clock speed
        #[arg(long)]
        clock: Option<f64>,
    },

    /// Create an empty factory planner
    CreateFactory { name: String },

    /// Create a planner that feeds a set of generators
    CreateFuel {
        name: String,

        /// Generator id or type (e.g. BIOMASS_BURNER)
        #[arg(short, long)]
        generator: String,

        /// GENERATOR_COUNT or FUEL_RATE
        #[arg(short, long, default_value = "GENERATOR_COUNT")]
        target_type: TargetType,

        #[arg(short, long)]
        amount: f64,
    },

    /// Place a recipe in a factory planner
    AddEntry {
        planner: PlannerId,

        /// Recipe id or name
        recipe: String,

        #[arg(short, long, default_value = "1.0")]
        buildings: f64,
    },

    /// Swap an entry's recipe, optionally pinning its building count
    SetRecipe {
        entry: EntryId,

        /// Recipe id or name
        recipe: String,

        #[arg(long = "override")]
        override_count: Option<f64>,
    },

    /// Set a manual allocation on an entry
    SetManual {
        entry: EntryId,
        label: String,
        amount: f64,
    },

    /// Remove a manual allocation from an entry
    RemoveManual { entry: EntryId, label: String },

    /// Delete an entry nothing depends on
    DeleteEntry { entry: EntryId },

    /// Change a fuel planner's generator or target
    FuelSettings {
        planner: PlannerId,

        /// Generator id or type
        #[arg(short, long)]
        generator: Option<String>,

        #[arg(short, long)]
        target_type: Option<TargetType>,

        #[arg(short, long)]
        amount: Option<f64>,
    },

    /// Delete a planner
    Delete { planner: PlannerId },
}

#[derive(Subcommand)]
enum RecipeCommand {
    /// Delete a recipe, moving planners onto a replacement first
    Delete {
        /// Recipe id or name
        recipe: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let mut service = PlannerService::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let stats = service.load_sample()?;
            println!("Sample catalog loaded. {}", stats);
        }

        Commands::Import { dir, clear } => {
            let stats = service.import_catalog(&dir, clear)?;
            println!("{}", stats);
        }

        Commands::Items => {
            let catalog = service.catalog();
            if catalog.items().next().is_none() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:>5} {:<30} {}", "Id", "Item", "Resource");
                println!("{}", "-".repeat(46));
                for item in catalog.items() {
                    println!(
                        "{:>5} {:<30} {}",
                        item.id.0,
                        item.name,
                        if item.is_resource { "yes" } else { "" }
                    );
                }
            }
        }

        Commands::Recipes { item } => {
            let catalog = service.catalog();
            let recipes = match &item {
                Some(name) => catalog.recipes_for_item(name),
                None => catalog.recipes().collect(),
            };
            if recipes.is_empty() {
                println!("No recipes found.");
            }
            for r in recipes {
                let inputs: Vec<String> = r
                    .ingredients
                    .iter()
                    .map(|i| format!("{} {}", format_amount(i.amount), i.item.name))
                    .collect();
                println!(
                    "{:>5} {:<32} {} {} <- {}{}",
                    r.id.0,
                    r.name,
                    format_amount(r.output.amount),
                    r.output.item.name,
                    inputs.join(" + "),
                    if r.alternate { "  (alternate)" } else { "" }
                );
            }
        }

        Commands::Generators => {
            for g in service.catalog().generators() {
                let fuels: Vec<String> = g
                    .fuel_items
                    .iter()
                    .map(|f| format!("{} {}/min", f.item.name, format_amount(f.amount)))
                    .collect();
                println!(
                    "{:>5} {:<22} {:>6} MW  fuel {}: {}",
                    g.id.0,
                    g.generator_type,
                    format_amount(g.power_output),
                    g.fuel_type,
                    fuels.join(", ")
                );
            }
        }

        Commands::Overclock {
            clock,
            buildings,
            power,
            burn_time,
        } => {
            overclock::validate_clock(clock)?;
            println!("At {}% clock:", format_amount(clock));
            println!(
                "  Buildings:          {}",
                format_amount(overclock::building_count(buildings, clock))
            );
            println!(
                "  Power per building: {} MW",
                format_amount(overclock::power_per_building(power, clock))
            );
            println!(
                "  Total power:        {} MW",
                format_amount(overclock::total_power(buildings, power, clock))
            );
            if let Some(base) = burn_time {
                println!(
                    "  Burn time:          {} s",
                    format_amount(overclock::burn_time(base, clock))
                );
            }
        }

        Commands::Planner(command) => run_planner(&mut service, command)?,

        Commands::Recipe(RecipeCommand::Delete { recipe }) => {
            let id = resolve_recipe(service.catalog(), &recipe)?;
            let changed = service.delete_recipe(id)?;
            println!("Recipe {} deleted; {} planner(s) updated.", id, changed);
        }
    }

    Ok(())
}

fn run_planner(service: &mut PlannerService, command: PlannerCommand) -> Result<()> {
    let planner = match command {
        PlannerCommand::List => {
            let planners = service.planners()?;
            if planners.is_empty() {
                println!("No planners yet.");
            }
            for p in planners {
                println!("{}  {:<8} {:<30} {} entries", p.id, p.mode, p.name, p.entry_count);
            }
            return Ok(());
        }

        PlannerCommand::Show {
            planner,
            json,
            clock,
        } => {
            let planner = service.planner(planner)?;
            let power = clock
                .map(|c| overclock::power_summary(&planner, service.catalog(), c))
                .transpose()?;
            let report = PlannerReport::new(&planner, power.as_ref());
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report);
            }
            return Ok(());
        }

        PlannerCommand::CreateFactory { name } => service.create_factory_planner(&name)?,

        PlannerCommand::CreateFuel {
            name,
            generator,
            target_type,
            amount,
        } => {
            let generator = resolve_generator(service.catalog(), &generator)?;
            service.create_fuel_planner(&name, generator, target_type, amount)?
        }

        PlannerCommand::AddEntry {
            planner,
            recipe,
            buildings,
        } => {
            let recipe = resolve_recipe(service.catalog(), &recipe)?;
            service.add_entry(planner, recipe, buildings)?
        }

        PlannerCommand::SetRecipe {
            entry,
            recipe,
            override_count,
        } => {
            let recipe = resolve_recipe(service.catalog(), &recipe)?;
            service.set_recipe(entry, recipe, override_count)?
        }

        PlannerCommand::SetManual {
            entry,
            label,
            amount,
        } => service.set_manual_allocation(entry, &label, amount)?,

        PlannerCommand::RemoveManual { entry, label } => {
            service.remove_manual_allocation(entry, &label)?
        }

        PlannerCommand::DeleteEntry { entry } => service.delete_entry(entry)?,

        PlannerCommand::FuelSettings {
            planner,
            generator,
            target_type,
            amount,
        } => {
            let generator_id = generator
                .map(|g| resolve_generator(service.catalog(), &g))
                .transpose()?;
            let settings = FuelSettings {
                generator_id,
                target_type,
                target_amount: amount,
            };
            service.update_fuel_settings(planner, settings)?
        }

        PlannerCommand::Delete { planner } => {
            service.delete_planner(planner)?;
            println!("Planner {} deleted.", planner);
            return Ok(());
        }
    };

    print!("{}", PlannerReport::new(&planner, None));
    Ok(())
}

/// Accept a numeric id or a (case-insensitive) recipe name.
fn resolve_recipe(catalog: &MemoryCatalog, key: &str) -> Result<RecipeId, PlannerError> {
    if let Ok(id) = key.trim().parse::<i64>() {
        return catalog.recipe(RecipeId(id)).map(|r| r.id);
    }
    catalog
        .recipe_by_name(key)
        .map(|r| r.id)
        .ok_or_else(|| PlannerError::not_found("recipe", key))
}

/// Accept a numeric id or a generator type such as "biomass burner".
fn resolve_generator(catalog: &MemoryCatalog, key: &str) -> Result<GeneratorId, PlannerError> {
    if let Ok(id) = key.trim().parse::<i64>() {
        return catalog.generator(GeneratorId(id)).map(|g| g.id);
    }
    catalog
        .generator_by_type(key)
        .map(|g| g.id)
        .ok_or_else(|| PlannerError::not_found("generator", key))
}
