//! Text and JSON views of a planner
//!
//! Amounts are kept at full precision everywhere else; they are rounded to
//! two decimals (half-up) only here, and whole numbers print without a
//! fraction.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::models::{Allocation, BuildingOverride, Entry, ItemAmount, Planner, PlannerMode};
use crate::overclock::PowerSummary;

/// Round for display: two decimals, half-up, without negative zero.
pub fn display_round(value: f64) -> f64 {
    let rounded = (value * 100.0 + 0.5).floor() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

pub fn format_amount(value: f64) -> String {
    display_round(value).to_string()
}

fn amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let rounded = display_round(*value);
    if rounded.fract() == 0.0 && rounded.abs() < i64::MAX as f64 {
        serializer.serialize_i64(rounded as i64)
    } else {
        serializer.serialize_f64(rounded)
    }
}

fn optional_amount<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => amount(v, serializer),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Serialize)]
pub struct AmountReport {
    pub item: String,
    #[serde(serialize_with = "amount")]
    pub amount: f64,
}

impl From<&ItemAmount> for AmountReport {
    fn from(value: &ItemAmount) -> Self {
        Self {
            item: value.item.name.clone(),
            amount: value.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AllocationReport {
    pub label: String,
    #[serde(serialize_with = "amount")]
    pub amount: f64,
    #[serde(serialize_with = "amount")]
    pub building_count: f64,
}

#[derive(Debug, Serialize)]
pub struct EntryReport {
    pub id: String,
    pub item: String,
    pub recipe: String,
    pub alternate: bool,
    #[serde(serialize_with = "amount")]
    pub building_count: f64,
    #[serde(serialize_with = "optional_amount")]
    pub building_override: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub outgoing_amount: f64,
    pub root: bool,
    pub ingredients: Vec<AmountReport>,
    pub consumers: Vec<AllocationReport>,
    pub manual: Vec<AllocationReport>,
}

impl From<&Entry> for EntryReport {
    fn from(entry: &Entry) -> Self {
        let allocations = |list: &[Allocation]| -> Vec<AllocationReport> {
            list.iter()
                .map(|a| AllocationReport {
                    label: a.label.clone(),
                    amount: a.amount,
                    building_count: a.building_count,
                })
                .collect()
        };
        Self {
            id: entry.id.to_string(),
            item: entry.target_item.name.clone(),
            recipe: entry.recipe.name.clone(),
            alternate: entry.recipe.alternate,
            building_count: entry.building_count,
            building_override: match entry.building_override {
                BuildingOverride::Auto => None,
                BuildingOverride::Overridden(count) => Some(count),
            },
            outgoing_amount: entry.outgoing_amount,
            root: entry.root,
            ingredients: entry.ingredient_allocations.iter().map(AmountReport::from).collect(),
            consumers: allocations(&entry.recipe_allocations),
            manual: allocations(&entry.manual_allocations),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FuelReport {
    pub generator: String,
    pub fuel: String,
    pub target_type: String,
    #[serde(serialize_with = "amount")]
    pub target_amount: f64,
    #[serde(serialize_with = "amount")]
    pub fuel_rate: f64,
    #[serde(serialize_with = "amount")]
    pub generator_count: f64,
}

#[derive(Debug, Serialize)]
pub struct PowerReport {
    #[serde(serialize_with = "amount")]
    pub clock_percent: f64,
    #[serde(serialize_with = "amount")]
    pub consumption: f64,
    #[serde(serialize_with = "optional_amount")]
    pub generation: Option<f64>,
    #[serde(serialize_with = "optional_amount")]
    pub fuel_burn_time: Option<f64>,
    pub buildings: Vec<AmountReport>,
}

impl From<&PowerSummary> for PowerReport {
    fn from(power: &PowerSummary) -> Self {
        Self {
            clock_percent: power.clock_percent,
            consumption: power.consumption,
            generation: power.generation,
            fuel_burn_time: power.fuel_burn_time,
            buildings: power
                .buildings
                .iter()
                .map(|(recipe, count)| AmountReport {
                    item: recipe.clone(),
                    amount: *count,
                })
                .collect(),
        }
    }
}

/// Everything `planner show` prints.
#[derive(Debug, Serialize)]
pub struct PlannerReport {
    pub id: String,
    pub name: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel: Option<FuelReport>,
    pub entries: Vec<EntryReport>,
    pub resources: Vec<AmountReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerReport>,
}

impl PlannerReport {
    pub fn new(planner: &Planner, power: Option<&PowerSummary>) -> Self {
        let fuel = match &planner.mode {
            PlannerMode::Factory => None,
            PlannerMode::Fuel(t) => Some(FuelReport {
                generator: t.generator.generator_type.to_string(),
                fuel: t.fuel_item.item.name.clone(),
                target_type: t.target_type.to_string(),
                target_amount: t.target_amount,
                fuel_rate: t.fuel_rate,
                generator_count: t.generator_building_count,
            }),
        };
        Self {
            id: planner.id.to_string(),
            name: planner.name.clone(),
            mode: planner.mode.as_str().to_string(),
            fuel,
            entries: planner.entries.iter().map(EntryReport::from).collect(),
            resources: planner.resources.iter().map(AmountReport::from).collect(),
            power: power.map(PowerReport::from),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PlannerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] ({})", self.name, self.mode, self.id)?;
        if let Some(fuel) = &self.fuel {
            writeln!(
                f,
                "  {} x{} burning {} {}/min",
                fuel.generator,
                format_amount(fuel.generator_count),
                format_amount(fuel.fuel_rate),
                fuel.fuel
            )?;
        }

        if self.entries.is_empty() {
            writeln!(f, "\n  (no entries)")?;
        } else {
            writeln!(
                f,
                "\n  {:<38} {:<24} {:<30} {:>10} {:>12}",
                "Entry", "Item", "Recipe", "Buildings", "Output/min"
            )?;
            writeln!(f, "  {}", "-".repeat(118))?;
        }
        for e in &self.entries {
            let count = match e.building_override {
                Some(_) => format!("{}*", format_amount(e.building_count)),
                None => format_amount(e.building_count),
            };
            writeln!(
                f,
                "  {:<38} {:<24} {:<30} {:>10} {:>12}",
                e.id,
                e.item,
                e.recipe,
                count,
                format_amount(e.outgoing_amount)
            )?;
            for c in e.consumers.iter().chain(&e.manual) {
                writeln!(f, "      -> {} {}/min", c.label, format_amount(c.amount))?;
            }
        }

        if !self.resources.is_empty() {
            writeln!(f, "\n  Raw resources:")?;
            for r in &self.resources {
                writeln!(f, "    {:<24} {:>12}/min", r.item, format_amount(r.amount))?;
            }
        }

        if let Some(power) = &self.power {
            writeln!(f, "\n  Power at {}% clock:", format_amount(power.clock_percent))?;
            writeln!(f, "    Consumption: {} MW", format_amount(power.consumption))?;
            if let Some(generation) = power.generation {
                writeln!(f, "    Generation:  {} MW", format_amount(generation))?;
            }
            if let Some(burn) = power.fuel_burn_time {
                writeln!(f, "    Burn time:   {} s", format_amount(burn))?;
            }
        }
        Ok(())
    }
}
