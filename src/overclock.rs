//! Clock-speed adjustments for building counts, burn time and power draw
//!
//! Every input is the value at a 100% clock. Results are rounded to two
//! decimals, half-up.

use crate::catalog::Catalog;
use crate::error::{PlannerError, Result};
use crate::models::Planner;

/// log2(2.5) - 1: power grows superlinearly with clock speed.
pub const ENERGY_EXPONENT: f64 = 0.321928;

pub const MIN_CLOCK: f64 = 1.0;
pub const MAX_CLOCK: f64 = 250.0;

pub fn validate_clock(clock_percent: f64) -> Result<f64> {
    if (MIN_CLOCK..=MAX_CLOCK).contains(&clock_percent) {
        Ok(clock_percent)
    } else {
        Err(PlannerError::InvalidArgument(format!(
            "clock speed must be between {}% and {}%, got {}%",
            MIN_CLOCK, MAX_CLOCK, clock_percent
        )))
    }
}

/// Buildings needed for the same output at `clock_percent`.
pub fn building_count(raw_count: f64, clock_percent: f64) -> f64 {
    round2(raw_count * 100.0 / clock_percent)
}

pub fn burn_time(base_burn_time: f64, clock_percent: f64) -> f64 {
    round2(base_burn_time * 100.0 / clock_percent)
}

pub fn power_per_building(base_power: f64, clock_percent: f64) -> f64 {
    round2(base_power * (clock_percent / 100.0))
}

/// Total draw of `raw_count` buildings' worth of output run at `clock_percent`.
pub fn total_power(raw_count: f64, base_power: f64, clock_percent: f64) -> f64 {
    let initial = raw_count * base_power;
    round2(initial * (clock_percent / 100.0).powf(ENERGY_EXPONENT))
}

// Half-up to two decimals; negative halves round toward +inf.
fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Power figures for a whole planner at one clock speed.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSummary {
    pub clock_percent: f64,
    pub consumption: f64,
    pub buildings: Vec<(String, f64)>, // (recipe name, adjusted count)
    pub generation: Option<f64>,
    pub fuel_burn_time: Option<f64>,
}

/// Sum building power across entries and, for fuel planners, the output of
/// the generators they feed.
pub fn power_summary(
    planner: &Planner,
    catalog: &impl Catalog,
    clock_percent: f64,
) -> Result<PowerSummary> {
    let clock = validate_clock(clock_percent)?;

    let mut consumption = 0.0;
    let mut buildings = Vec::with_capacity(planner.entries.len());
    for entry in &planner.entries {
        if let Some(kind) = entry.recipe.building {
            let building = catalog.building(kind)?;
            consumption += total_power(entry.building_count, building.power_usage, clock);
        }
        buildings.push((
            entry.recipe.name.clone(),
            building_count(entry.building_count, clock),
        ));
    }

    let (generation, fuel_burn_time) = match planner.fuel_target() {
        Some(target) => (
            Some(round2(
                target.generator_building_count
                    * power_per_building(target.generator.power_output, clock),
            )),
            Some(burn_time(target.generator.burn_time, clock)),
        ),
        None => (None, None),
    };

    Ok(PowerSummary {
        clock_percent: clock,
        consumption: round2(consumption),
        buildings,
        generation,
        fuel_burn_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_count_scales_inversely() {
        assert_eq!(building_count(3.0, 150.0), 2.0);
        assert_eq!(building_count(1.0, 250.0), 0.4);
        assert_eq!(building_count(1.0, 3.0), 33.33);
    }

    #[test]
    fn burn_time_scales_inversely() {
        assert_eq!(burn_time(10.0, 200.0), 5.0);
    }

    #[test]
    fn power_per_building_is_linear() {
        assert_eq!(power_per_building(30.0, 250.0), 75.0);
    }

    #[test]
    fn total_power_uses_energy_exponent() {
        let expected = 4.0 * 75.0 * 1.5_f64.powf(0.321928);
        assert_eq!(total_power(4.0, 75.0, 150.0), (expected * 100.0 + 0.5).floor() / 100.0);
        assert_eq!(total_power(4.0, 75.0, 150.0), 341.83);
        assert_eq!(total_power(2.0, 4.0, 100.0), 8.0);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(2.0), 2.0);
    }

    #[test]
    fn clock_outside_range_is_rejected() {
        assert!(validate_clock(0.5).is_err());
        assert!(validate_clock(250.5).is_err());
        assert_eq!(validate_clock(250.0).unwrap(), 250.0);
    }
}
