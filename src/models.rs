//! Data models for the catalog and for production planners

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::PlannerError;

/// Label of the manual allocation the fuel builder attaches to a fuel root.
pub const GENERATOR_FUEL_LABEL: &str = "Generator fuel";

/// Label of the manual allocation holding the buildings a user placed on a
/// root entry. It keeps its building count when the recipe changes.
pub const PLACED_LABEL: &str = "Placed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildingId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneratorId(pub i64);

/// Identifies a planner. Generated client-side so planners can be built
/// before they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlannerId(pub Uuid);

/// Identifies an entry across all planners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub Uuid);

macro_rules! uuid_id {
    ($name:ident, $kind:literal) => {
        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = PlannerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map($name).map_err(|e| {
                    PlannerError::InvalidArgument(format!("bad {} id '{}': {}", $kind, s, e))
                })
            }
        }
    };
}

uuid_id!(PlannerId, "planner");
uuid_id!(EntryId, "entry");

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares a catalog enum stored and parsed by its SCREAMING_SNAKE name.
macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = PlannerError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let key = raw.trim().to_uppercase().replace([' ', '-'], "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == key)
                    .ok_or_else(|| {
                        let known: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        PlannerError::InvalidArgument(format!(
                            "unrecognized {} '{}'; expected one of: {}",
                            $kind,
                            raw,
                            known.join(", ")
                        ))
                    })
            }
        }
    };
}

named_enum!(
    /// Production buildings recipes run in.
    BuildingType, "building type" {
        Smelter => "SMELTER",
        Constructor => "CONSTRUCTOR",
        Assembler => "ASSEMBLER",
        Manufacturer => "MANUFACTURER",
        Refinery => "REFINERY",
        Blender => "BLENDER",
        Foundry => "FOUNDRY",
        ParticleAccelerator => "PARTICLE_ACCELERATOR",
        Packager => "PACKAGER",
        Converter => "CONVERTER",
        QuantumEncoder => "QUANTUM_ENCODER",
    }
);

named_enum!(
    GeneratorType, "generator type" {
        BiomassBurner => "BIOMASS_BURNER",
        CoalGenerator => "COAL_GENERATOR",
        FuelGenerator => "FUEL_GENERATOR",
        NuclearReactor => "NUCLEAR_REACTOR",
        GeothermalGenerator => "GEOTHERMAL_GENERATOR",
    }
);

impl GeneratorType {
    /// Fuels this generator can burn. Geothermal generators burn nothing.
    pub fn allowed_fuels(&self) -> &'static [FuelType] {
        use FuelType::*;
        match self {
            GeneratorType::BiomassBurner => &[Biomass, SolidBiofuel, Wood, Leaves],
            GeneratorType::CoalGenerator => &[Coal, CompactedCoal, PetroleumCoke],
            GeneratorType::FuelGenerator => {
                &[Fuel, LiquidBiofuel, Turbofuel, RocketFuel, IonizedFuel]
            }
            GeneratorType::NuclearReactor => {
                &[UraniumFuelRod, PlutoniumFuelRod, FicsoniumFuelRod]
            }
            GeneratorType::GeothermalGenerator => &[],
        }
    }

    pub fn burns(&self, fuel: FuelType) -> bool {
        self.allowed_fuels().contains(&fuel)
    }
}

named_enum!(
    /// Fuel category a generator is planned around. The name doubles as the
    /// fuel item's name once underscores become spaces.
    FuelType, "fuel type" {
        Coal => "COAL",
        CompactedCoal => "COMPACTED_COAL",
        PetroleumCoke => "PETROLEUM_COKE",
        Water => "WATER",
        Fuel => "FUEL",
        LiquidBiofuel => "LIQUID_BIOFUEL",
        Turbofuel => "TURBOFUEL",
        RocketFuel => "ROCKET_FUEL",
        IonizedFuel => "IONIZED_FUEL",
        UraniumFuelRod => "URANIUM_FUEL_ROD",
        PlutoniumFuelRod => "PLUTONIUM_FUEL_ROD",
        FicsoniumFuelRod => "FICSONIUM_FUEL_ROD",
        Biomass => "BIOMASS",
        SolidBiofuel => "SOLID_BIOFUEL",
        Wood => "WOOD",
        Leaves => "LEAVES",
        Geothermal => "GEOTHERMAL",
    }
);

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub is_resource: bool, // Mined or harvested, never crafted
    pub icon_key: Option<String>,
}

/// An item paired with a per-minute amount.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAmount {
    pub item: Item,
    pub amount: f64,
}

impl ItemAmount {
    pub fn new(item: Item, amount: f64) -> Self {
        Self { item, amount }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: BuildingId,
    pub building_type: BuildingType,
    pub sort_order: i32,
    pub power_usage: f64, // MW at 100% clock
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub output: ItemAmount,
    pub ingredients: Vec<ItemAmount>,
    pub by_product: Option<ItemAmount>,
    pub building: Option<BuildingType>,
    pub alternate: bool,
    pub space_elevator: bool,
    pub fuel: bool,
    pub weapon_or_tool: bool,
    pub tier: i32,
}

impl Recipe {
    /// Output per building per minute.
    pub fn output_rate(&self) -> f64 {
        self.output.amount
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub id: GeneratorId,
    pub generator_type: GeneratorType,
    pub fuel_type: FuelType,
    pub power_output: f64, // MW
    pub burn_time: f64,    // seconds per unit of fuel
    pub by_product: Option<ItemAmount>,
    pub fuel_items: Vec<ItemAmount>, // amount = per minute per generator
}

/// Whether a fuel planner's target counts generators or units of fuel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    GeneratorCount,
    FuelRate,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::GeneratorCount => "GENERATOR_COUNT",
            TargetType::FuelRate => "FUEL_RATE",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = PlannerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "GENERATOR_COUNT" | "GENERATOR" | "GENERATORS" => Ok(TargetType::GeneratorCount),
            "FUEL_RATE" | "FUEL" => Ok(TargetType::FuelRate),
            _ => Err(PlannerError::InvalidArgument(format!(
                "unrecognized target type '{}'; expected GENERATOR_COUNT or FUEL_RATE",
                raw
            ))),
        }
    }
}

/// Everything a fuel planner derives from its generator and target.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelTarget {
    pub generator: Generator,
    pub target_type: TargetType,
    /// The amount as the user entered it (generators, or fuel per minute).
    pub target_amount: f64,
    /// Fuel per minute the root entry has to deliver.
    pub fuel_rate: f64,
    /// The matched fuel item and its per-generator consumption.
    pub fuel_item: ItemAmount,
    pub generator_building_count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerMode {
    Factory,
    Fuel(FuelTarget),
}

impl PlannerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerMode::Factory => "FACTORY",
            PlannerMode::Fuel(_) => "FUEL",
        }
    }
}

/// A user-pinned building count that propagation must leave alone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BuildingOverride {
    #[default]
    Auto,
    Overridden(f64),
}

impl BuildingOverride {
    pub fn is_auto(&self) -> bool {
        matches!(self, BuildingOverride::Auto)
    }
}

/// A demand edge into an entry, either from a consuming entry or from a
/// user-declared sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub item: Option<Item>, // None for manual sinks
    pub label: String,
    pub amount: f64,
    pub building_count: f64,
}

impl Allocation {
    pub fn is_placed(&self) -> bool {
        self.item.is_none() && self.label == PLACED_LABEL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub planner_id: PlannerId,
    pub target_item: Item,
    pub recipe: Recipe,
    pub building_count: f64,
    pub outgoing_amount: f64,
    pub building_override: BuildingOverride,
    /// Placed by the user or the fuel builder rather than by propagation.
    pub root: bool,
    pub ingredient_allocations: Vec<ItemAmount>,
    pub recipe_allocations: Vec<Allocation>,
    pub manual_allocations: Vec<Allocation>,
}

impl Entry {
    /// Build an entry for `recipe` running `building_count` buildings.
    pub fn new(planner_id: PlannerId, recipe: Recipe, building_count: f64, root: bool) -> Self {
        let mut entry = Entry {
            id: EntryId::new(),
            planner_id,
            target_item: recipe.output.item.clone(),
            recipe,
            building_count: 0.0,
            outgoing_amount: 0.0,
            building_override: BuildingOverride::Auto,
            root,
            ingredient_allocations: Vec::new(),
            recipe_allocations: Vec::new(),
            manual_allocations: Vec::new(),
        };
        entry.resize(building_count);
        entry
    }

    /// A user-placed root. The placed buildings are recorded as a reserved
    /// manual allocation so they add up with whatever else draws from it.
    pub fn placed(planner_id: PlannerId, recipe: Recipe, building_count: f64) -> Self {
        let mut entry = Entry::new(planner_id, recipe, building_count, true);
        entry.manual_allocations.push(Allocation {
            item: None,
            label: PLACED_LABEL.to_string(),
            amount: entry.outgoing_amount,
            building_count: entry.building_count,
        });
        entry
    }

    /// Buildings needed to deliver `amount` per minute with this entry's recipe.
    pub fn buildings_for(&self, amount: f64) -> f64 {
        amount / self.recipe.output_rate()
    }

    /// Sum of building counts every incoming allocation asks for.
    pub fn demanded_building_count(&self) -> f64 {
        let recipe: f64 = self.recipe_allocations.iter().map(|a| a.building_count).sum();
        let manual: f64 = self.manual_allocations.iter().map(|a| a.building_count).sum();
        recipe + manual
    }

    /// Set the building count and rebuild everything derived from it.
    /// Counts that are not positive fall back to a single building.
    pub fn resize(&mut self, building_count: f64) {
        let count = if building_count.is_finite() && building_count > 0.0 {
            building_count
        } else {
            1.0
        };
        self.building_count = count;
        self.outgoing_amount = count * self.recipe.output_rate();
        self.ingredient_allocations = self
            .recipe
            .ingredients
            .iter()
            .map(|input| ItemAmount::new(input.item.clone(), input.amount * count))
            .collect();
    }

    /// Swap in a recipe, keeping the current building count.
    pub fn apply_recipe(&mut self, recipe: Recipe) {
        self.target_item = recipe.output.item.clone();
        let rate = recipe.output_rate();
        self.recipe = recipe;
        for alloc in self
            .recipe_allocations
            .iter_mut()
            .chain(self.manual_allocations.iter_mut())
        {
            if alloc.is_placed() {
                alloc.amount = alloc.building_count * rate;
            } else {
                alloc.building_count = alloc.amount / rate;
            }
        }
        self.resize(self.building_count);
    }

    /// Size the entry from its allocations unless it is pinned. A root with
    /// no allocations at all keeps its current count.
    pub fn settle(&mut self) {
        match self.building_override {
            BuildingOverride::Auto => {
                let demanded = self.demanded_building_count();
                if self.root && demanded <= 0.0 {
                    self.resize(self.building_count);
                } else {
                    self.resize(demanded);
                }
            }
            BuildingOverride::Overridden(count) => self.resize(count),
        }
    }

    pub fn manual_allocation(&self, label: &str) -> Option<&Allocation> {
        self.manual_allocations
            .iter()
            .find(|a| a.label.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Planner {
    pub id: PlannerId,
    pub name: String,
    pub mode: PlannerMode,
    pub entries: Vec<Entry>,
    pub resources: Vec<ItemAmount>,
}

impl Planner {
    pub fn fuel_target(&self) -> Option<&FuelTarget> {
        match &self.mode {
            PlannerMode::Fuel(target) => Some(target),
            PlannerMode::Factory => None,
        }
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn entry_for_item(&self, item: ItemId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.target_item.id == item)
    }

    /// True for the entry that feeds the generators of a fuel planner.
    pub fn is_fuel_root(&self, entry: &Entry) -> bool {
        self.fuel_target()
            .is_some_and(|t| t.fuel_item.item.id == entry.target_item.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, name: &str, is_resource: bool) -> Item {
        Item {
            id: ItemId(id),
            name: name.to_string(),
            is_resource,
            icon_key: None,
        }
    }

    fn plate_recipe() -> Recipe {
        Recipe {
            id: RecipeId(1),
            name: "Iron Plate".to_string(),
            output: ItemAmount::new(item(2, "Iron Plate", false), 20.0),
            ingredients: vec![ItemAmount::new(item(1, "Iron Ingot", false), 30.0)],
            by_product: None,
            building: Some(BuildingType::Constructor),
            alternate: false,
            space_elevator: false,
            fuel: false,
            weapon_or_tool: false,
            tier: 0,
        }
    }

    #[test]
    fn fuel_type_parses_spaced_names() {
        assert_eq!("solid biofuel".parse::<FuelType>().unwrap(), FuelType::SolidBiofuel);
        assert_eq!("BIOMASS".parse::<FuelType>().unwrap(), FuelType::Biomass);
        assert!(matches!(
            "plasma".parse::<FuelType>(),
            Err(PlannerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn generators_burn_only_their_own_fuels() {
        assert!(GeneratorType::CoalGenerator.burns(FuelType::PetroleumCoke));
        assert!(GeneratorType::BiomassBurner.burns(FuelType::Leaves));
        assert!(!GeneratorType::CoalGenerator.burns(FuelType::Biomass));
        assert!(!GeneratorType::NuclearReactor.burns(FuelType::Fuel));
        assert!(GeneratorType::GeothermalGenerator.allowed_fuels().is_empty());
        // Every burnable fuel belongs to exactly one generator.
        let burnable = FuelType::ALL
            .iter()
            .filter(|f| !matches!(f, FuelType::Water | FuelType::Geothermal));
        for fuel in burnable {
            let owners = GeneratorType::ALL.iter().filter(|g| g.burns(*fuel)).count();
            assert_eq!(owners, 1, "{fuel}");
        }
    }

    #[test]
    fn target_type_accepts_aliases() {
        assert_eq!("generator-count".parse::<TargetType>().unwrap(), TargetType::GeneratorCount);
        assert_eq!("fuel_rate".parse::<TargetType>().unwrap(), TargetType::FuelRate);
    }

    #[test]
    fn entry_scales_ingredients_with_count() {
        let entry = Entry::new(PlannerId::new(), plate_recipe(), 2.0, true);
        assert_eq!(entry.outgoing_amount, 40.0);
        assert_eq!(entry.ingredient_allocations[0].amount, 60.0);
    }

    #[test]
    fn non_positive_count_falls_back_to_one_building() {
        let mut entry = Entry::new(PlannerId::new(), plate_recipe(), 2.0, true);
        entry.resize(0.0);
        assert_eq!(entry.building_count, 1.0);
        assert_eq!(entry.outgoing_amount, 20.0);
    }

    #[test]
    fn overridden_entry_settles_on_pin() {
        let mut entry = Entry::new(PlannerId::new(), plate_recipe(), 1.0, false);
        entry.building_override = BuildingOverride::Overridden(3.0);
        entry.settle();
        assert_eq!(entry.building_count, 3.0);
    }

    #[test]
    fn idle_root_keeps_placed_count() {
        let mut entry = Entry::new(PlannerId::new(), plate_recipe(), 4.0, true);
        entry.settle();
        assert_eq!(entry.building_count, 4.0);

        entry.root = false;
        entry.settle();
        assert_eq!(entry.building_count, 1.0);
    }

    #[test]
    fn placed_root_adds_manual_demand_on_top() {
        let mut entry = Entry::placed(PlannerId::new(), plate_recipe(), 2.0);
        assert_eq!(entry.manual_allocation(PLACED_LABEL).unwrap().amount, 40.0);

        entry.manual_allocations.push(Allocation {
            item: None,
            label: "Home Base".to_string(),
            amount: 30.0,
            building_count: entry.buildings_for(30.0),
        });
        entry.settle();
        assert_eq!(entry.building_count, 3.5);

        entry.manual_allocations.retain(|a| a.label != "Home Base");
        entry.settle();
        assert_eq!(entry.building_count, 2.0);
    }

    #[test]
    fn placed_buildings_survive_a_recipe_change() {
        let mut entry = Entry::placed(PlannerId::new(), plate_recipe(), 2.0);
        let mut faster = plate_recipe();
        faster.output.amount = 40.0;

        entry.apply_recipe(faster);
        let placed = entry.manual_allocation(PLACED_LABEL).unwrap();
        assert_eq!(placed.building_count, 2.0);
        assert_eq!(placed.amount, 80.0);
        entry.settle();
        assert_eq!(entry.building_count, 2.0);
    }

    #[test]
    fn planner_id_round_trips_through_text() {
        let id = PlannerId::new();
        assert_eq!(id.to_string().parse::<PlannerId>().unwrap(), id);
    }
}
