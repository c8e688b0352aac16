//! Production chain planner for Satisfactory-style factory games
//!
//! Planners hold a graph of entries, one per produced item. Editing an entry
//! (its recipe, a pinned building count, a manual side allocation) ripples
//! demand through the rest of the graph and re-totals the raw resources.

pub mod builder;
pub mod catalog;
pub mod db;
pub mod error;
pub mod import;
pub mod ledger;
pub mod models;
pub mod overclock;
pub mod report;
pub mod resources;
pub mod ripple;
pub mod service;

pub use catalog::{Catalog, MemoryCatalog};
pub use error::{PlannerError, Result};
pub use service::{FuelSettings, PlannerService};
