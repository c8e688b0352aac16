//! Raw-resource totals for a planner

use std::collections::HashMap;

use crate::models::{Entry, ItemAmount, ItemId, Planner};

/// Sum the resource ingredients of every entry, grouped by item in the order
/// items are first seen.
pub fn aggregate(entries: &[Entry]) -> Vec<ItemAmount> {
    let mut totals: Vec<ItemAmount> = Vec::new();
    let mut index: HashMap<ItemId, usize> = HashMap::new();

    for input in entries
        .iter()
        .flat_map(|e| e.ingredient_allocations.iter())
        .filter(|i| i.item.is_resource)
    {
        match index.get(&input.item.id) {
            Some(&i) => totals[i].amount += input.amount,
            None => {
                index.insert(input.item.id, totals.len());
                totals.push(input.clone());
            }
        }
    }

    totals
}

/// Replace the planner's resource list with fresh totals.
pub fn refresh(planner: &mut Planner) {
    planner.resources = aggregate(&planner.entries);
}
