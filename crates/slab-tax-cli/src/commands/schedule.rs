use serde_json::{json, Value};

use slab_tax_core::SlabTable;

/// Print the built-in slab schedule.
pub fn run_schedule() -> Result<Value, Box<dyn std::error::Error>> {
    let table = SlabTable::india_new_regime();
    Ok(json!({ "results": serde_json::to_value(&table)? }))
}
