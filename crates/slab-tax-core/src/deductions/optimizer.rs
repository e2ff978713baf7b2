use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::SlabTaxError;
use crate::types::Money;
use crate::SlabTaxResult;

/// A candidate deduction: claiming it yields `value` and consumes `cost` budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionItem {
    pub value: Money,
    pub cost: u64,
}

impl DeductionItem {
    pub fn new(value: Money, cost: u64) -> Self {
        Self { value, cost }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    /// Every subset enumerated as a bitmask.
    ExhaustiveBitmask,
    /// 0/1 knapsack over budget units.
    KnapsackDp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionSelection {
    pub max_value: Money,
    pub total_cost: u64,
    /// Indices into the input items, ascending.
    pub selected: Vec<usize>,
    pub strategy: OptimizationStrategy,
}

/// Select the subset of `items` with the highest total value whose total cost
/// stays within `budget`.
///
/// Sets below `config.exhaustive_item_limit` are solved by enumerating all `2^n`
/// subsets; larger sets use knapsack DP, which needs `items * (budget + 1)` cells
/// and is refused above `config.max_dp_cells`. Both are exact. Zero-cost items
/// are always worth taking, so a zero budget only yields zero when every item
/// has a positive cost.
pub fn optimize(
    items: &[DeductionItem],
    budget: u64,
    config: &EngineConfig,
) -> SlabTaxResult<DeductionSelection> {
    validate_items(items)?;

    if items.len() < config.exhaustive_item_limit {
        debug!(items = items.len(), budget, "exhaustive deduction search");
        exhaustive(items, budget)
    } else {
        debug!(items = items.len(), budget, "knapsack deduction search");
        knapsack(items, budget, config.max_dp_cells)
    }
}

/// Values are non-negative and their total fits in a `Decimal`, so no subset
/// sum can overflow.
fn validate_items(items: &[DeductionItem]) -> SlabTaxResult<()> {
    let mut total = Decimal::ZERO;
    for (i, item) in items.iter().enumerate() {
        if item.value < Decimal::ZERO {
            return Err(SlabTaxError::InvalidInput {
                field: format!("items[{i}].value"),
                reason: "Deduction value cannot be negative".into(),
            });
        }
        total = add_value(total, item.value)?;
    }
    Ok(())
}

fn add_value(acc: Money, value: Money) -> SlabTaxResult<Money> {
    acc.checked_add(value).ok_or_else(|| {
        SlabTaxError::CapacityExceeded(format!(
            "deduction values overflow the decimal range ({acc} + {value})"
        ))
    })
}

fn exhaustive(items: &[DeductionItem], budget: u64) -> SlabTaxResult<DeductionSelection> {
    let n = items.len();
    let mut best_value = Decimal::ZERO;
    let mut best_mask: u64 = 0;

    for mask in 0..(1u64 << n) {
        let mut value = Decimal::ZERO;
        let mut cost: u64 = 0;
        for (i, item) in items.iter().enumerate() {
            if mask & (1 << i) != 0 {
                value = add_value(value, item.value)?;
                cost = cost.saturating_add(item.cost);
            }
        }
        if cost <= budget && value > best_value {
            best_value = value;
            best_mask = mask;
        }
    }

    let selected: Vec<usize> = (0..n).filter(|i| best_mask & (1 << i) != 0).collect();
    Ok(DeductionSelection {
        max_value: best_value,
        total_cost: total_cost(items, &selected),
        selected,
        strategy: OptimizationStrategy::ExhaustiveBitmask,
    })
}

fn knapsack(
    items: &[DeductionItem],
    budget: u64,
    max_cells: usize,
) -> SlabTaxResult<DeductionSelection> {
    let width = usize::try_from(budget)
        .ok()
        .and_then(|b| b.checked_add(1))
        .ok_or_else(|| {
            SlabTaxError::CapacityExceeded(format!("budget {budget} does not fit in memory"))
        })?;
    let cells = items.len().checked_mul(width).unwrap_or(usize::MAX);
    if cells > max_cells {
        return Err(SlabTaxError::CapacityExceeded(format!(
            "knapsack needs {cells} cells for {} items and budget {budget}, limit is {max_cells}",
            items.len()
        )));
    }

    // best[w]: highest value reachable with total cost at most w
    let mut best = vec![Decimal::ZERO; width];
    let mut taken = vec![false; cells];

    for (i, item) in items.iter().enumerate() {
        if item.cost > budget {
            continue;
        }
        let cost = item.cost as usize;
        let row = i * width;
        // descending so each item is used at most once
        for w in (cost..width).rev() {
            let candidate = add_value(best[w - cost], item.value)?;
            if candidate > best[w] {
                best[w] = candidate;
                taken[row + w] = true;
            }
        }
    }

    let mut selected = Vec::new();
    let mut w = width - 1;
    for i in (0..items.len()).rev() {
        if taken[i * width + w] {
            selected.push(i);
            w -= items[i].cost as usize;
        }
    }
    selected.reverse();

    Ok(DeductionSelection {
        max_value: best[width - 1],
        total_cost: total_cost(items, &selected),
        selected,
        strategy: OptimizationStrategy::KnapsackDp,
    })
}

fn total_cost(items: &[DeductionItem], selected: &[usize]) -> u64 {
    selected
        .iter()
        .fold(0u64, |acc, &i| acc.saturating_add(items[i].cost))
}
