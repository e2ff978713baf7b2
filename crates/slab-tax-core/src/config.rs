use serde::{Deserialize, Serialize};

use crate::error::SlabTaxError;
use crate::SlabTaxResult;

/// Slab-count change above which `update_slabs` rebuilds instead of merging.
pub const DEFAULT_REBUILD_THRESHOLD: usize = 10;

/// Slab count at which the static index switches from prefix sums to a sparse table.
pub const DEFAULT_SPARSE_TABLE_THRESHOLD: usize = 1000;

/// Deduction sets smaller than this are solved by exhaustive subset enumeration.
pub const DEFAULT_EXHAUSTIVE_ITEM_LIMIT: usize = 20;

/// Upper bound on `items * (budget + 1)` for the knapsack DP tables.
pub const DEFAULT_MAX_DP_CELLS: usize = 50_000_000;

/// Strategy used to resolve a context point from the k-d tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSearch {
    /// Branch-and-bound nearest neighbour.
    #[default]
    Exact,
    /// Descend toward the target and compare only the nodes on that path.
    DescentOnly,
}

/// Tunables for a [`crate::engine::TaxEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rebuild_threshold: usize,
    pub sparse_table_threshold: usize,
    pub exhaustive_item_limit: usize,
    pub max_dp_cells: usize,
    pub context_search: ContextSearch,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rebuild_threshold: DEFAULT_REBUILD_THRESHOLD,
            sparse_table_threshold: DEFAULT_SPARSE_TABLE_THRESHOLD,
            exhaustive_item_limit: DEFAULT_EXHAUSTIVE_ITEM_LIMIT,
            max_dp_cells: DEFAULT_MAX_DP_CELLS,
            context_search: ContextSearch::Exact,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> SlabTaxResult<()> {
        if self.sparse_table_threshold == 0 {
            return Err(SlabTaxError::InvalidInput {
                field: "sparse_table_threshold".into(),
                reason: "Sparse table threshold must be at least 1".into(),
            });
        }
        // 2^n masks are enumerated in a u64
        if self.exhaustive_item_limit > 32 {
            return Err(SlabTaxError::InvalidInput {
                field: "exhaustive_item_limit".into(),
                reason: format!(
                    "Exhaustive enumeration is limited to 32 items, got {}",
                    self.exhaustive_item_limit
                ),
            });
        }
        if self.max_dp_cells == 0 {
            return Err(SlabTaxError::InvalidInput {
                field: "max_dp_cells".into(),
                reason: "DP cell limit must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rebuild_threshold, 10);
        assert_eq!(config.sparse_table_threshold, 1000);
        assert_eq!(config.exhaustive_item_limit, 20);
        assert_eq!(config.context_search, ContextSearch::Exact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"rebuild_threshold": 3, "context_search": "descent_only"}"#)
                .unwrap();
        assert_eq!(config.rebuild_threshold, 3);
        assert_eq!(config.sparse_table_threshold, DEFAULT_SPARSE_TABLE_THRESHOLD);
        assert_eq!(config.context_search, ContextSearch::DescentOnly);
    }

    #[test]
    fn test_oversized_exhaustive_limit_rejected() {
        let config = EngineConfig {
            exhaustive_item_limit: 40,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
