use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Which one-dimensional lookup structure the engine consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Rebuilt slab table with precomputed prefix sums (or sparse table).
    #[default]
    Static,
    /// Incrementally merged ordered store.
    Dynamic,
}

/// How a tax amount was produced.
///
/// Only `ExactPrefix` is a bracket-by-bracket progressive computation. The other
/// variants are approximations and callers must not treat them as interchangeable
/// with the exact path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Prefix-sum progressive computation over the static slab table.
    ExactPrefix,
    /// Maximum slab rate (sparse table) applied to the whole income.
    SparseMaxRate,
    /// Rate of the floor slab in the dynamic store applied to the whole income.
    DynamicFlatRate,
    /// Rate of the nearest context point applied to the whole income.
    ContextNearest,
    /// Rate of the point reached by a single k-d descent, which may not be the
    /// nearest one.
    ContextDescent,
}

impl EvaluationMode {
    pub fn is_exact(self) -> bool {
        matches!(self, EvaluationMode::ExactPrefix)
    }

    pub fn describe(self) -> &'static str {
        match self {
            EvaluationMode::ExactPrefix => "exact progressive prefix-sum evaluation",
            EvaluationMode::SparseMaxRate => {
                "flat approximation: maximum slab rate applied to the whole income"
            }
            EvaluationMode::DynamicFlatRate => {
                "flat approximation: floor slab rate applied to the whole income"
            }
            EvaluationMode::ContextNearest => {
                "context rate: nearest context point rate applied to the whole income"
            }
            EvaluationMode::ContextDescent => {
                "approximate context rate: descent-only k-d search, may miss the nearest point"
            }
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_prefix_mode_is_exact() {
        assert!(EvaluationMode::ExactPrefix.is_exact());
        assert!(!EvaluationMode::SparseMaxRate.is_exact());
        assert!(!EvaluationMode::DynamicFlatRate.is_exact());
        assert!(!EvaluationMode::ContextNearest.is_exact());
        assert!(!EvaluationMode::ContextDescent.is_exact());
    }

    #[test]
    fn test_modes_serialize_snake_case() {
        let json = serde_json::to_string(&EvaluationMode::SparseMaxRate).unwrap();
        assert_eq!(json, "\"sparse_max_rate\"");
        let mode: EngineMode = serde_json::from_str("\"dynamic\"").unwrap();
        assert_eq!(mode, EngineMode::Dynamic);
    }
}
