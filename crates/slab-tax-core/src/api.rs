//! JSON-friendly entry points wrapping [`TaxEngine`] in the standard output envelope.

use std::collections::BTreeSet;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::context::ContextPoint;
use crate::deductions::{DeductionItem, DeductionSelection};
use crate::engine::{IncomeAssessment, SlabUpdateOutcome, TaxComputation, TaxEngine, UpdateAction};
use crate::error::SlabTaxError;
use crate::income::IncomeRecord;
use crate::schedule::{Slab, SlabTable};
use crate::types::{with_metadata, ComputationOutput, EngineMode, EvaluationMode, Money};
use crate::SlabTaxResult;

// ---------------------------------------------------------------------------
// Tax evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxQuery {
    pub income: Money,
    /// Auxiliary context parameters, excluding income.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Decimal>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxEvaluationInput {
    /// Defaults to the Indian new-regime schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<SlabTable>,
    #[serde(default)]
    pub context_points: Vec<ContextPoint>,
    /// Applied in order before any query is evaluated.
    #[serde(default)]
    pub slab_updates: Vec<Vec<Slab>>,
    pub queries: Vec<TaxQuery>,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxEvaluationOutput {
    pub results: Vec<TaxComputation>,
    pub updates: Vec<SlabUpdateOutcome>,
    pub final_mode: EngineMode,
    pub active_slabs: usize,
    pub total_tax: Money,
}

/// Evaluate a batch of incomes against one schedule, optionally after a series
/// of slab updates.
pub fn evaluate_tax(
    input: &TaxEvaluationInput,
) -> SlabTaxResult<ComputationOutput<TaxEvaluationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.queries.is_empty() {
        return Err(SlabTaxError::InsufficientData(
            "At least one income query is required".into(),
        ));
    }

    let schedule = input
        .schedule
        .clone()
        .unwrap_or_else(SlabTable::india_new_regime);
    let mut engine = TaxEngine::new(schedule, input.context_points.clone(), input.config.clone())?;

    let mut updates = Vec::with_capacity(input.slab_updates.len());
    for slabs in &input.slab_updates {
        updates.push(engine.update_slabs(slabs.clone())?);
    }
    if updates.iter().any(|u| u.action == UpdateAction::Merged) && engine.mode() == EngineMode::Dynamic
    {
        warnings.push(format!(
            "Slab updates were merged incrementally; engine is in dynamic mode ({})",
            EvaluationMode::DynamicFlatRate.describe()
        ));
    }

    let mut results = Vec::with_capacity(input.queries.len());
    for query in &input.queries {
        results.push(engine.calculate_tax(query.income, query.params.as_deref())?);
    }

    let approximate: BTreeSet<&'static str> = results
        .iter()
        .filter(|r| !r.exact)
        .map(|r| r.evaluation_mode.describe())
        .collect();
    for description in approximate {
        warnings.push(format!("Approximate result: {description}"));
    }
    for r in results.iter().filter(|r| r.beyond_ceiling) {
        warnings.push(beyond_ceiling_warning(r));
    }

    let total_tax = results.iter().map(|r| r.tax).sum();
    let output = TaxEvaluationOutput {
        final_mode: engine.mode(),
        active_slabs: engine.active_slab_count(),
        total_tax,
        results,
        updates,
    };

    let methodology = match (engine.mode(), engine.static_index().mode()) {
        (EngineMode::Dynamic, _) => "Ordered dynamic store, floor-slab flat rate",
        (EngineMode::Static, EvaluationMode::SparseMaxRate) => {
            "Sparse-table range maximum, flat max-rate approximation"
        }
        _ => "Binary-searched slab with cumulative prefix sums",
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, input, warnings, elapsed, output))
}

fn beyond_ceiling_warning(r: &TaxComputation) -> String {
    match r.evaluation_mode {
        EvaluationMode::ExactPrefix => format!(
            "Income {} exceeds the highest slab bound; income above the bound is untaxed",
            r.income
        ),
        mode => format!(
            "Income {} exceeds the highest slab bound; the whole income was taxed at one rate ({})",
            r.income,
            mode.describe()
        ),
    }
}

// ---------------------------------------------------------------------------
// Income record assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub record: IncomeRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<SlabTable>,
    #[serde(default)]
    pub config: EngineConfig,
}

/// Net taxable income, tax and TDS settlement for one income record.
pub fn assess_income(input: &AssessmentInput) -> SlabTaxResult<ComputationOutput<IncomeAssessment>> {
    let start = Instant::now();
    let mut warnings = input.record.validate()?;

    let schedule = input
        .schedule
        .clone()
        .unwrap_or_else(SlabTable::india_new_regime);
    let engine = TaxEngine::new(schedule, Vec::new(), input.config.clone())?;
    let assessment = engine.assess(&input.record)?;

    if !assessment.evaluation_mode.is_exact() {
        warnings.push(format!(
            "Approximate result: {}",
            assessment.evaluation_mode.describe()
        ));
    }
    if assessment.refund_due > Decimal::ZERO {
        warnings.push(format!(
            "TDS exceeds computed tax; refund of {} due",
            assessment.refund_due
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Net taxable = (gross salary + other income - exemptions) - (section 16 + chapter VI-A); slab tax less TDS",
        input,
        warnings,
        elapsed,
        assessment,
    ))
}

// ---------------------------------------------------------------------------
// Deduction optimization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionInput {
    pub items: Vec<DeductionItem>,
    pub budget: u64,
    #[serde(default)]
    pub config: EngineConfig,
}

/// Highest-value subset of deductions within the budget.
pub fn optimize_deductions(
    input: &DeductionInput,
) -> SlabTaxResult<ComputationOutput<DeductionSelection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    input.config.validate()?;

    let selection = crate::deductions::optimize(&input.items, input.budget, &input.config)?;

    let unaffordable = input
        .items
        .iter()
        .filter(|item| item.cost > input.budget)
        .count();
    if unaffordable > 0 {
        warnings.push(format!(
            "{unaffordable} item(s) cost more than the budget of {} and were excluded",
            input.budget
        ));
    }

    let methodology = match selection.strategy {
        crate::deductions::OptimizationStrategy::ExhaustiveBitmask => {
            "0/1 knapsack by exhaustive bitmask enumeration"
        }
        crate::deductions::OptimizationStrategy::KnapsackDp => {
            "0/1 knapsack by dynamic programming over budget units"
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, input, warnings, elapsed, selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn query(income: Decimal) -> TaxQuery {
        TaxQuery {
            income,
            params: None,
        }
    }

    #[test]
    fn test_evaluate_default_schedule() {
        let input = TaxEvaluationInput {
            schedule: None,
            context_points: vec![],
            slab_updates: vec![],
            queries: vec![query(dec!(300000)), query(dec!(900000))],
            config: EngineConfig::default(),
        };
        let out = evaluate_tax(&input).unwrap();
        assert_eq!(out.result.results[0].tax, Decimal::ZERO);
        assert_eq!(out.result.results[1].tax, dec!(29999.85));
        assert_eq!(out.result.total_tax, dec!(29999.85));
        assert_eq!(out.result.final_mode, EngineMode::Static);
        assert!(out.warnings.is_empty());
        assert!(out.methodology.contains("prefix"));
    }

    #[test]
    fn test_evaluate_requires_queries() {
        let input = TaxEvaluationInput {
            schedule: None,
            context_points: vec![],
            slab_updates: vec![],
            queries: vec![],
            config: EngineConfig::default(),
        };
        assert!(evaluate_tax(&input).is_err());
    }

    #[test]
    fn test_evaluate_after_merge_warns_about_flat_rate() {
        let input = TaxEvaluationInput {
            schedule: None,
            context_points: vec![],
            slab_updates: vec![vec![Slab::unbounded(dec!(5000000), dec!(0.35))]],
            queries: vec![query(dec!(6000000))],
            config: EngineConfig::default(),
        };
        let out = evaluate_tax(&input).unwrap();
        assert_eq!(out.result.final_mode, EngineMode::Dynamic);
        assert_eq!(out.result.results[0].tax, dec!(2100000));
        assert!(out.warnings.iter().any(|w| w.contains("dynamic mode")));
        assert!(out.warnings.iter().any(|w| w.starts_with("Approximate")));
    }

    #[test]
    fn test_evaluate_from_json() {
        let json = r#"{
            "schedule": [
                {"lower_bound": 0, "upper_bound": 400000, "rate": "0"},
                {"lower_bound": 400001, "upper_bound": 800000, "rate": "0.05"},
                {"lower_bound": 800001, "upper_bound": 1200000, "rate": "0.10"}
            ],
            "queries": [{"income": 1300000}]
        }"#;
        let input: TaxEvaluationInput = serde_json::from_str(json).unwrap();
        let out = evaluate_tax(&input).unwrap();
        assert!(out.result.results[0].beyond_ceiling);
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("exceeds the highest slab") && w.contains("untaxed")));
    }

    #[test]
    fn test_beyond_ceiling_after_merge_describes_flat_rate() {
        let input = TaxEvaluationInput {
            schedule: Some(
                SlabTable::new(vec![Slab::bounded(dec!(0), dec!(1000), dec!(0.1))]).unwrap(),
            ),
            context_points: vec![],
            slab_updates: vec![vec![Slab::bounded(dec!(1000), dec!(2000), dec!(0.2))]],
            queries: vec![query(dec!(5000))],
            config: EngineConfig::default(),
        };
        let out = evaluate_tax(&input).unwrap();
        let result = &out.result.results[0];
        assert!(result.beyond_ceiling);
        assert_eq!(result.evaluation_mode, EvaluationMode::DynamicFlatRate);
        assert_eq!(result.tax, dec!(1000));

        let warning = out
            .warnings
            .iter()
            .find(|w| w.contains("exceeds the highest slab"))
            .unwrap();
        assert!(warning.contains("whole income was taxed at one rate"));
        assert!(!warning.contains("untaxed"));
    }

    #[test]
    fn test_assess_income_envelope() {
        let input = AssessmentInput {
            record: IncomeRecord {
                pan: "ABCDE1234F".into(),
                assessment_year: 2024,
                employment_from: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
                employment_to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                gross_salary: dec!(700000),
                exemptions: dec!(0),
                section16_deductions: dec!(50000),
                other_income: dec!(0),
                chapter6_deductions: dec!(0),
                tds: dec!(20000),
            },
            schedule: None,
            config: EngineConfig::default(),
        };
        let out = assess_income(&input).unwrap();
        // (650000 - 400001) * 0.05
        assert_eq!(out.result.total_tax, dec!(12499.95));
        assert_eq!(out.result.refund_due, dec!(7500.05));
        assert!(out.warnings.iter().any(|w| w.contains("refund")));
    }

    #[test]
    fn test_optimize_deductions_envelope() {
        let input = DeductionInput {
            items: vec![
                DeductionItem::new(dec!(100), 10),
                DeductionItem::new(dec!(60), 4),
                DeductionItem::new(dec!(120), 30),
                DeductionItem::new(dec!(500), 41),
            ],
            budget: 40,
            config: EngineConfig::default(),
        };
        let out = optimize_deductions(&input).unwrap();
        assert_eq!(out.result.max_value, dec!(220));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.methodology.contains("bitmask"));
    }
}
