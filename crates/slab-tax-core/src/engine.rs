//! Tax engine façade.
//!
//! Owns the static index, the optional dynamic store and the optional context
//! index, and decides which of them answers a query. Mutation goes through
//! `update_slabs(&mut self, ..)`; to share an engine across threads wrap it in an
//! `RwLock` so updates are serialized against readers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ContextSearch, EngineConfig};
use crate::context::{ContextPoint, ContextRateIndex};
use crate::deductions::{self, DeductionItem, DeductionSelection};
use crate::error::SlabTaxError;
use crate::income::IncomeRecord;
use crate::schedule::{DynamicRangeStore, Slab, SlabTable, StaticRangeIndex};
use crate::types::{EngineMode, EvaluationMode, Money, Rate};
use crate::SlabTaxResult;

/// Tax owed on one income, tagged with how it was computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComputation {
    pub income: Money,
    pub tax: Money,
    pub effective_rate: Rate,
    pub engine_mode: EngineMode,
    pub evaluation_mode: EvaluationMode,
    pub exact: bool,
    /// Income lies above the highest bound the schedule covers.
    pub beyond_ceiling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    Rebuilt,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabUpdateOutcome {
    pub action: UpdateAction,
    pub mode: EngineMode,
    pub slab_count_delta: usize,
    pub active_slabs: usize,
    /// Stored slabs overwritten by a merge at the same lower bound.
    pub replaced: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeAssessment {
    pub gross_income: Money,
    pub taxable_income: Money,
    pub deductions: Money,
    pub net_taxable: Money,
    pub total_tax: Money,
    pub tds: Money,
    pub tax_payable: Money,
    pub refund_due: Money,
    pub evaluation_mode: EvaluationMode,
}

#[derive(Debug, Clone)]
pub struct TaxEngine {
    config: EngineConfig,
    mode: EngineMode,
    static_index: StaticRangeIndex,
    dynamic: Option<DynamicRangeStore>,
    context: Option<ContextRateIndex>,
}

impl TaxEngine {
    pub fn new(
        table: SlabTable,
        context_points: Vec<ContextPoint>,
        config: EngineConfig,
    ) -> SlabTaxResult<Self> {
        config.validate()?;
        let context = if context_points.is_empty() {
            None
        } else {
            Some(ContextRateIndex::build(context_points)?)
        };
        let static_index = StaticRangeIndex::build(table, config.sparse_table_threshold);
        Ok(Self {
            config,
            mode: EngineMode::Static,
            static_index,
            dynamic: None,
            context,
        })
    }

    /// Engine over `table` with default tunables and no context points.
    pub fn with_schedule(table: SlabTable) -> Self {
        let config = EngineConfig::default();
        let static_index = StaticRangeIndex::build(table, config.sparse_table_threshold);
        Self {
            config,
            mode: EngineMode::Static,
            static_index,
            dynamic: None,
            context: None,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn static_index(&self) -> &StaticRangeIndex {
        &self.static_index
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Slab count of whichever structure the current mode consults.
    pub fn active_slab_count(&self) -> usize {
        match (self.mode, &self.dynamic) {
            (EngineMode::Dynamic, Some(store)) => store.len(),
            _ => self.static_index.table().len(),
        }
    }

    /// Tax on `income`.
    ///
    /// With `params` and a configured context index the nearest context point's
    /// rate is applied regardless of mode; otherwise the static index or dynamic
    /// store answers according to the current [`EngineMode`].
    pub fn calculate_tax(
        &self,
        income: Money,
        params: Option<&[Decimal]>,
    ) -> SlabTaxResult<TaxComputation> {
        if income < Decimal::ZERO {
            return Err(SlabTaxError::InvalidInput {
                field: "income".into(),
                reason: format!("Income cannot be negative, got {income}"),
            });
        }

        let (tax, evaluation_mode, beyond_ceiling) = match (params, &self.context) {
            (Some(params), Some(context)) => {
                let rate = self.context_rate(context, income, params)?;
                let mode = match self.config.context_search {
                    ContextSearch::Exact => EvaluationMode::ContextNearest,
                    ContextSearch::DescentOnly => EvaluationMode::ContextDescent,
                };
                (income * rate, mode, false)
            }
            _ => self.one_dimensional_tax(income),
        };

        if !evaluation_mode.is_exact() {
            debug!(%income, %tax, mode = ?evaluation_mode, "approximate tax evaluation");
        }

        Ok(TaxComputation {
            income,
            tax,
            effective_rate: if income > Decimal::ZERO {
                tax / income
            } else {
                Decimal::ZERO
            },
            engine_mode: self.mode,
            evaluation_mode,
            exact: evaluation_mode.is_exact(),
            beyond_ceiling,
        })
    }

    fn one_dimensional_tax(&self, income: Money) -> (Money, EvaluationMode, bool) {
        match (self.mode, &self.dynamic) {
            (EngineMode::Dynamic, Some(store)) => {
                let (tax, mode) = store.tax(income);
                let beyond = store
                    .highest()
                    .and_then(|slab| slab.upper_bound)
                    .map_or(false, |upper| income > upper);
                (tax, mode, beyond)
            }
            _ => {
                let (tax, mode) = self.static_index.tax(income);
                let beyond = !self.static_index.table().is_empty()
                    && self.static_index.covered_ceiling().is_exceeded_by(income);
                (tax, mode, beyond)
            }
        }
    }

    fn context_rate(
        &self,
        context: &ContextRateIndex,
        income: Money,
        params: &[Decimal],
    ) -> SlabTaxResult<Rate> {
        let mut target = Vec::with_capacity(params.len() + 1);
        target.push(income);
        target.extend_from_slice(params);
        let point = context.nearest_with(&target, self.config.context_search)?;
        Ok(point.map_or(Decimal::ZERO, |p| p.rate))
    }

    /// Replace or extend the slab schedule.
    ///
    /// When the slab count changes by more than `rebuild_threshold` the table is
    /// replaced and reindexed (Static mode). Otherwise the slabs are merged into
    /// the dynamic store, seeded from the current table on first use (Dynamic mode).
    pub fn update_slabs(&mut self, new_slabs: Vec<Slab>) -> SlabTaxResult<SlabUpdateOutcome> {
        let table = SlabTable::new(new_slabs)?;
        let slab_count_delta = table.len().abs_diff(self.active_slab_count());

        if slab_count_delta > self.config.rebuild_threshold {
            self.static_index = StaticRangeIndex::build(table, self.config.sparse_table_threshold);
            self.dynamic = None;
            self.mode = EngineMode::Static;
            info!(
                slab_count_delta,
                slabs = self.static_index.table().len(),
                "slab schedule rebuilt"
            );
            return Ok(SlabUpdateOutcome {
                action: UpdateAction::Rebuilt,
                mode: self.mode,
                slab_count_delta,
                active_slabs: self.active_slab_count(),
                replaced: 0,
            });
        }

        let seed = self.static_index.table();
        let store = self
            .dynamic
            .get_or_insert_with(|| DynamicRangeStore::from_table(seed));
        let replaced = store.merge(table.slabs().iter().copied());
        self.mode = EngineMode::Dynamic;
        info!(
            slab_count_delta,
            slabs = store.len(),
            replaced,
            "slabs merged into dynamic store"
        );
        Ok(SlabUpdateOutcome {
            action: UpdateAction::Merged,
            mode: self.mode,
            slab_count_delta,
            active_slabs: self.active_slab_count(),
            replaced,
        })
    }

    pub fn optimize_deductions(
        &self,
        items: &[DeductionItem],
        budget: u64,
    ) -> SlabTaxResult<DeductionSelection> {
        deductions::optimize(items, budget, &self.config)
    }

    /// Net taxable income, tax and TDS settlement for one income record.
    pub fn assess(&self, record: &IncomeRecord) -> SlabTaxResult<IncomeAssessment> {
        record.validate()?;
        let net_taxable = record.net_taxable_income();
        let computation = self.calculate_tax(net_taxable, None)?;
        let total_tax = computation.tax;
        Ok(IncomeAssessment {
            gross_income: record.gross_income(),
            taxable_income: record.taxable_income(),
            deductions: record.total_deductions(),
            net_taxable,
            total_tax,
            tds: record.tds,
            tax_payable: (total_tax - record.tds).max(Decimal::ZERO),
            refund_due: (record.tds - total_tax).max(Decimal::ZERO),
            evaluation_mode: computation.evaluation_mode,
        })
    }
}
