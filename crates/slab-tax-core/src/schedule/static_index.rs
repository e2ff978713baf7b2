use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::slab::SlabTable;
use crate::error::SlabTaxError;
use crate::types::{EvaluationMode, Money, Rate};
use crate::SlabTaxResult;

/// Highest income covered by a run of slabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ceiling {
    Bounded(Money),
    Unbounded,
}

impl Ceiling {
    pub fn is_exceeded_by(self, income: Money) -> bool {
        match self {
            Ceiling::Bounded(limit) => income > limit,
            Ceiling::Unbounded => false,
        }
    }

    /// Highest covered income, `None` when the schedule is open-ended.
    pub fn as_money(self) -> Option<Money> {
        match self {
            Ceiling::Bounded(limit) => Some(limit),
            Ceiling::Unbounded => None,
        }
    }
}

/// Precomputed evaluation structure over a static [`SlabTable`].
///
/// Small tables carry cumulative prefix sums for an exact progressive lookup.
/// Once the table reaches the sparse threshold the prefix array is dropped in
/// favour of a range-maximum sparse table, and every income is taxed at the
/// highest slab rate. That fallback is a flat approximation and is reported as
/// [`EvaluationMode::SparseMaxRate`].
#[derive(Debug, Clone)]
pub struct StaticRangeIndex {
    table: SlabTable,
    evaluator: Evaluator,
    ceilings: UpperBoundTree,
}

#[derive(Debug, Clone)]
enum Evaluator {
    Prefix(Vec<Money>),
    Sparse(SparseTable),
}

impl StaticRangeIndex {
    pub fn build(table: SlabTable, sparse_threshold: usize) -> Self {
        let evaluator = if table.len() < sparse_threshold {
            Evaluator::Prefix(build_prefix(&table))
        } else {
            let rates: Vec<Rate> = table.slabs().iter().map(|s| s.rate).collect();
            Evaluator::Sparse(SparseTable::build(&rates))
        };
        let ceilings = UpperBoundTree::build(&table);
        debug!(
            slabs = table.len(),
            sparse = matches!(evaluator, Evaluator::Sparse(_)),
            "built static range index"
        );
        Self {
            table,
            evaluator,
            ceilings,
        }
    }

    pub fn table(&self) -> &SlabTable {
        &self.table
    }

    pub fn mode(&self) -> EvaluationMode {
        match self.evaluator {
            Evaluator::Prefix(_) => EvaluationMode::ExactPrefix,
            Evaluator::Sparse(_) => EvaluationMode::SparseMaxRate,
        }
    }

    /// Cumulative tax at each slab's lower bound; `None` in sparse mode.
    pub fn prefix(&self) -> Option<&[Money]> {
        match &self.evaluator {
            Evaluator::Prefix(prefix) => Some(prefix),
            Evaluator::Sparse(_) => None,
        }
    }

    /// Tax owed on `income` together with the mode that produced it.
    pub fn tax(&self, income: Money) -> (Money, EvaluationMode) {
        match &self.evaluator {
            Evaluator::Prefix(prefix) => {
                let tax = match self.table.locate(income) {
                    Some(idx) => prefix[idx] + self.table.slabs()[idx].tax_within(income),
                    None => Decimal::ZERO,
                };
                (tax, EvaluationMode::ExactPrefix)
            }
            Evaluator::Sparse(sparse) => {
                let rate = sparse.full_range_max().unwrap_or(Decimal::ZERO);
                (income * rate, EvaluationMode::SparseMaxRate)
            }
        }
    }

    /// Highest rate among slabs `first..=last`.
    pub fn max_rate(&self, first: usize, last: usize) -> SlabTaxResult<Rate> {
        let n = self.table.len();
        if first > last || last >= n {
            return Err(SlabTaxError::InvalidInput {
                field: "slab range".into(),
                reason: format!("range {first}..={last} is outside 0..{n}"),
            });
        }
        let found = match &self.evaluator {
            Evaluator::Sparse(sparse) => sparse.query(first, last),
            Evaluator::Prefix(_) => self.table.slabs()[first..=last]
                .iter()
                .map(|s| s.rate)
                .max(),
        };
        found.ok_or_else(|| SlabTaxError::InsufficientData("empty slab range".into()))
    }

    /// Highest income the whole table covers.
    pub fn covered_ceiling(&self) -> Ceiling {
        self.ceilings.query(0, self.table.len())
    }

    /// Highest upper bound among slabs `first..last` (half-open).
    pub fn ceiling_between(&self, first: usize, last: usize) -> Ceiling {
        self.ceilings.query(first, last.min(self.table.len()))
    }
}

fn build_prefix(table: &SlabTable) -> Vec<Money> {
    let mut prefix = Vec::with_capacity(table.len());
    let mut running = Decimal::ZERO;
    for slab in table.slabs() {
        prefix.push(running);
        // only the last slab can be open-ended, and nothing follows it
        running += slab.width().unwrap_or(Decimal::ZERO) * slab.rate;
    }
    prefix
}

/// Range-maximum table: `levels[j][i]` holds the max over `2^j` rates starting at `i`.
#[derive(Debug, Clone)]
struct SparseTable {
    levels: Vec<Vec<Rate>>,
}

impl SparseTable {
    fn build(rates: &[Rate]) -> Self {
        let n = rates.len();
        let mut levels: Vec<Vec<Rate>> = Vec::new();
        if n == 0 {
            return Self { levels };
        }
        levels.push(rates.to_vec());
        let mut j = 1;
        while (1usize << j) <= n {
            let half = 1usize << (j - 1);
            let prev = &levels[j - 1];
            let row: Vec<Rate> = (0..=n - (1usize << j))
                .map(|i| prev[i].max(prev[i + half]))
                .collect();
            levels.push(row);
            j += 1;
        }
        Self { levels }
    }

    fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    fn query(&self, first: usize, last: usize) -> Option<Rate> {
        if first > last || last >= self.len() {
            return None;
        }
        let span = last - first + 1;
        let j = (usize::BITS - 1 - span.leading_zeros()) as usize;
        let row = &self.levels[j];
        Some(row[first].max(row[last + 1 - (1usize << j)]))
    }

    fn full_range_max(&self) -> Option<Rate> {
        match self.len() {
            0 => None,
            n => self.query(0, n - 1),
        }
    }
}

/// Bottom-up segment tree over slab upper bounds.
#[derive(Debug, Clone)]
struct UpperBoundTree {
    len: usize,
    nodes: Vec<Ceiling>,
}

impl UpperBoundTree {
    fn build(table: &SlabTable) -> Self {
        let len = table.len();
        let mut nodes = vec![Ceiling::Bounded(Decimal::ZERO); 2 * len];
        for (i, slab) in table.slabs().iter().enumerate() {
            nodes[len + i] = match slab.upper_bound {
                Some(upper) => Ceiling::Bounded(upper),
                None => Ceiling::Unbounded,
            };
        }
        for i in (1..len).rev() {
            nodes[i] = nodes[2 * i].max(nodes[2 * i + 1]);
        }
        Self { len, nodes }
    }

    /// Max over leaves `first..last`.
    fn query(&self, first: usize, last: usize) -> Ceiling {
        let mut best = Ceiling::Bounded(Decimal::ZERO);
        let (mut lo, mut hi) = (first + self.len, last.min(self.len) + self.len);
        while lo < hi {
            if lo & 1 == 1 {
                best = best.max(self.nodes[lo]);
                lo += 1;
            }
            if hi & 1 == 1 {
                hi -= 1;
                best = best.max(self.nodes[hi]);
            }
            lo >>= 1;
            hi >>= 1;
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::slab::Slab;
    use rust_decimal_macros::dec;

    fn three_slab_table() -> SlabTable {
        SlabTable::new(vec![
            Slab::bounded(dec!(0), dec!(400000), dec!(0.0)),
            Slab::bounded(dec!(400001), dec!(800000), dec!(0.05)),
            Slab::bounded(dec!(800001), dec!(1200000), dec!(0.10)),
        ])
        .unwrap()
    }

    #[test]
    fn test_three_slab_regression_value() {
        // (800000 - 400001) * 0.05 = 19999.95
        // (900000 - 800001) * 0.10 =  9999.90
        let index = StaticRangeIndex::build(three_slab_table(), 1000);
        let (tax, mode) = index.tax(dec!(900000));
        assert_eq!(tax, dec!(29999.85));
        assert_eq!(mode, EvaluationMode::ExactPrefix);
    }

    #[test]
    fn test_prefix_entries() {
        let index = StaticRangeIndex::build(three_slab_table(), 1000);
        assert_eq!(
            index.prefix().unwrap(),
            &[dec!(0), dec!(0), dec!(19999.95)]
        );
    }

    #[test]
    fn test_zero_rate_slab_and_empty_table() {
        let index = StaticRangeIndex::build(three_slab_table(), 1000);
        assert_eq!(index.tax(dec!(250000)).0, Decimal::ZERO);

        let empty = StaticRangeIndex::build(SlabTable::empty(), 1000);
        assert_eq!(empty.tax(dec!(1000000)).0, Decimal::ZERO);
        assert_eq!(empty.covered_ceiling(), Ceiling::Bounded(Decimal::ZERO));
    }

    #[test]
    fn test_income_in_boundary_gap_is_continuous() {
        let index = StaticRangeIndex::build(three_slab_table(), 1000);
        let at_upper = index.tax(dec!(800000)).0;
        let in_gap = index.tax(dec!(800000.5)).0;
        let at_next_lower = index.tax(dec!(800001)).0;
        assert_eq!(at_upper, dec!(19999.95));
        assert_eq!(in_gap, at_upper);
        assert_eq!(at_next_lower, at_upper);
    }

    #[test]
    fn test_income_above_bounded_table_caps_at_last_slab() {
        let index = StaticRangeIndex::build(three_slab_table(), 1000);
        let top = index.tax(dec!(1200000)).0;
        assert_eq!(index.tax(dec!(5000000)).0, top);
        assert!(index.covered_ceiling().is_exceeded_by(dec!(5000000)));
        assert_eq!(index.covered_ceiling(), Ceiling::Bounded(dec!(1200000)));
    }

    #[test]
    fn test_sparse_fallback_applies_max_rate_to_whole_income() {
        let index = StaticRangeIndex::build(three_slab_table(), 3);
        let (tax, mode) = index.tax(dec!(900000));
        assert_eq!(mode, EvaluationMode::SparseMaxRate);
        assert_eq!(tax, dec!(90000));
        assert!(index.prefix().is_none());
        // zero-rate income is still taxed at the maximum: the approximation is coarse
        assert_eq!(index.tax(dec!(100)).0, dec!(10));
    }

    #[test]
    fn test_sparse_range_max_matches_scan() {
        let rates = [
            dec!(0.01),
            dec!(0.07),
            dec!(0.03),
            dec!(0.02),
            dec!(0.09),
            dec!(0.04),
            dec!(0.05),
        ];
        let slabs: Vec<Slab> = rates
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let lower = Decimal::from(i as u64 * 100);
                Slab::bounded(lower, lower + dec!(100), *r)
            })
            .collect();
        let sparse = StaticRangeIndex::build(SlabTable::new(slabs.clone()).unwrap(), 1);
        let exact = StaticRangeIndex::build(SlabTable::new(slabs).unwrap(), 1000);
        for first in 0..rates.len() {
            for last in first..rates.len() {
                assert_eq!(
                    sparse.max_rate(first, last).unwrap(),
                    exact.max_rate(first, last).unwrap(),
                    "range {first}..={last}"
                );
            }
        }
        assert!(sparse.max_rate(3, 2).is_err());
        assert!(sparse.max_rate(0, 7).is_err());
    }

    #[test]
    fn test_ceiling_unbounded_and_ranges() {
        let index = StaticRangeIndex::build(SlabTable::india_new_regime(), 1000);
        assert_eq!(index.covered_ceiling(), Ceiling::Unbounded);
        assert!(!index.covered_ceiling().is_exceeded_by(dec!(99999999)));
        assert_eq!(index.ceiling_between(0, 3), Ceiling::Bounded(dec!(1200000)));
        assert_eq!(index.ceiling_between(2, 4), Ceiling::Bounded(dec!(1600000)));
    }

    #[test]
    fn test_default_regime_top_bracket() {
        // 0 + 19999.95 + 39999.90 + 59999.85 + 79999.80 + 99999.75 = 299999.25
        // + (3000000 - 2400001) * 0.30 = 179999.70
        let index = StaticRangeIndex::build(SlabTable::india_new_regime(), 1000);
        assert_eq!(index.tax(dec!(3000000)).0, dec!(479998.95));
    }
}
