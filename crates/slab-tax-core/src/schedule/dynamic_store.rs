use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::slab::{Slab, SlabTable};
use crate::types::{EvaluationMode, Money};

/// Ordered slab store for incremental schedule edits.
///
/// Slabs are keyed by lower bound; inserting a slab whose lower bound is already
/// present replaces the stored slab. Lookups take the floor slab and apply its
/// rate to the entire income, so results are flat-rate approximations tagged
/// [`EvaluationMode::DynamicFlatRate`].
#[derive(Debug, Clone, Default)]
pub struct DynamicRangeStore {
    slabs: BTreeMap<Money, Slab>,
}

impl DynamicRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: &SlabTable) -> Self {
        let mut store = Self::new();
        store.merge(table.slabs().iter().copied());
        store
    }

    /// Returns the slab previously stored at the same lower bound, if any.
    pub fn insert(&mut self, slab: Slab) -> Option<Slab> {
        self.slabs.insert(slab.lower_bound, slab)
    }

    pub fn merge(&mut self, slabs: impl IntoIterator<Item = Slab>) -> usize {
        let mut replaced = 0;
        for slab in slabs {
            if self.insert(slab).is_some() {
                replaced += 1;
            }
        }
        replaced
    }

    pub fn len(&self) -> usize {
        self.slabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }

    /// Slab with the greatest lower bound not above `income`.
    pub fn floor(&self, income: Money) -> Option<&Slab> {
        self.slabs.range(..=income).next_back().map(|(_, slab)| slab)
    }

    /// Slab with the highest lower bound.
    pub fn highest(&self) -> Option<&Slab> {
        self.slabs.values().next_back()
    }

    /// Number of stored slabs whose lower bound is at or below `income`. Linear
    /// in the number of slabs counted.
    pub fn rank(&self, income: Money) -> usize {
        self.slabs.range(..=income).count()
    }

    pub fn slabs(&self) -> impl Iterator<Item = &Slab> {
        self.slabs.values()
    }

    pub fn tax(&self, income: Money) -> (Money, EvaluationMode) {
        let tax = self
            .floor(income)
            .map_or(Decimal::ZERO, |slab| income * slab.rate);
        (tax, EvaluationMode::DynamicFlatRate)
    }
}
