use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SlabTaxError;
use crate::types::{Money, Rate};
use crate::SlabTaxResult;

/// A contiguous income range taxed at a single flat rate.
///
/// `upper_bound = None` marks the open-ended top slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slab {
    pub lower_bound: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<Money>,
    pub rate: Rate,
}

impl Slab {
    pub fn new(lower_bound: Money, upper_bound: Option<Money>, rate: Rate) -> Self {
        Self {
            lower_bound,
            upper_bound,
            rate,
        }
    }

    pub fn bounded(lower_bound: Money, upper_bound: Money, rate: Rate) -> Self {
        Self::new(lower_bound, Some(upper_bound), rate)
    }

    pub fn unbounded(lower_bound: Money, rate: Rate) -> Self {
        Self::new(lower_bound, None, rate)
    }

    /// Width of the range, `None` for the open-ended slab.
    pub fn width(&self) -> Option<Money> {
        self.upper_bound.map(|upper| upper - self.lower_bound)
    }

    pub fn contains(&self, income: Money) -> bool {
        income >= self.lower_bound && self.upper_bound.map_or(true, |upper| income <= upper)
    }

    /// Tax accrued inside this slab alone for the given income.
    pub fn tax_within(&self, income: Money) -> Money {
        let capped = match self.upper_bound {
            Some(upper) => income.min(upper),
            None => income,
        };
        (capped - self.lower_bound).max(Decimal::ZERO) * self.rate
    }

    /// Checks one slab in isolation; `index` is only used for error reporting.
    pub fn validate(&self, index: usize) -> SlabTaxResult<()> {
        if self.lower_bound < Decimal::ZERO {
            return Err(SlabTaxError::InvalidSchedule {
                index,
                reason: format!("lower bound {} is negative", self.lower_bound),
            });
        }
        if let Some(upper) = self.upper_bound {
            if upper <= self.lower_bound {
                return Err(SlabTaxError::InvalidSchedule {
                    index,
                    reason: format!(
                        "upper bound {upper} must exceed lower bound {}",
                        self.lower_bound
                    ),
                });
            }
        }
        if self.rate < Decimal::ZERO || self.rate > Decimal::ONE {
            return Err(SlabTaxError::InvalidSchedule {
                index,
                reason: format!("rate {} must be between 0 and 1", self.rate),
            });
        }
        Ok(())
    }
}

/// Ordered, non-overlapping slabs forming a tax schedule.
///
/// Construction validates but never reorders or repairs the input. Gaps between
/// one slab's upper bound and the next slab's lower bound are accepted, which
/// covers integer-inclusive schedules such as `0..=400000, 400001..=800000`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Slab>", into = "Vec<Slab>")]
pub struct SlabTable {
    slabs: Vec<Slab>,
}

impl SlabTable {
    pub fn new(slabs: Vec<Slab>) -> SlabTaxResult<Self> {
        validate_schedule(&slabs)?;
        Ok(Self { slabs })
    }

    pub fn empty() -> Self {
        Self { slabs: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }

    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    pub fn get(&self, index: usize) -> Option<&Slab> {
        self.slabs.get(index)
    }

    /// Index of the slab with the greatest lower bound not above `income`.
    ///
    /// An income equal to a lower bound belongs to that slab. Returns `None` when
    /// the income sits below the first slab or the table is empty.
    pub fn locate(&self, income: Money) -> Option<usize> {
        let past = self.slabs.partition_point(|s| s.lower_bound <= income);
        past.checked_sub(1)
    }

    /// Indian new-regime individual slabs (FY 2025-26).
    pub fn india_new_regime() -> Self {
        Self {
            slabs: vec![
                Slab::bounded(dec!(0), dec!(400000), dec!(0.0)),
                Slab::bounded(dec!(400001), dec!(800000), dec!(0.05)),
                Slab::bounded(dec!(800001), dec!(1200000), dec!(0.10)),
                Slab::bounded(dec!(1200001), dec!(1600000), dec!(0.15)),
                Slab::bounded(dec!(1600001), dec!(2000000), dec!(0.20)),
                Slab::bounded(dec!(2000001), dec!(2400000), dec!(0.25)),
                Slab::unbounded(dec!(2400001), dec!(0.30)),
            ],
        }
    }
}

impl TryFrom<Vec<Slab>> for SlabTable {
    type Error = SlabTaxError;

    fn try_from(slabs: Vec<Slab>) -> Result<Self, Self::Error> {
        SlabTable::new(slabs)
    }
}

impl From<SlabTable> for Vec<Slab> {
    fn from(table: SlabTable) -> Self {
        table.slabs
    }
}

/// Rejects unsorted, overlapping, or otherwise malformed schedules.
pub fn validate_schedule(slabs: &[Slab]) -> SlabTaxResult<()> {
    for (index, slab) in slabs.iter().enumerate() {
        slab.validate(index)?;
    }
    for (index, pair) in slabs.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.lower_bound <= prev.lower_bound {
            return Err(SlabTaxError::InvalidSchedule {
                index: index + 1,
                reason: format!(
                    "lower bound {} is not above previous lower bound {}",
                    next.lower_bound, prev.lower_bound
                ),
            });
        }
        match prev.upper_bound {
            None => {
                return Err(SlabTaxError::InvalidSchedule {
                    index,
                    reason: "only the last slab may be unbounded".into(),
                });
            }
            Some(upper) if next.lower_bound < upper => {
                return Err(SlabTaxError::InvalidSchedule {
                    index: index + 1,
                    reason: format!(
                        "lower bound {} overlaps previous slab ending at {upper}",
                        next.lower_bound
                    ),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_slabs() -> Vec<Slab> {
        vec![
            Slab::bounded(dec!(0), dec!(400000), dec!(0.0)),
            Slab::bounded(dec!(400001), dec!(800000), dec!(0.05)),
            Slab::bounded(dec!(800001), dec!(1200000), dec!(0.10)),
        ]
    }

    #[test]
    fn test_locate_exact_lower_bound_belongs_to_slab() {
        let table = SlabTable::new(three_slabs()).unwrap();
        assert_eq!(table.locate(dec!(400001)), Some(1));
        assert_eq!(table.locate(dec!(400000)), Some(0));
        assert_eq!(table.locate(dec!(0)), Some(0));
        assert_eq!(table.locate(dec!(5000000)), Some(2));
    }

    #[test]
    fn test_locate_below_first_slab() {
        let table = SlabTable::new(vec![Slab::unbounded(dec!(1000), dec!(0.1))]).unwrap();
        assert_eq!(table.locate(dec!(999.99)), None);
        assert_eq!(SlabTable::empty().locate(dec!(10)), None);
    }

    #[test]
    fn test_unsorted_schedule_rejected() {
        let mut slabs = three_slabs();
        slabs.swap(0, 2);
        let err = SlabTable::new(slabs).unwrap_err();
        assert!(matches!(err, SlabTaxError::InvalidSchedule { index: 1, .. }));
    }

    #[test]
    fn test_overlapping_schedule_rejected() {
        let slabs = vec![
            Slab::bounded(dec!(0), dec!(500), dec!(0.0)),
            Slab::bounded(dec!(400), dec!(800), dec!(0.05)),
        ];
        assert!(SlabTable::new(slabs).is_err());
    }

    #[test]
    fn test_shared_boundary_allowed() {
        let slabs = vec![
            Slab::bounded(dec!(0), dec!(500), dec!(0.0)),
            Slab::unbounded(dec!(500), dec!(0.05)),
        ];
        assert!(SlabTable::new(slabs).is_ok());
    }

    #[test]
    fn test_unbounded_slab_must_be_last() {
        let slabs = vec![
            Slab::unbounded(dec!(0), dec!(0.0)),
            Slab::bounded(dec!(500), dec!(800), dec!(0.05)),
        ];
        assert!(SlabTable::new(slabs).is_err());
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        let slabs = vec![Slab::unbounded(dec!(0), dec!(1.5))];
        assert!(SlabTable::new(slabs).is_err());
    }

    #[test]
    fn test_default_regime_is_valid() {
        let table = SlabTable::india_new_regime();
        assert!(validate_schedule(table.slabs()).is_ok());
        assert_eq!(table.len(), 7);
        assert!(table.slabs().last().unwrap().upper_bound.is_none());
    }

    #[test]
    fn test_deserialize_validates() {
        let bad = r#"[{"lower_bound":"100","upper_bound":"50","rate":"0.1"}]"#;
        assert!(serde_json::from_str::<SlabTable>(bad).is_err());
        let good = r#"[{"lower_bound":"0","rate":"0.1"}]"#;
        let table: SlabTable = serde_json::from_str(good).unwrap();
        assert_eq!(table.len(), 1);
    }
}
