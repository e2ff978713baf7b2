use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SlabTaxError;
use crate::types::Money;
use crate::SlabTaxResult;

/// Flat salary record as produced by upstream extraction or manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub pan: String,
    pub assessment_year: i32,
    pub employment_from: NaiveDate,
    pub employment_to: NaiveDate,
    pub gross_salary: Money,
    #[serde(default)]
    pub exemptions: Money,
    #[serde(default)]
    pub section16_deductions: Money,
    #[serde(default)]
    pub other_income: Money,
    #[serde(default)]
    pub chapter6_deductions: Money,
    #[serde(default)]
    pub tds: Money,
}

impl IncomeRecord {
    pub fn gross_income(&self) -> Money {
        self.gross_salary + self.other_income
    }

    /// Gross income less exemptions; can be negative.
    pub fn taxable_income(&self) -> Money {
        self.gross_income() - self.exemptions
    }

    pub fn total_deductions(&self) -> Money {
        self.section16_deductions + self.chapter6_deductions
    }

    /// Income the slab schedule is applied to, floored at zero.
    pub fn net_taxable_income(&self) -> Money {
        (self.taxable_income() - self.total_deductions()).max(Decimal::ZERO)
    }

    /// Rejects negative amounts and inverted employment periods. Soft problems
    /// (an unusual PAN) are returned as warnings.
    pub fn validate(&self) -> SlabTaxResult<Vec<String>> {
        let amounts = [
            ("gross_salary", self.gross_salary),
            ("exemptions", self.exemptions),
            ("section16_deductions", self.section16_deductions),
            ("other_income", self.other_income),
            ("chapter6_deductions", self.chapter6_deductions),
            ("tds", self.tds),
        ];
        for (field, amount) in amounts {
            if amount < Decimal::ZERO {
                return Err(SlabTaxError::InvalidInput {
                    field: field.into(),
                    reason: format!("Amount cannot be negative, got {amount}"),
                });
            }
        }
        if self.employment_from > self.employment_to {
            return Err(SlabTaxError::InvalidInput {
                field: "employment_from".into(),
                reason: format!(
                    "Employment start {} is after employment end {}",
                    self.employment_from, self.employment_to
                ),
            });
        }

        let mut warnings = Vec::new();
        if !is_well_formed_pan(&self.pan) {
            warnings.push(format!(
                "PAN '{}' does not match the AAAAA9999A format",
                self.pan
            ));
        }
        if self.taxable_income() < self.total_deductions() {
            warnings.push("Deductions exceed taxable income; net taxable income floored at zero".into());
        }
        Ok(warnings)
    }
}

fn is_well_formed_pan(pan: &str) -> bool {
    let bytes = pan.as_bytes();
    bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_record() -> IncomeRecord {
        IncomeRecord {
            pan: "ABCDE1234F".into(),
            assessment_year: 2024,
            employment_from: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
            employment_to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            gross_salary: dec!(1500000),
            exemptions: dec!(100000),
            section16_deductions: dec!(50000),
            other_income: dec!(20000),
            chapter6_deductions: dec!(150000),
            tds: dec!(60000),
        }
    }

    #[test]
    fn test_net_taxable_income() {
        let record = sample_record();
        // (1500000 + 20000 - 100000) - (50000 + 150000)
        assert_eq!(record.gross_income(), dec!(1520000));
        assert_eq!(record.taxable_income(), dec!(1420000));
        assert_eq!(record.net_taxable_income(), dec!(1220000));
        assert!(record.validate().unwrap().is_empty());
    }

    #[test]
    fn test_net_taxable_floored_at_zero() {
        let record = IncomeRecord {
            gross_salary: dec!(100000),
            other_income: dec!(0),
            chapter6_deductions: dec!(150000),
            ..sample_record()
        };
        assert_eq!(record.net_taxable_income(), Decimal::ZERO);
        assert_eq!(record.validate().unwrap().len(), 1);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let record = IncomeRecord {
            tds: dec!(-1),
            ..sample_record()
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_inverted_employment_period_rejected() {
        let record = IncomeRecord {
            employment_from: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            ..sample_record()
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_malformed_pan_is_a_warning() {
        let record = IncomeRecord {
            pan: "abc".into(),
            ..sample_record()
        };
        let warnings = record.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("PAN"));
    }

    #[test]
    fn test_missing_optional_amounts_default_to_zero() {
        let json = r#"{
            "pan": "ABCDE1234F",
            "assessment_year": 2024,
            "employment_from": "2023-04-01",
            "employment_to": "2024-03-31",
            "gross_salary": 900000
        }"#;
        let record: IncomeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.net_taxable_income(), dec!(900000));
    }
}
