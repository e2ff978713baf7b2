use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use slab_tax_core::api::{self, DeductionInput};
use slab_tax_core::deductions::DeductionItem;
use slab_tax_core::EngineConfig;

use crate::input;

/// Arguments for deduction subset optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to a JSON/YAML deduction input ({"items": [...], "budget": n})
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated value:cost pairs (e.g. "100:10,60:4,120:30")
    #[arg(long, value_delimiter = ',', value_parser = parse_item)]
    pub items: Option<Vec<DeductionItem>>,

    /// Budget the selected costs must fit within
    #[arg(long)]
    pub budget: Option<u64>,
}

fn parse_item(raw: &str) -> Result<DeductionItem, String> {
    let (value, cost) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected value:cost, got '{raw}'"))?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value '{value}': {e}"))?;
    let cost: u64 = cost
        .trim()
        .parse()
        .map_err(|e| format!("invalid cost '{cost}': {e}"))?;
    Ok(DeductionItem::new(value, cost))
}

pub fn run_optimize(args: OptimizeArgs, config: Option<EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut opt_input: DeductionInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(items) = args.items {
        let budget = args
            .budget
            .ok_or("--budget is required together with --items")?;
        DeductionInput {
            items,
            budget,
            config: EngineConfig::default(),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file>, --items with --budget, or stdin required for optimization".into());
    };

    if let (Some(budget), true) = (args.budget, args.input.is_some()) {
        opt_input.budget = budget;
    }
    if let Some(config) = config {
        opt_input.config = config;
    }

    let result = api::optimize_deductions(&opt_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_item() {
        let item = parse_item("100.5:10").unwrap();
        assert_eq!(item.value, dec!(100.5));
        assert_eq!(item.cost, 10);
        assert!(parse_item("100").is_err());
        assert!(parse_item("abc:1").is_err());
        assert!(parse_item("1:-1").is_err());
    }
}
