use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use slab_tax_core::api::{self, TaxEvaluationInput, TaxQuery};
use slab_tax_core::schedule::Slab;
use slab_tax_core::{EngineConfig, SlabTable};

use crate::input;

/// Arguments for slab tax evaluation
#[derive(Args)]
pub struct TaxArgs {
    /// Path to a JSON/YAML evaluation input (schedule, context points, updates, queries)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated incomes to evaluate (e.g. "900000,1500000")
    #[arg(long, value_delimiter = ',')]
    pub income: Option<Vec<Decimal>>,

    /// Comma-separated context parameters applied to every income
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub params: Option<Vec<Decimal>>,

    /// Path to a JSON/YAML slab list replacing the default schedule
    #[arg(long)]
    pub schedule: Option<String>,

    /// Path to a JSON/YAML slab list applied as an update; repeat for several
    #[arg(long = "update")]
    pub updates: Vec<String>,
}

pub fn run_tax(args: TaxArgs, config: Option<EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut eval_input: TaxEvaluationInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(incomes) = args.income.clone() {
        TaxEvaluationInput {
            schedule: None,
            context_points: Vec::new(),
            slab_updates: Vec::new(),
            queries: incomes
                .into_iter()
                .map(|income| TaxQuery {
                    income,
                    params: args.params.clone(),
                })
                .collect(),
            config: EngineConfig::default(),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file>, --income <values> or stdin required for tax evaluation".into());
    };

    if let Some(ref path) = args.schedule {
        let table: SlabTable = input::file::read_structured(path)?;
        eval_input.schedule = Some(table);
    }
    for path in &args.updates {
        let slabs: Vec<Slab> = input::file::read_structured(path)?;
        eval_input.slab_updates.push(slabs);
    }
    if let Some(config) = config {
        eval_input.config = config;
    }

    let result = api::evaluate_tax(&eval_input)?;
    Ok(serde_json::to_value(result)?)
}
