use clap::Args;
use serde_json::Value;

use slab_tax_core::api::{self, AssessmentInput};
use slab_tax_core::{EngineConfig, SlabTable};

use crate::input;

/// Arguments for income record assessment
#[derive(Args)]
pub struct AssessArgs {
    /// Path to a JSON/YAML assessment input ({"record": {...}, "schedule": [...]})
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON/YAML slab list replacing the default schedule
    #[arg(long)]
    pub schedule: Option<String>,
}

pub fn run_assess(args: AssessArgs, config: Option<EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut assess_input: AssessmentInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file> or stdin required for income assessment".into());
    };

    if let Some(ref path) = args.schedule {
        let table: SlabTable = input::file::read_structured(path)?;
        assess_input.schedule = Some(table);
    }
    if let Some(config) = config {
        assess_input.config = config;
    }

    let result = api::assess_income(&assess_input)?;
    Ok(serde_json::to_value(result)?)
}
