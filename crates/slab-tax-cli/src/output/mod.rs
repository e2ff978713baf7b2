pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

/// Rendering for command results on stdout.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Full result envelope, pretty-printed
    Json,
    /// Result fields plus per-income and per-update tables
    Table,
    /// One row per income or slab when the result is a batch
    Csv,
    /// Headline figure only (total tax, amount payable, best deduction value)
    Minimal,
}

pub fn format_output(format: &OutputFormat, value: &Value) {
    tracing::debug!(?format, "rendering output");
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
