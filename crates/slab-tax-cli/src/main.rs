mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::assess::AssessArgs;
use commands::deductions::OptimizeArgs;
use commands::tax::TaxArgs;
use output::OutputFormat;

/// Slab-based income tax evaluation with adaptive indexing
#[derive(Parser)]
#[command(
    name = "slabtax",
    version,
    about = "Slab-based income tax evaluation with adaptive indexing",
    long_about = "A CLI for evaluating progressive slab income tax with decimal precision. \
                  Supports batch tax evaluation with schedule updates, context-dependent \
                  rates, income record assessment, and deduction subset optimization."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Path to a JSON/YAML engine configuration (thresholds, search mode)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate slab tax for one or more incomes
    Tax(TaxArgs),
    /// Assess an income record: net taxable income, tax and TDS settlement
    Assess(AssessArgs),
    /// Choose the highest-value deduction subset within a budget
    Optimize(OptimizeArgs),
    /// Print the built-in slab schedule
    Schedule,
    /// Print version information
    Version,
}

/// Logs go to stderr so structured output on stdout stays parseable.
/// `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Tax(args) => commands::tax::run_tax(args, config),
        Commands::Assess(args) => commands::assess::run_assess(args, config),
        Commands::Optimize(args) => commands::deductions::run_optimize(args, config),
        Commands::Schedule => commands::schedule::run_schedule(),
        Commands::Version => {
            println!("slabtax {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
