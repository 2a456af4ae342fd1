mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::liquidity::LiquidityArgs;
use commands::metrics::MetricsArgs;
use commands::receivables::ReceivablesArgs;
use commands::stress::{ScenariosArgs, SensitivityArgs, StressArgs};

/// Cash flow metrics derived from periodic financial statements
#[derive(Parser)]
#[command(
    name = "cfm",
    version,
    about = "Cash flow metrics derived from periodic financial statements",
    long_about = "Derives operating cash flow, working-capital day counts, burn rate and runway \
                  from period financials, projects liquidity alerts, ages receivables and runs \
                  stress scenarios and sensitivities, all in decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cash flow metrics, trends and recommendations for a period series
    Metrics(MetricsArgs),
    /// Project liquidity buffer breaches over a horizon
    Liquidity(LiquidityArgs),
    /// Age and score receivables, with portfolio collection metrics
    Receivables(ReceivablesArgs),
    /// Run the scenario library against a base period
    Stress(StressArgs),
    /// Sweep a single driver (revenue, DSO, DIO or DPO)
    Sensitivity(SensitivityArgs),
    /// List the configured scenario library
    Scenarios(ScenariosArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries results; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match input::config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Metrics(args) => commands::metrics::run_metrics(args, &config),
        Commands::Liquidity(args) => commands::liquidity::run_liquidity(args, &config),
        Commands::Receivables(args) => commands::receivables::run_receivables(args, &config),
        Commands::Stress(args) => commands::stress::run_stress(args, &config),
        Commands::Sensitivity(args) => commands::stress::run_sensitivity(args, &config),
        Commands::Scenarios(args) => commands::stress::run_scenarios(args, &config),
        Commands::Version => {
            println!("cfm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
