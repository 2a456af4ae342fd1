use clap::Args;
use serde_json::Value;

use cashflow_metrics_core::receivables::portfolio::{self, ReceivablesInput};
use cashflow_metrics_core::EngineConfig;

use crate::input;

/// Arguments for receivables aging and collection metrics
#[derive(Args)]
pub struct ReceivablesArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_receivables(
    args: ReceivablesArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ledger: ReceivablesInput = input::read_input(args.input.as_deref(), "receivables analysis")?;
    let result = portfolio::analyze_receivables(&ledger, &config.receivables)?;
    Ok(serde_json::to_value(result)?)
}
