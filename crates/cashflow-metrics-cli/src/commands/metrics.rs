use clap::Args;
use serde_json::Value;

use cashflow_metrics_core::metrics::calculator;
use cashflow_metrics_core::metrics::trend::{self, PeriodSeriesInput};
use cashflow_metrics_core::EngineConfig;

use crate::input;

/// Arguments for period-series cash flow metrics
#[derive(Args)]
pub struct MetricsArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Only report the latest period's metrics, without trends
    #[arg(long)]
    pub latest: bool,
}

pub fn run_metrics(args: MetricsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let series: PeriodSeriesInput = input::read_input(args.input.as_deref(), "cash flow metrics")?;
    if args.latest {
        let metrics = calculator::latest_metrics(&series.periods)?;
        return Ok(serde_json::to_value(metrics)?);
    }
    let result = trend::analyze_periods(&series, &config.metrics)?;
    Ok(serde_json::to_value(result)?)
}
