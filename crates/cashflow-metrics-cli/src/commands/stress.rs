use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use cashflow_metrics_core::metrics::calculator;
use cashflow_metrics_core::stress::scenario::{self, StressTestInput};
use cashflow_metrics_core::stress::sensitivity::{self, SensitivityVariable};
use cashflow_metrics_core::EngineConfig;

use crate::input;

/// Arguments for a scenario stress run
#[derive(Args)]
pub struct StressArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a single-driver sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON input file (base period and optional previous period)
    #[arg(long)]
    pub input: Option<String>,

    /// Driver to move
    #[arg(long)]
    pub variable: Driver,

    /// Comma-separated changes: percent for revenue, days otherwise
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub changes: Vec<Decimal>,
}

/// Arguments for listing the scenario library
#[derive(Args)]
pub struct ScenariosArgs {}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Driver {
    Revenue,
    Dso,
    Dio,
    Dpo,
}

impl From<Driver> for SensitivityVariable {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Revenue => SensitivityVariable::Revenue,
            Driver::Dso => SensitivityVariable::Dso,
            Driver::Dio => SensitivityVariable::Dio,
            Driver::Dpo => SensitivityVariable::Dpo,
        }
    }
}

pub fn run_stress(args: StressArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let stress_input: StressTestInput = input::read_input(args.input.as_deref(), "stress testing")?;
    let result = scenario::analyze_stress(&stress_input, &config.stress)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(
    args: SensitivityArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let stress_input: StressTestInput =
        input::read_input(args.input.as_deref(), "sensitivity analysis")?;
    let base_metrics = calculator::compute_metrics(
        &stress_input.base_period,
        stress_input.previous_period.as_ref(),
    )?;
    let result = sensitivity::sweep_sensitivity(
        &stress_input.base_period,
        &base_metrics,
        args.variable.into(),
        &args.changes,
        &config.stress,
    )?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_scenarios(
    _args: ScenariosArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(&config.stress.scenarios)?)
}
