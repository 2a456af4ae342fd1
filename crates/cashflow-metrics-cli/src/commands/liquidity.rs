use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use cashflow_metrics_core::liquidity::projection::{self, LiquidityProjectionInput};
use cashflow_metrics_core::metrics::calculator;
use cashflow_metrics_core::{EngineConfig, FinancialPeriod};

use crate::input;

/// Arguments for liquidity alert projection
#[derive(Args)]
pub struct LiquidityArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the projection horizon in days
    #[arg(long)]
    pub horizon: Option<u32>,
}

/// Either explicit balances, or a period series whose latest period seeds
/// the balance and burn rate.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LiquidityRequest {
    Direct(LiquidityProjectionInput),
    FromPeriods {
        periods: Vec<FinancialPeriod>,
        threshold: Decimal,
        as_of: NaiveDate,
        #[serde(default)]
        horizon_days: Option<u32>,
    },
}

impl LiquidityRequest {
    fn into_projection_input(self) -> Result<LiquidityProjectionInput, Box<dyn std::error::Error>> {
        match self {
            LiquidityRequest::Direct(input) => Ok(input),
            LiquidityRequest::FromPeriods {
                periods,
                threshold,
                as_of,
                horizon_days,
            } => {
                let metrics = calculator::latest_metrics(&periods)?;
                let latest = periods
                    .last()
                    .ok_or("at least one period is required")?;
                let mut input =
                    LiquidityProjectionInput::from_metrics(latest, &metrics, threshold, as_of);
                input.horizon_days = horizon_days;
                Ok(input)
            }
        }
    }
}

pub fn run_liquidity(
    args: LiquidityArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: LiquidityRequest =
        input::read_input(args.input.as_deref(), "liquidity projection")?;
    let mut projection_input = request.into_projection_input()?;
    if args.horizon.is_some() {
        projection_input.horizon_days = args.horizon;
    }
    let result = projection::project_liquidity(&projection_input, &config.liquidity)?;
    Ok(serde_json::to_value(result)?)
}
