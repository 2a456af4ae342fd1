//! Forward liquidity projection and buffer-breach alerts.
//!
//! A linear decay model: the balance falls by a constant daily burn
//! (`monthly burn / days per month`) from today's liquidity. This is a
//! deterministic what-if line, not a stochastic forecast. The likelihood on
//! each alert simply decays with distance from today.

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CashFlowError;
use crate::metrics::calculator::CashFlowMetrics;
use crate::period::FinancialPeriod;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::CashFlowResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Monthly burn is spread over this many days
    pub days_per_month: Decimal,
    pub default_horizon_days: u32,
    /// Alerts beyond this count are truncated; at most 5
    pub max_alerts: usize,
    /// Likelihood never drops below this percentage
    pub likelihood_floor: Decimal,
    /// Percentage points of likelihood lost per day ahead
    pub likelihood_decay_per_day: Decimal,
    /// Balance/threshold below which an alert is critical
    pub critical_ratio: Decimal,
    pub high_ratio: Decimal,
    pub medium_ratio: Decimal,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        LiquidityConfig {
            days_per_month: dec!(30),
            default_horizon_days: 30,
            max_alerts: 5,
            likelihood_floor: dec!(60),
            likelihood_decay_per_day: dec!(2),
            critical_ratio: dec!(0.5),
            high_ratio: dec!(0.7),
            medium_ratio: dec!(0.9),
        }
    }
}

impl LiquidityConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        if self.days_per_month <= Decimal::ZERO {
            return Err(CashFlowError::InvalidInput {
                field: "liquidity.days_per_month".into(),
                reason: "Days per month must be positive.".into(),
            });
        }
        if self.max_alerts > 5 {
            return Err(CashFlowError::InvalidInput {
                field: "liquidity.max_alerts".into(),
                reason: "At most 5 alerts can be emitted.".into(),
            });
        }
        if self.likelihood_floor < Decimal::ZERO || self.likelihood_floor > dec!(100) {
            return Err(CashFlowError::InvalidInput {
                field: "liquidity.likelihood_floor".into(),
                reason: "Likelihood floor must be between 0 and 100.".into(),
            });
        }
        if self.likelihood_decay_per_day < Decimal::ZERO {
            return Err(CashFlowError::InvalidInput {
                field: "liquidity.likelihood_decay_per_day".into(),
                reason: "Likelihood decay cannot be negative.".into(),
            });
        }
        if !(Decimal::ZERO < self.critical_ratio
            && self.critical_ratio < self.high_ratio
            && self.high_ratio < self.medium_ratio
            && self.medium_ratio <= Decimal::ONE)
        {
            return Err(CashFlowError::InvalidInput {
                field: "liquidity.severity_ratios".into(),
                reason: "Severity ratios must satisfy 0 < critical < high < medium <= 1.".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Categorical trigger attached to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    /// Projected balance is negative
    CashDepletion,
    /// Projected balance is below half the threshold
    SustainedOperatingBurn,
    /// Projected balance has eaten into the buffer
    BufferErosion,
}

/// A projected future date where the balance falls below the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityAlert {
    pub date: NaiveDate,
    /// Days after the as-of date
    pub day_offset: u32,
    pub projected_balance: Money,
    /// Projected balance minus threshold (negative)
    pub buffer_difference: Money,
    pub reason: AlertReason,
    /// Percentage, 0-100
    pub likelihood: Decimal,
    pub severity: AlertSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityProjectionInput {
    /// Cash plus any other immediately available liquidity
    pub total_liquidity: Money,
    /// Monthly burn, as produced by the cash flow calculator
    pub monthly_burn_rate: Money,
    /// Minimum balance to keep
    pub threshold: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_days: Option<u32>,
    pub as_of: NaiveDate,
}

impl LiquidityProjectionInput {
    /// Seed a projection from a period's cash and its computed burn rate.
    pub fn from_metrics(
        period: &FinancialPeriod,
        metrics: &CashFlowMetrics,
        threshold: Money,
        as_of: NaiveDate,
    ) -> Self {
        LiquidityProjectionInput {
            total_liquidity: period.cash,
            monthly_burn_rate: metrics.burn_rate,
            threshold,
            horizon_days: None,
            as_of,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityProjection {
    /// At most `max_alerts`, ascending by date
    pub alerts: Vec<LiquidityAlert>,
    pub daily_burn: Money,
    pub horizon_days: u32,
    /// Projected balance on the last day of the horizon
    pub ending_balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_breach_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_breach: Option<u32>,
    /// Days within the horizon that breach the threshold, including truncated ones
    pub breach_days: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project daily balances for `horizon_days` and return the first
/// qualifying breach days as alerts, capped and ordered by date.
pub fn project_alerts(
    total_liquidity: Money,
    monthly_burn_rate: Money,
    threshold: Money,
    horizon_days: u32,
    today: NaiveDate,
    config: &LiquidityConfig,
) -> CashFlowResult<Vec<LiquidityAlert>> {
    let scan = scan_horizon(
        total_liquidity,
        monthly_burn_rate,
        threshold,
        horizon_days,
        today,
        config,
    )?;
    Ok(scan.alerts)
}

/// Full projection with breach summary, wrapped in the computation envelope.
pub fn project_liquidity(
    input: &LiquidityProjectionInput,
    config: &LiquidityConfig,
) -> CashFlowResult<ComputationOutput<LiquidityProjection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let horizon_days = input.horizon_days.unwrap_or(config.default_horizon_days);
    let scan = scan_horizon(
        input.total_liquidity,
        input.monthly_burn_rate,
        input.threshold,
        horizon_days,
        input.as_of,
        config,
    )?;

    if input.total_liquidity < input.threshold {
        warnings.push("Current liquidity is already below the threshold.".into());
    }
    if input.monthly_burn_rate <= Decimal::ZERO {
        warnings.push("Burn rate is not positive; balance does not decay.".into());
    }
    if scan.breach_days as usize > scan.alerts.len() {
        warnings.push(format!(
            "{} breach days projected; only the first {} are reported as alerts.",
            scan.breach_days,
            scan.alerts.len()
        ));
    }

    let output = LiquidityProjection {
        daily_burn: scan.daily_burn,
        horizon_days,
        ending_balance: scan.ending_balance,
        first_breach_date: scan.first_breach.map(|(d, _)| d),
        days_until_breach: scan.first_breach.map(|(_, o)| o),
        breach_days: scan.breach_days,
        alerts: scan.alerts,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Linear liquidity decay projection (daily burn = monthly burn / days per month)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct HorizonScan {
    alerts: Vec<LiquidityAlert>,
    daily_burn: Money,
    ending_balance: Money,
    first_breach: Option<(NaiveDate, u32)>,
    breach_days: u32,
}

/// `total_liquidity - daily_burn x day`, `None` on overflow.
fn balance_on(total_liquidity: Money, daily_burn: Money, day: u32) -> Option<Money> {
    daily_burn
        .checked_mul(Decimal::from(day))
        .and_then(|spent| total_liquidity.checked_sub(spent))
}

fn breached(total_liquidity: Money, daily_burn: Money, threshold: Money, day: u32) -> bool {
    match balance_on(total_liquidity, daily_burn, day) {
        Some(balance) => balance < threshold,
        // Only a positive burn can run the balance off the bottom of the range
        None => daily_burn > Decimal::ZERO,
    }
}

/// Inclusive `(first, last)` breach days within `1..=horizon_days`.
///
/// The balance is linear in the day, so the breach days form one run: a
/// tail of the horizon for a positive burn, a head for a negative one. The
/// crossing day is solved for and then settled against `breached` so the
/// result agrees with the per-day balances under decimal rounding.
fn breach_window(
    total_liquidity: Money,
    daily_burn: Money,
    threshold: Money,
    horizon_days: u32,
) -> Option<(u32, u32)> {
    if horizon_days == 0 {
        return None;
    }
    let is_breached = |day: u32| breached(total_liquidity, daily_burn, threshold, day);
    let excess = total_liquidity - threshold;
    let horizon = Decimal::from(horizon_days);

    if daily_burn.is_zero() {
        return (excess < Decimal::ZERO).then_some((1, horizon_days));
    }

    if daily_burn > Decimal::ZERO {
        // Breach once daily_burn x day > excess
        let mut first = if excess < Decimal::ZERO {
            1
        } else {
            match excess.checked_div(daily_burn) {
                Some(q) if q < horizon => q.floor().to_u32().map_or(horizon_days, |d| d + 1),
                _ => return None,
            }
        };
        while first > 1 && is_breached(first - 1) {
            first -= 1;
        }
        while !is_breached(first) {
            if first == horizon_days {
                return None;
            }
            first += 1;
        }
        return Some((first, horizon_days));
    }

    // Negative burn: breached only while day < -excess / |burn|
    if excess >= Decimal::ZERO {
        return None;
    }
    let mut last = match (-excess).checked_div(-daily_burn) {
        Some(q) if q <= horizon => q
            .ceil()
            .to_u32()
            .map_or(horizon_days, |d| d.saturating_sub(1)),
        _ => horizon_days,
    };
    while last < horizon_days && is_breached(last + 1) {
        last += 1;
    }
    while last >= 1 && !is_breached(last) {
        last -= 1;
    }
    (last >= 1).then_some((1, last))
}

fn scan_horizon(
    total_liquidity: Money,
    monthly_burn_rate: Money,
    threshold: Money,
    horizon_days: u32,
    today: NaiveDate,
    config: &LiquidityConfig,
) -> CashFlowResult<HorizonScan> {
    config.validate()?;
    if total_liquidity < Decimal::ZERO {
        return Err(CashFlowError::InvalidInput {
            field: "total_liquidity".into(),
            reason: "Total liquidity cannot be negative.".into(),
        });
    }
    if threshold < Decimal::ZERO {
        return Err(CashFlowError::InvalidInput {
            field: "threshold".into(),
            reason: "Threshold cannot be negative.".into(),
        });
    }

    let out_of_range = || CashFlowError::InvalidInput {
        field: "monthly_burn_rate".into(),
        reason: format!(
            "Burn of {monthly_burn_rate} over {horizon_days} days exceeds the decimal range."
        ),
    };
    let daily_burn = monthly_burn_rate
        .checked_div(config.days_per_month)
        .ok_or_else(out_of_range)?;
    let ending_balance =
        balance_on(total_liquidity, daily_burn, horizon_days).ok_or_else(out_of_range)?;

    tracing::debug!(
        %total_liquidity,
        %daily_burn,
        %threshold,
        horizon_days,
        "projecting liquidity"
    );

    let window = breach_window(total_liquidity, daily_burn, threshold, horizon_days);
    let breach_days = window.map_or(0, |(first, last)| last - first + 1);

    let date_of = |day: u32| {
        today.checked_add_days(Days::new(u64::from(day))).ok_or_else(|| {
            CashFlowError::DateError(format!("{today} + {day} days is out of range"))
        })
    };

    let first_breach = match window {
        Some((first, _)) => Some((date_of(first)?, first)),
        None => None,
    };

    let mut alerts = Vec::with_capacity(config.max_alerts);
    if let Some((first, last)) = window {
        for day in (first..=last).take(config.max_alerts) {
            let projected_balance =
                balance_on(total_liquidity, daily_burn, day).ok_or_else(out_of_range)?;
            alerts.push(LiquidityAlert {
                date: date_of(day)?,
                day_offset: day,
                projected_balance,
                buffer_difference: projected_balance - threshold,
                reason: classify_reason(projected_balance, threshold),
                likelihood: likelihood(day, config),
                severity: classify_severity(projected_balance, threshold, config),
            });
        }
    }

    if breach_days > 0 {
        tracing::warn!(
            breach_days,
            first = ?first_breach.map(|(d, _)| d),
            "liquidity buffer breach projected"
        );
    }

    Ok(HorizonScan {
        alerts,
        daily_burn,
        ending_balance,
        first_breach,
        breach_days,
    })
}

/// Nearer dates are treated as more certain.
fn likelihood(day: u32, config: &LiquidityConfig) -> Decimal {
    match config.likelihood_decay_per_day.checked_mul(Decimal::from(day)) {
        Some(decay) => (dec!(100) - decay).max(config.likelihood_floor),
        None => config.likelihood_floor,
    }
}

fn classify_severity(projected: Money, threshold: Money, config: &LiquidityConfig) -> AlertSeverity {
    let ratio = match projected.checked_div(threshold) {
        Some(r) if !threshold.is_zero() => r,
        // A zero threshold is only breached by a negative balance
        _ => return AlertSeverity::Critical,
    };
    if ratio < config.critical_ratio {
        AlertSeverity::Critical
    } else if ratio < config.high_ratio {
        AlertSeverity::High
    } else if ratio < config.medium_ratio {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

fn classify_reason(projected: Money, threshold: Money) -> AlertReason {
    if projected < Decimal::ZERO {
        AlertReason::CashDepletion
    } else if projected < threshold / dec!(2) {
        AlertReason::SustainedOperatingBurn
    } else {
        AlertReason::BufferErosion
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
