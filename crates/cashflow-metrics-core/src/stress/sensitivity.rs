use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CashFlowError;
use crate::metrics::calculator::{CashFlowMetrics, DAYS_PER_YEAR};
use crate::period::FinancialPeriod;
use crate::types::{Metric, Money};
use crate::CashFlowResult;

use super::scenario::StressConfig;

/// The single driver moved in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityVariable {
    /// Changes are percentages of revenue
    Revenue,
    /// Changes are day deltas
    Dso,
    Dio,
    Dpo,
}

/// Upper bound on points generated from a single `SweepRange`.
pub const MAX_SWEEP_POINTS: usize = 1_000;

/// Inclusive min..=max sweep with a positive step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

impl SweepRange {
    /// `min + i x step` up to `max`, closed with `max` itself when the step
    /// does not land on it.
    pub fn values(&self) -> CashFlowResult<Vec<Decimal>> {
        if self.step <= Decimal::ZERO {
            return Err(CashFlowError::InvalidInput {
                field: "sensitivity.range.step".into(),
                reason: "Step must be positive".into(),
            });
        }
        if self.min > self.max {
            return Err(CashFlowError::InvalidInput {
                field: "sensitivity.range".into(),
                reason: "Min must be <= max".into(),
            });
        }

        let too_many = || CashFlowError::InvalidInput {
            field: "sensitivity.range.step".into(),
            reason: format!("Range yields more than {MAX_SWEEP_POINTS} points"),
        };
        let intervals = (self.max - self.min)
            .checked_div(self.step)
            .and_then(|n| n.floor().to_usize())
            .ok_or_else(too_many)?;
        if intervals >= MAX_SWEEP_POINTS {
            return Err(too_many());
        }

        let mut values: Vec<Decimal> = (0..=intervals)
            .map(|i| self.min + self.step * Decimal::from(i))
            .filter(|v| *v <= self.max)
            .collect();
        if values.last().map_or(true, |last| *last < self.max) {
            values.push(self.max);
        }
        Ok(values)
    }
}

/// A requested sweep: explicit change values, a range, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRequest {
    pub variable: SensitivityVariable,
    #[serde(default)]
    pub changes: Vec<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SweepRange>,
}

impl SensitivityRequest {
    /// Explicit changes followed by range values, in order.
    pub fn resolved_changes(&self) -> CashFlowResult<Vec<Decimal>> {
        let mut changes = self.changes.clone();
        if let Some(range) = &self.range {
            changes.extend(range.values()?);
        }
        Ok(changes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub change: Decimal,
    pub new_value: Decimal,
    /// Linearised change in annual operating cash flow
    pub cash_flow_impact: Money,
    /// Change in the cash conversion cycle, days
    pub ccc_impact: Metric,
    /// Cash flow impact expressed in months of burn
    pub runway_impact: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityAnalysis {
    pub variable: SensitivityVariable,
    pub base_value: Decimal,
    pub points: Vec<SensitivityPoint>,
}

/// Sweep one driver across `changes`, holding everything else at base.
///
/// Revenue moves cash by the configured pass-through share. Day deltas move
/// working capital by one day of revenue (DSO) or cost of goods sold
/// (DIO, DPO) per day. A zero change always yields zero impacts.
pub fn sweep_sensitivity(
    base: &FinancialPeriod,
    base_metrics: &CashFlowMetrics,
    variable: SensitivityVariable,
    changes: &[Decimal],
    config: &StressConfig,
) -> CashFlowResult<SensitivityAnalysis> {
    config.validate()?;
    if changes.is_empty() {
        return Err(CashFlowError::InsufficientData(
            "At least one sensitivity change is required".into(),
        ));
    }

    let base_value = match variable {
        SensitivityVariable::Revenue => base.revenue,
        SensitivityVariable::Dso => base_metrics.dso.require("dso")?,
        SensitivityVariable::Dio => base_metrics.dio.require("dio")?,
        SensitivityVariable::Dpo => base_metrics.dpo.require("dpo")?,
    };

    tracing::debug!(?variable, points = changes.len(), "sensitivity sweep");

    let points = changes
        .iter()
        .map(|&change| sensitivity_point(base, base_metrics, variable, base_value, change, config))
        .collect::<CashFlowResult<Vec<_>>>()?;

    Ok(SensitivityAnalysis {
        variable,
        base_value,
        points,
    })
}

fn sensitivity_point(
    base: &FinancialPeriod,
    base_metrics: &CashFlowMetrics,
    variable: SensitivityVariable,
    base_value: Decimal,
    change: Decimal,
    config: &StressConfig,
) -> CashFlowResult<SensitivityPoint> {
    let (new_value, cash_flow_impact, ccc_impact) = match variable {
        SensitivityVariable::Revenue => {
            if change < dec!(-100) {
                return Err(CashFlowError::InvalidScenarioParameters {
                    scenario: "revenue sensitivity".into(),
                    reason: format!("change of {change}% would make revenue negative"),
                });
            }
            let new_revenue = base.revenue * (Decimal::ONE + change / dec!(100));
            let cash = (new_revenue - base.revenue) * config.revenue_cash_pass_through;
            let ccc = if change.is_zero() {
                Metric::defined(Decimal::ZERO)
            } else {
                // Receivables held constant, so DSO moves inversely with revenue
                Metric::ratio(base.accounts_receivable, new_revenue, "revenue")
                    .map(|r| r * DAYS_PER_YEAR)
                    .zip_with(&base_metrics.dso, |new_dso, dso| new_dso - dso)
            };
            (new_revenue, cash, ccc)
        }
        SensitivityVariable::Dso => {
            let daily = base.revenue / DAYS_PER_YEAR;
            (
                shifted_days(variable, base_value, change)?,
                -daily * change,
                Metric::defined(change),
            )
        }
        SensitivityVariable::Dio => {
            let daily = base.cogs() / DAYS_PER_YEAR;
            (
                shifted_days(variable, base_value, change)?,
                -daily * change,
                Metric::defined(change),
            )
        }
        SensitivityVariable::Dpo => {
            let daily = base.cogs() / DAYS_PER_YEAR;
            (
                shifted_days(variable, base_value, change)?,
                daily * change,
                Metric::defined(-change),
            )
        }
    };

    let runway_impact = if cash_flow_impact.is_zero() {
        Metric::defined(Decimal::ZERO)
    } else {
        Metric::ratio(cash_flow_impact, base_metrics.burn_rate, "monthly_burn_rate")
    };

    Ok(SensitivityPoint {
        change,
        new_value,
        cash_flow_impact,
        ccc_impact,
        runway_impact,
    })
}

fn shifted_days(
    variable: SensitivityVariable,
    base_value: Decimal,
    change: Decimal,
) -> CashFlowResult<Decimal> {
    let shifted = base_value + change;
    if shifted < Decimal::ZERO {
        return Err(CashFlowError::InvalidScenarioParameters {
            scenario: format!("{variable:?} sensitivity").to_lowercase(),
            reason: format!("change of {change} days would make the day count negative"),
        });
    }
    Ok(shifted)
}
