//! Scenario stress engine.
//!
//! Applies parameterised perturbations to a base period and recomputes the
//! dependent metrics along the same path as the cash flow calculator. The
//! canned scenarios are configuration data: the engine only ever sees a
//! list of `ScenarioDefinition`s.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CashFlowError;
use crate::metrics::calculator::{compute_metrics, CashFlowMetrics, DAYS_PER_YEAR, MONTHS_PER_YEAR};
use crate::period::FinancialPeriod;
use crate::types::{with_metadata, ComputationOutput, Metric, Money, Rate};
use crate::CashFlowResult;

use super::sensitivity::{sweep_sensitivity, SensitivityAnalysis, SensitivityRequest};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Perturbations applied to the base period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParameters {
    /// Percent change in revenue (-20 = 20% decline)
    pub revenue_change_pct: Decimal,
    /// Percent change in cost of goods sold
    pub cogs_change_pct: Decimal,
    /// Day delta on receivables, scaled through current DSO
    pub ar_days_change: Decimal,
    /// Day delta on inventory, scaled through current DIO
    pub inventory_days_change: Decimal,
    /// Day delta on payables, scaled through current DPO
    pub ap_days_change: Decimal,
    /// Absolute change in cash
    pub cash_change: Money,
}

/// A named parameter set from the scenario library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: ScenarioParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// The perturbed line items a scenario impact was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedFinancials {
    pub revenue: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    /// Base operating margin applied to adjusted revenue
    pub operating_profit: Metric,
    pub net_profit: Money,
    pub accounts_receivable: Money,
    pub inventory: Money,
    pub accounts_payable: Money,
    pub cash: Money,
    pub current_assets: Money,
    pub current_liabilities: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    pub operating_cash_flow: Money,
    /// Percent change against the base, relative to |base|
    pub operating_cash_flow_change_pct: Metric,
    pub dso: Metric,
    pub dio: Metric,
    pub dpo: Metric,
    pub cash_conversion_cycle: Metric,
    /// Current assets / current liabilities after the scenario
    pub liquidity_ratio: Metric,
    /// (adjusted revenue - adjusted operating profit) / 12
    pub burn_rate: Metric,
    /// Months
    pub runway: Metric,
    pub runway_change_pct: Metric,
    pub severity: StressSeverity,
    pub adjusted: AdjustedFinancials,
}

/// A scenario definition together with its computed impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub description: String,
    pub parameters: ScenarioParameters,
    pub impact: ScenarioImpact,
}

impl StressScenario {
    /// Replace the parameters and recompute the impact.
    pub fn with_parameters(
        &self,
        base: &FinancialPeriod,
        base_metrics: &CashFlowMetrics,
        parameters: ScenarioParameters,
        config: &StressConfig,
    ) -> CashFlowResult<StressScenario> {
        build_scenario(
            base,
            base_metrics,
            &ScenarioDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters,
            },
            config,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSuite {
    pub scenarios: Vec<StressScenario>,
    /// Name of the most severe scenario (ties broken by lowest cash flow)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_case: Option<String>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Percent change at or below which a dimension is critical
    pub critical_change_pct: Decimal,
    pub high_change_pct: Decimal,
    pub medium_change_pct: Decimal,
    /// Share of a revenue delta assumed to reach cash in sensitivity sweeps
    pub revenue_cash_pass_through: Rate,
    pub scenarios: Vec<ScenarioDefinition>,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            critical_change_pct: dec!(-50),
            high_change_pct: dec!(-25),
            medium_change_pct: dec!(-10),
            revenue_cash_pass_through: dec!(0.10),
            scenarios: default_scenario_library(),
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        if !(self.critical_change_pct < self.high_change_pct
            && self.high_change_pct < self.medium_change_pct
            && self.medium_change_pct <= Decimal::ZERO)
        {
            return Err(CashFlowError::InvalidInput {
                field: "stress.severity_thresholds".into(),
                reason: "Thresholds must satisfy critical < high < medium <= 0.".into(),
            });
        }
        if self.revenue_cash_pass_through < Decimal::ZERO
            || self.revenue_cash_pass_through > Decimal::ONE
        {
            return Err(CashFlowError::InvalidInput {
                field: "stress.revenue_cash_pass_through".into(),
                reason: "Pass-through must be between 0 and 1.".into(),
            });
        }
        Ok(())
    }
}

/// The five canned scenarios.
pub fn default_scenario_library() -> Vec<ScenarioDefinition> {
    vec![
        ScenarioDefinition {
            name: "Economic Downturn".into(),
            description: "Broad demand contraction with slower customer payments.".into(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(-20),
                cogs_change_pct: dec!(-10),
                ar_days_change: dec!(15),
                inventory_days_change: dec!(10),
                ap_days_change: dec!(-5),
                cash_change: Decimal::ZERO,
            },
        },
        ScenarioDefinition {
            name: "Supply Chain Disruption".into(),
            description: "Input cost inflation and stock build-up; suppliers demand faster payment."
                .into(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(-5),
                cogs_change_pct: dec!(15),
                ar_days_change: Decimal::ZERO,
                inventory_days_change: dec!(30),
                ap_days_change: dec!(-10),
                cash_change: Decimal::ZERO,
            },
        },
        ScenarioDefinition {
            name: "Major Customer Loss".into(),
            description: "Loss of a key account with remaining customers paying later.".into(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(-30),
                cogs_change_pct: dec!(-20),
                ar_days_change: dec!(10),
                inventory_days_change: dec!(5),
                ap_days_change: Decimal::ZERO,
                cash_change: Decimal::ZERO,
            },
        },
        ScenarioDefinition {
            name: "Interest Rate Shock".into(),
            description: "Tighter credit: customers stretch terms, suppliers shorten them.".into(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(-5),
                cogs_change_pct: dec!(3),
                ar_days_change: dec!(10),
                inventory_days_change: Decimal::ZERO,
                ap_days_change: dec!(-10),
                cash_change: Decimal::ZERO,
            },
        },
        ScenarioDefinition {
            name: "Growth".into(),
            description: "Rapid expansion funded from working capital.".into(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(25),
                cogs_change_pct: dec!(20),
                ar_days_change: dec!(5),
                inventory_days_change: dec!(10),
                ap_days_change: dec!(5),
                cash_change: Decimal::ZERO,
            },
        },
    ]
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the impact of `parameters` on `base`.
///
/// Net profit scales with gross profit (or absorbs the gross profit delta
/// when the base is loss-making). Operating profit keeps the base operating
/// margin on adjusted revenue, and burn and runway are recomputed from the
/// two. Working-capital balances move by `day_change / 100 x 365 / current_days`.
/// Results outside the decimal range are rejected rather than wrapped.
pub fn apply_scenario(
    base: &FinancialPeriod,
    base_metrics: &CashFlowMetrics,
    parameters: &ScenarioParameters,
    config: &StressConfig,
) -> CashFlowResult<ScenarioImpact> {
    apply_named(base, base_metrics, "custom", parameters, config)
}

/// Evaluate a library entry into a full `StressScenario`.
pub fn build_scenario(
    base: &FinancialPeriod,
    base_metrics: &CashFlowMetrics,
    definition: &ScenarioDefinition,
    config: &StressConfig,
) -> CashFlowResult<StressScenario> {
    let impact = apply_named(
        base,
        base_metrics,
        &definition.name,
        &definition.parameters,
        config,
    )?;
    Ok(StressScenario {
        name: definition.name.clone(),
        description: definition.description.clone(),
        parameters: definition.parameters.clone(),
        impact,
    })
}

/// Evaluate every scenario in `library` independently.
pub fn run_stress_suite(
    base: &FinancialPeriod,
    base_metrics: &CashFlowMetrics,
    library: &[ScenarioDefinition],
    config: &StressConfig,
) -> CashFlowResult<StressSuite> {
    let scenarios = library
        .iter()
        .map(|d| build_scenario(base, base_metrics, d, config))
        .collect::<CashFlowResult<Vec<_>>>()?;

    let worst_case = scenarios
        .iter()
        .max_by(|a, b| {
            a.impact
                .severity
                .cmp(&b.impact.severity)
                .then_with(|| b.impact.operating_cash_flow.cmp(&a.impact.operating_cash_flow))
        })
        .map(|s| s.name.clone());

    Ok(StressSuite {
        scenarios,
        worst_case,
    })
}

/// Input for a full stress run over a base period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestInput {
    pub base_period: FinancialPeriod,
    /// Used for the base working-capital movements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<FinancialPeriod>,
    /// Overrides the configured library when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<ScenarioDefinition>>,
    #[serde(default)]
    pub sensitivities: Vec<SensitivityRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestOutput {
    pub base_metrics: CashFlowMetrics,
    pub suite: StressSuite,
    pub sensitivities: Vec<SensitivityAnalysis>,
}

/// Compute base metrics, run the scenario library and any requested sweeps.
pub fn analyze_stress(
    input: &StressTestInput,
    config: &StressConfig,
) -> CashFlowResult<ComputationOutput<StressTestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base_metrics = compute_metrics(&input.base_period, input.previous_period.as_ref())?;
    let library = input.scenarios.as_deref().unwrap_or(config.scenarios.as_slice());
    if library.is_empty() {
        warnings.push("Scenario library is empty; only sensitivities were computed.".into());
    }

    let suite = run_stress_suite(&input.base_period, &base_metrics, library, config)?;
    for s in &suite.scenarios {
        if s.impact.severity == StressSeverity::Critical {
            warnings.push(format!("Scenario '{}' is critical.", s.name));
        }
    }

    let sensitivities = input
        .sensitivities
        .iter()
        .map(|req| {
            sweep_sensitivity(
                &input.base_period,
                &base_metrics,
                req.variable,
                &req.resolved_changes()?,
                config,
            )
        })
        .collect::<CashFlowResult<Vec<_>>>()?;

    let output = StressTestOutput {
        base_metrics,
        suite,
        sensitivities,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Scenario stress test (full recompute) with linearised single-variable sensitivities",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn apply_named(
    base: &FinancialPeriod,
    base_metrics: &CashFlowMetrics,
    scenario: &str,
    p: &ScenarioParameters,
    config: &StressConfig,
) -> CashFlowResult<ScenarioImpact> {
    config.validate()?;
    base.validate()?;
    validate_parameters(scenario, p)?;

    tracing::debug!(scenario, period = %base.label, "applying stress scenario");

    let overflow = |what: &str| CashFlowError::InvalidScenarioParameters {
        scenario: scenario.into(),
        reason: format!("{what} overflows the decimal range"),
    };

    let base_ocf = base_metrics
        .operating_cash_flow
        .require_in_period(&base.label, "operating_cash_flow")?;

    let revenue =
        scale_by_pct(base.revenue, p.revenue_change_pct).ok_or_else(|| overflow("revenue"))?;
    let cogs = scale_by_pct(base.cogs(), p.cogs_change_pct).ok_or_else(|| overflow("cogs"))?;
    let gross_profit = revenue - cogs;
    let gross_profit_delta = gross_profit
        .checked_sub(base.gross_profit)
        .ok_or_else(|| overflow("gross_profit"))?;

    let accounts_receivable = scale_by_days(
        scenario,
        "accounts_receivable",
        base.accounts_receivable,
        p.ar_days_change,
        &base_metrics.dso,
    )?;
    let inventory = scale_by_days(
        scenario,
        "inventory",
        base.inventory,
        p.inventory_days_change,
        &base_metrics.dio,
    )?;
    let accounts_payable = scale_by_days(
        scenario,
        "accounts_payable",
        base.accounts_payable,
        p.ap_days_change,
        &base_metrics.dpo,
    )?;

    let dso = Metric::ratio(accounts_receivable, revenue, "revenue")
        .checked_scale(DAYS_PER_YEAR, "dso");
    let dio = Metric::ratio(inventory, cogs, "cogs").checked_scale(DAYS_PER_YEAR, "dio");
    let dpo = Metric::ratio(accounts_payable, cogs, "cogs").checked_scale(DAYS_PER_YEAR, "dpo");
    let cash_conversion_cycle = dso
        .try_zip_with(&dio, Decimal::checked_add, "cash_conversion_cycle")
        .try_zip_with(&dpo, Decimal::checked_sub, "cash_conversion_cycle");

    let net_profit = if base.net_profit > Decimal::ZERO && base.gross_profit > Decimal::ZERO {
        base.net_profit
            .checked_mul(gross_profit)
            .and_then(|v| v.checked_div(base.gross_profit))
    } else {
        base.net_profit.checked_add(gross_profit_delta)
    }
    .ok_or_else(|| overflow("net_profit"))?;

    // Operating margin is held, so operating profit moves with revenue
    let operating_profit = if base.revenue.is_zero() {
        Metric::zero_denominator("revenue")
    } else {
        base.operating_profit
            .checked_mul(revenue)
            .and_then(|v| v.checked_div(base.revenue))
            .map(Metric::defined)
            .ok_or_else(|| overflow("operating_profit"))?
    };

    let ar_delta = accounts_receivable - base.accounts_receivable;
    let inventory_delta = inventory - base.inventory;
    let ap_delta = accounts_payable - base.accounts_payable;
    let operating_cash_flow = net_profit
        .checked_sub(base.net_profit)
        .and_then(|np_delta| base_ocf.checked_add(np_delta))
        .and_then(|v| v.checked_sub(ar_delta))
        .and_then(|v| v.checked_sub(inventory_delta))
        .and_then(|v| v.checked_add(ap_delta))
        .ok_or_else(|| overflow("operating_cash_flow"))?;

    let cash = base
        .cash
        .checked_add(p.cash_change)
        .ok_or_else(|| overflow("cash"))?;
    if cash < Decimal::ZERO {
        return Err(CashFlowError::InvalidScenarioParameters {
            scenario: scenario.into(),
            reason: format!("cash_change of {} would make cash negative", p.cash_change),
        });
    }
    let current_assets = base
        .total_current_assets
        .checked_add(p.cash_change)
        .and_then(|v| v.checked_add(ar_delta))
        .and_then(|v| v.checked_add(inventory_delta))
        .ok_or_else(|| overflow("current_assets"))?;
    let current_liabilities = base
        .total_current_liabilities
        .checked_add(ap_delta)
        .ok_or_else(|| overflow("current_liabilities"))?;
    let liquidity_ratio = Metric::ratio(current_assets, current_liabilities, "current_liabilities");

    let burn_rate = operating_profit.clone().and_then(|op| match revenue.checked_sub(op) {
        Some(cost_base) => Metric::defined(cost_base / MONTHS_PER_YEAR),
        None => Metric::overflow("monthly_burn_rate"),
    });
    let runway = burn_rate
        .clone()
        .and_then(|burn| Metric::ratio(cash, burn, "monthly_burn_rate"));

    let operating_cash_flow_change_pct =
        pct_change(base_ocf, operating_cash_flow, "base_operating_cash_flow");
    let runway_change_pct = match (base_metrics.runway.value(), runway.value()) {
        (Some(b), Some(n)) => pct_change(b, n, "base_runway"),
        (None, _) => base_metrics.runway.clone(),
        (_, None) => runway.clone(),
    };

    let ocf_severity = match operating_cash_flow_change_pct.value() {
        Some(pct) => classify_change(pct, config),
        // Zero base: only a move into negative cash flow is a deterioration
        None if operating_cash_flow < base_ocf => StressSeverity::Critical,
        None => StressSeverity::Low,
    };
    let runway_severity = runway_change_pct
        .value()
        .map(|pct| classify_change(pct, config))
        .unwrap_or(StressSeverity::Low);
    let severity = ocf_severity.max(runway_severity);

    if severity >= StressSeverity::High {
        tracing::warn!(scenario, ?severity, %operating_cash_flow, "severe stress scenario");
    }

    Ok(ScenarioImpact {
        operating_cash_flow,
        operating_cash_flow_change_pct,
        dso,
        dio,
        dpo,
        cash_conversion_cycle,
        liquidity_ratio,
        burn_rate,
        runway,
        runway_change_pct,
        severity,
        adjusted: AdjustedFinancials {
            revenue,
            cogs,
            gross_profit,
            operating_profit,
            net_profit,
            accounts_receivable,
            inventory,
            accounts_payable,
            cash,
            current_assets,
            current_liabilities,
        },
    })
}

fn validate_parameters(scenario: &str, p: &ScenarioParameters) -> CashFlowResult<()> {
    if p.revenue_change_pct < dec!(-100) {
        return Err(CashFlowError::InvalidScenarioParameters {
            scenario: scenario.into(),
            reason: format!(
                "revenue_change_pct of {}% would make revenue negative",
                p.revenue_change_pct
            ),
        });
    }
    if p.cogs_change_pct < dec!(-100) {
        return Err(CashFlowError::InvalidScenarioParameters {
            scenario: scenario.into(),
            reason: format!(
                "cogs_change_pct of {}% would make cost of goods sold negative",
                p.cogs_change_pct
            ),
        });
    }
    Ok(())
}

/// `value x (1 + pct / 100)`, `None` on overflow.
fn scale_by_pct(value: Money, pct: Decimal) -> Option<Money> {
    (pct / dec!(100))
        .checked_add(Decimal::ONE)
        .and_then(|factor| value.checked_mul(factor))
}

/// `balance x (1 + day_change / 100 x 365 / current_days)`.
fn scale_by_days(
    scenario: &str,
    field: &str,
    balance: Money,
    day_change: Decimal,
    current_days: &Metric,
) -> CashFlowResult<Money> {
    if day_change.is_zero() {
        return Ok(balance);
    }
    let days = match current_days.value() {
        Some(d) if !d.is_zero() => d,
        _ => {
            return Err(CashFlowError::InvalidScenarioParameters {
                scenario: scenario.into(),
                reason: format!(
                    "cannot scale {field} by a day change: base day count is zero or undefined"
                ),
            })
        }
    };
    let overflow = || CashFlowError::InvalidScenarioParameters {
        scenario: scenario.into(),
        reason: format!("day change of {day_change} overflows {field}"),
    };
    let factor = (day_change / dec!(100))
        .checked_mul(DAYS_PER_YEAR)
        .and_then(|v| v.checked_div(days))
        .and_then(|v| v.checked_add(Decimal::ONE))
        .ok_or_else(overflow)?;
    if factor < Decimal::ZERO {
        return Err(CashFlowError::InvalidScenarioParameters {
            scenario: scenario.into(),
            reason: format!("day change of {day_change} would make {field} negative"),
        });
    }
    balance.checked_mul(factor).ok_or_else(overflow)
}

/// `(new - base) / |base| x 100`
fn pct_change(base: Decimal, new: Decimal, base_name: &str) -> Metric {
    match new.checked_sub(base) {
        Some(delta) => Metric::ratio(delta, base.abs(), base_name)
            .checked_scale(dec!(100), "percent_change"),
        None => Metric::overflow("percent_change"),
    }
}

fn classify_change(pct: Decimal, config: &StressConfig) -> StressSeverity {
    if pct < config.critical_change_pct {
        StressSeverity::Critical
    } else if pct < config.high_change_pct {
        StressSeverity::High
    } else if pct < config.medium_change_pct {
        StressSeverity::Medium
    } else {
        StressSeverity::Low
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::fixtures::{fy2022, fy2023};
    use rust_decimal_macros::dec;

    fn base() -> (FinancialPeriod, CashFlowMetrics) {
        let p = fy2023();
        let m = compute_metrics(&p, None).unwrap();
        (p, m)
    }

    #[test]
    fn test_zero_parameters_reproduce_base() {
        let (p, m) = base();
        let impact =
            apply_scenario(&p, &m, &ScenarioParameters::default(), &StressConfig::default()).unwrap();
        assert_eq!(Metric::defined(impact.operating_cash_flow), m.operating_cash_flow);
        assert_eq!(impact.dso, m.dso);
        assert_eq!(impact.cash_conversion_cycle, m.cash_conversion_cycle);
        assert_eq!(impact.burn_rate, Metric::defined(m.burn_rate));
        assert_eq!(impact.runway, m.runway);
        assert_eq!(impact.liquidity_ratio, m.working_capital_ratio);
        assert_eq!(impact.operating_cash_flow_change_pct.value(), Some(Decimal::ZERO));
        assert_eq!(impact.severity, StressSeverity::Low);
    }

    #[test]
    fn test_ar_day_change_scales_through_dso() {
        let (p, m) = base();
        let params = ScenarioParameters {
            ar_days_change: dec!(10),
            ..ScenarioParameters::default()
        };
        let impact = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap();
        // AR x (1 + 0.10 x 365 / DSO) == AR + 0.10 x revenue
        let expected = p.accounts_receivable + dec!(410_000);
        assert_eq!(
            impact.adjusted.accounts_receivable.round_dp(6),
            expected.round_dp(6)
        );
        // OCF drops by the receivables build
        let delta = impact.operating_cash_flow - m.operating_cash_flow.value().unwrap();
        assert_eq!(delta.round_dp(6), dec!(-410_000));
    }

    #[test]
    fn test_net_profit_scales_with_gross_profit() {
        let (p, m) = base();
        let params = ScenarioParameters {
            revenue_change_pct: dec!(-10),
            ..ScenarioParameters::default()
        };
        let impact = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap();
        // GP: 3.69M - 3.05M = 640k; NP = 280k x 640/1050
        assert_eq!(impact.adjusted.gross_profit, dec!(640_000));
        let expected_np = dec!(280_000) * dec!(640_000) / dec!(1_050_000);
        assert_eq!(impact.adjusted.net_profit, expected_np);
    }

    #[test]
    fn test_revenue_change_moves_burn_and_runway() {
        let (p, m) = base();
        let params = ScenarioParameters {
            revenue_change_pct: dec!(-20),
            ..ScenarioParameters::default()
        };
        let impact = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap();
        // 480k operating profit on 4.1M revenue keeps its margin on 3.28M
        assert_eq!(impact.adjusted.revenue, dec!(3_280_000));
        assert_eq!(impact.adjusted.operating_profit, Metric::defined(dec!(384_000)));
        let burn = impact.burn_rate.value().unwrap();
        assert_eq!(burn.round_dp(6), (dec!(2_896_000) / dec!(12)).round_dp(6));
        assert!(burn < m.burn_rate);
        // Burn falls to 80% of base, so runway lengthens by a quarter
        assert_eq!(impact.runway_change_pct.value().unwrap().round_dp(6), dec!(25));
    }

    #[test]
    fn test_zero_base_revenue_leaves_burn_undefined() {
        let mut p = fy2023();
        p.revenue = Decimal::ZERO;
        p.gross_profit = Decimal::ZERO;
        p.operating_profit = dec!(-200_000);
        p.net_profit = dec!(-250_000);
        let m = compute_metrics(&p, None).unwrap();
        let impact =
            apply_scenario(&p, &m, &ScenarioParameters::default(), &StressConfig::default()).unwrap();
        assert_eq!(impact.adjusted.operating_profit, Metric::zero_denominator("revenue"));
        assert_eq!(impact.burn_rate, Metric::zero_denominator("revenue"));
        assert_eq!(impact.runway, Metric::zero_denominator("revenue"));
    }

    #[test]
    fn test_overflowing_revenue_change_is_rejected() {
        let (p, m) = base();
        let params = ScenarioParameters {
            revenue_change_pct: Decimal::MAX / dec!(1000),
            ..ScenarioParameters::default()
        };
        let err = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap_err();
        assert!(matches!(err, CashFlowError::InvalidScenarioParameters { .. }));
    }

    #[test]
    fn test_overflowing_day_change_is_rejected() {
        let (p, m) = base();
        let params = ScenarioParameters {
            inventory_days_change: Decimal::MAX / dec!(10),
            ..ScenarioParameters::default()
        };
        let err = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap_err();
        assert!(matches!(err, CashFlowError::InvalidScenarioParameters { .. }));
    }

    #[test]
    fn test_loss_making_base_absorbs_gross_profit_delta() {
        let mut p = fy2023();
        p.net_profit = dec!(-50_000);
        let m = compute_metrics(&p, None).unwrap();
        let params = ScenarioParameters {
            revenue_change_pct: dec!(-10),
            ..ScenarioParameters::default()
        };
        let impact = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap();
        assert_eq!(impact.adjusted.net_profit, dec!(-50_000) - dec!(410_000));
    }

    #[test]
    fn test_cash_change_moves_runway_and_liquidity() {
        let (p, m) = base();
        let params = ScenarioParameters {
            cash_change: dec!(-140_000),
            ..ScenarioParameters::default()
        };
        let impact = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap();
        assert_eq!(impact.adjusted.cash, dec!(210_000));
        assert_eq!(impact.adjusted.current_assets, dec!(1_710_000));
        // Burn is unchanged, so runway falls by the same 40% as cash
        let pct = impact.runway_change_pct.value().unwrap();
        assert_eq!(pct.round_dp(6), dec!(-40));
        assert_eq!(impact.severity, StressSeverity::High);
    }

    #[test]
    fn test_revenue_below_minus_100_rejected() {
        let (p, m) = base();
        let params = ScenarioParameters {
            revenue_change_pct: dec!(-120),
            ..ScenarioParameters::default()
        };
        let err = apply_scenario(&p, &m, &params, &StressConfig::default()).unwrap_err();
        assert!(matches!(err, CashFlowError::InvalidScenarioParameters { .. }));
    }

    #[test]
    fn test_negative_cash_rejected() {
        let (p, m) = base();
        let params = ScenarioParameters {
            cash_change: dec!(-1_000_000),
            ..ScenarioParameters::default()
        };
        assert!(apply_scenario(&p, &m, &params, &StressConfig::default()).is_err());
    }

    #[test]
    fn test_day_change_driving_balance_negative_rejected() {
        let (p, m) = base();
        // AP + (-50/100) x cogs < 0 since AP (460k) < 0.5 x 3.05M
        let params = ScenarioParameters {
            ap_days_change: dec!(-50),
            ..ScenarioParameters::default()
        };
        assert!(apply_scenario(&p, &m, &params, &StressConfig::default()).is_err());
    }

    #[test]
    fn test_missing_base_cash_flow_is_an_error() {
        let mut p = fy2023();
        p.depreciation_amortization = None;
        let m = compute_metrics(&p, None).unwrap();
        let err = apply_scenario(&p, &m, &ScenarioParameters::default(), &StressConfig::default())
            .unwrap_err();
        match err {
            CashFlowError::MissingPeriodData { period, field } => {
                assert_eq!(period, "FY2023");
                assert_eq!(field, "depreciation_amortization");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_severity_classification() {
        let config = StressConfig::default();
        assert_eq!(classify_change(dec!(-60), &config), StressSeverity::Critical);
        assert_eq!(classify_change(dec!(-30), &config), StressSeverity::High);
        assert_eq!(classify_change(dec!(-15), &config), StressSeverity::Medium);
        assert_eq!(classify_change(dec!(-5), &config), StressSeverity::Low);
        assert_eq!(classify_change(dec!(40), &config), StressSeverity::Low);
    }

    #[test]
    fn test_suite_runs_library_and_picks_worst_case() {
        let p = fy2023();
        let m = compute_metrics(&p, Some(&fy2022())).unwrap();
        let config = StressConfig::default();
        let suite = run_stress_suite(&p, &m, &config.scenarios, &config).unwrap();
        assert_eq!(suite.scenarios.len(), 5);
        let worst = suite.worst_case.clone().unwrap();
        let worst_severity = suite
            .scenarios
            .iter()
            .find(|s| s.name == worst)
            .map(|s| s.impact.severity)
            .unwrap();
        assert!(suite
            .scenarios
            .iter()
            .all(|s| s.impact.severity <= worst_severity));
    }

    #[test]
    fn test_with_parameters_recomputes() {
        let (p, m) = base();
        let config = StressConfig::default();
        let scenario = build_scenario(&p, &m, &config.scenarios[0], &config).unwrap();
        let relaxed = scenario
            .with_parameters(&p, &m, ScenarioParameters::default(), &config)
            .unwrap();
        assert_eq!(relaxed.name, scenario.name);
        assert_eq!(relaxed.impact.severity, StressSeverity::Low);
    }

    #[test]
    fn test_misordered_thresholds_rejected() {
        let config = StressConfig {
            high_change_pct: dec!(-60),
            ..StressConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
