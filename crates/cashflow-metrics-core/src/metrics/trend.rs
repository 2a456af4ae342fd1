use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CashFlowError;
use crate::period::{validate_series, FinancialPeriod};
use crate::types::{with_metadata, ComputationOutput, Days, Metric};
use crate::CashFlowResult;

use super::calculator::{compute_metrics, CashFlowMetrics};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for trend classification and working-capital recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Day change (first to last period) below which a trend is "Stable"
    pub trend_threshold_days: Days,
    pub dso_alert_days: Days,
    pub dio_alert_days: Days,
    pub dpo_floor_days: Days,
    pub ccc_alert_days: Days,
    pub runway_alert_months: Decimal,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            trend_threshold_days: dec!(5),
            dso_alert_days: dec!(45),
            dio_alert_days: dec!(60),
            dpo_floor_days: dec!(30),
            ccc_alert_days: dec!(60),
            runway_alert_months: dec!(6),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        let fields = [
            ("metrics.trend_threshold_days", self.trend_threshold_days),
            ("metrics.dso_alert_days", self.dso_alert_days),
            ("metrics.dio_alert_days", self.dio_alert_days),
            ("metrics.dpo_floor_days", self.dpo_floor_days),
            ("metrics.ccc_alert_days", self.ccc_alert_days),
            ("metrics.runway_alert_months", self.runway_alert_months),
        ];
        for (field, value) in fields {
            if value < Decimal::ZERO {
                return Err(CashFlowError::InvalidInput {
                    field: field.into(),
                    reason: "Threshold cannot be negative.".into(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// A chronologically ordered series of periods for one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSeriesInput {
    pub company_name: String,
    pub periods: Vec<FinancialPeriod>,
}

/// Direction of a day-count metric between the first and last period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Deteriorating,
    Stable,
    /// One of the endpoints is undefined
    Indeterminate,
}

/// Trend analysis comparing first and last periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub dso_trend: Trend,
    pub dio_trend: Trend,
    pub dpo_trend: Trend,
    pub ccc_trend: Trend,
    /// Absolute change from first to last period
    pub dso_change: Metric,
    pub dio_change: Metric,
    pub dpo_change: Metric,
    pub ccc_change: Metric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSeriesAnalysis {
    pub company_name: String,
    /// One entry per period, each measured against its predecessor
    pub period_metrics: Vec<CashFlowMetrics>,
    pub trend_analysis: TrendAnalysis,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute metrics for every period in the series, then trends from the
/// first to the last period and recommendations from the latest one.
pub fn analyze_periods(
    input: &PeriodSeriesInput,
    config: &MetricsConfig,
) -> CashFlowResult<ComputationOutput<PeriodSeriesAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_series(&input.periods)?;
    config.validate()?;

    let period_metrics: Vec<CashFlowMetrics> = input
        .periods
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let previous = i.checked_sub(1).map(|j| &input.periods[j]);
            compute_metrics(p, previous)
        })
        .collect::<CashFlowResult<Vec<_>>>()?;

    for m in &period_metrics {
        for (name, reason) in m.undefined_metrics() {
            warnings.push(format!(
                "Period '{}': {} undefined ({}).",
                m.period_label, name, reason
            ));
        }
    }
    if let Some(first) = period_metrics.first() {
        if !first.working_capital.has_previous {
            warnings.push(format!(
                "Period '{}' has no predecessor; working-capital movements taken as zero.",
                first.period_label
            ));
        }
    }

    let trend_analysis = compute_trend(&period_metrics, config.trend_threshold_days);

    let latest = period_metrics
        .last()
        .ok_or(CashFlowError::EmptyPeriodSeries)?;
    let recommendations = build_recommendations(latest, config);

    let output = PeriodSeriesAnalysis {
        company_name: input.company_name.clone(),
        period_metrics,
        trend_analysis,
        recommendations,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Cash Flow Metrics (indirect OCF, DSO/DIO/DPO/CCC, burn rate, runway in months)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compute_trend(metrics: &[CashFlowMetrics], threshold: Days) -> TrendAnalysis {
    let (first, last) = match (metrics.first(), metrics.last()) {
        (Some(f), Some(l)) if metrics.len() >= 2 => (f, l),
        _ => {
            let zero = Metric::defined(Decimal::ZERO);
            return TrendAnalysis {
                dso_trend: Trend::Stable,
                dio_trend: Trend::Stable,
                dpo_trend: Trend::Stable,
                ccc_trend: Trend::Stable,
                dso_change: zero.clone(),
                dio_change: zero.clone(),
                dpo_change: zero.clone(),
                ccc_change: zero,
            };
        }
    };

    let dso_change = last.dso.zip_with(&first.dso, |l, f| l - f);
    let dio_change = last.dio.zip_with(&first.dio, |l, f| l - f);
    let dpo_change = last.dpo.zip_with(&first.dpo, |l, f| l - f);
    let ccc_change = last
        .cash_conversion_cycle
        .zip_with(&first.cash_conversion_cycle, |l, f| l - f);

    TrendAnalysis {
        dso_trend: classify_lower_is_better(&dso_change, threshold),
        dio_trend: classify_lower_is_better(&dio_change, threshold),
        // Paying suppliers later is favourable
        dpo_trend: classify_higher_is_better(&dpo_change, threshold),
        ccc_trend: classify_lower_is_better(&ccc_change, threshold),
        dso_change,
        dio_change,
        dpo_change,
        ccc_change,
    }
}

fn classify_lower_is_better(change: &Metric, threshold: Days) -> Trend {
    match change.value() {
        None => Trend::Indeterminate,
        Some(c) if c < -threshold => Trend::Improving,
        Some(c) if c > threshold => Trend::Deteriorating,
        Some(_) => Trend::Stable,
    }
}

fn classify_higher_is_better(change: &Metric, threshold: Days) -> Trend {
    match change.value() {
        None => Trend::Indeterminate,
        Some(c) if c > threshold => Trend::Improving,
        Some(c) if c < -threshold => Trend::Deteriorating,
        Some(_) => Trend::Stable,
    }
}

fn build_recommendations(metrics: &CashFlowMetrics, config: &MetricsConfig) -> Vec<String> {
    let mut recommendations = Vec::new();

    if matches!(metrics.dso.value(), Some(d) if d > config.dso_alert_days) {
        recommendations.push(format!(
            "DSO exceeds {} days. Tighten credit terms or offer early-payment discounts.",
            config.dso_alert_days
        ));
    }
    if matches!(metrics.dio.value(), Some(d) if d > config.dio_alert_days) {
        recommendations.push(format!(
            "DIO exceeds {} days. Review stock levels and slow-moving SKUs.",
            config.dio_alert_days
        ));
    }
    if matches!(metrics.dpo.value(), Some(d) if d < config.dpo_floor_days) {
        recommendations.push(format!(
            "DPO is below {} days. Negotiate extended payment terms with suppliers.",
            config.dpo_floor_days
        ));
    }
    if matches!(metrics.cash_conversion_cycle.value(), Some(d) if d > config.ccc_alert_days) {
        recommendations.push(format!(
            "Cash conversion cycle exceeds {} days. Address receivables, inventory and payables together.",
            config.ccc_alert_days
        ));
    }
    if matches!(metrics.operating_cash_flow.value(), Some(ocf) if ocf < Decimal::ZERO) {
        recommendations.push(
            "Operating cash flow is negative. Profit is not converting into cash.".to_string(),
        );
    }
    if matches!(metrics.runway.value(), Some(r) if r < config.runway_alert_months) {
        recommendations.push(format!(
            "Cash covers less than {} months of operating costs. Secure additional liquidity.",
            config.runway_alert_months
        ));
    }
    if recommendations.is_empty() {
        recommendations.push(
            "Working capital metrics are within acceptable ranges. Continue monitoring.".to_string(),
        );
    }

    recommendations
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
