use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::period::{latest_pair, validate_series, FinancialPeriod};
use crate::types::{Metric, Money, UndefinedReason};
use crate::CashFlowResult;

/// Day-count basis for DSO/DIO/DPO and daily cash flow.
pub const DAYS_PER_YEAR: Decimal = dec!(365);

/// Divisor turning the annual cost base into a monthly burn.
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Balance-sheet movements between the previous and current period.
///
/// All increases are zero when no previous period is supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalMovement {
    /// Revenue minus gross profit of the current period
    pub cogs: Money,
    pub ar_increase: Money,
    pub inventory_increase: Money,
    pub ap_increase: Money,
    /// Whether the increases were measured against a previous period
    pub has_previous: bool,
}

/// Metrics derived from a `(current, previous?)` pair of periods.
///
/// Never persisted; recompute whenever the underlying periods change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowMetrics {
    pub period_label: String,
    pub working_capital: WorkingCapitalMovement,
    /// Net profit + D&A - ΔAR - ΔInventory + ΔAP
    pub operating_cash_flow: Metric,
    /// Operating cash flow as a percentage of revenue
    pub operating_cash_flow_margin: Metric,
    /// DSO + DIO - DPO
    pub cash_conversion_cycle: Metric,
    /// Operating cash flow / 365
    pub cash_flow_per_day: Metric,
    /// AR / revenue x 365
    pub dso: Metric,
    /// Inventory / COGS x 365
    pub dio: Metric,
    /// AP / COGS x 365
    pub dpo: Metric,
    /// Total current assets / total current liabilities
    pub working_capital_ratio: Metric,
    /// Cash / (revenue - operating profit)
    pub cash_reserve_ratio: Metric,
    /// (Revenue - operating profit) / 12, i.e. monthly operating cost base
    pub burn_rate: Money,
    /// Cash / monthly burn, in months
    pub runway: Metric,
    pub gross_profit_to_cash_conversion: Metric,
    /// Net profit - operating cash flow
    pub profit_cash_flow_gap: Metric,
    /// COGS / (COGS + ΔInventory - ΔAP)
    pub cost_of_sales_to_cash_outflow: Metric,
    /// (Operating profit + D&A) / interest paid
    pub debt_service_coverage_ratio: Metric,
}

impl CashFlowMetrics {
    /// Every metric that could not be computed, with its reason.
    pub fn undefined_metrics(&self) -> Vec<(&'static str, &UndefinedReason)> {
        let named: [(&'static str, &Metric); 14] = [
            ("operating_cash_flow", &self.operating_cash_flow),
            ("operating_cash_flow_margin", &self.operating_cash_flow_margin),
            ("cash_conversion_cycle", &self.cash_conversion_cycle),
            ("cash_flow_per_day", &self.cash_flow_per_day),
            ("dso", &self.dso),
            ("dio", &self.dio),
            ("dpo", &self.dpo),
            ("working_capital_ratio", &self.working_capital_ratio),
            ("cash_reserve_ratio", &self.cash_reserve_ratio),
            ("runway", &self.runway),
            (
                "gross_profit_to_cash_conversion",
                &self.gross_profit_to_cash_conversion,
            ),
            ("profit_cash_flow_gap", &self.profit_cash_flow_gap),
            (
                "cost_of_sales_to_cash_outflow",
                &self.cost_of_sales_to_cash_outflow,
            ),
            (
                "debt_service_coverage_ratio",
                &self.debt_service_coverage_ratio,
            ),
        ];
        named
            .into_iter()
            .filter_map(|(name, m)| m.reason().map(|r| (name, r)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive cash flow metrics for `current`, measuring working-capital
/// movements against `previous` when supplied.
///
/// Pure and deterministic. Zero denominators and unreported optional line
/// items produce `Metric::Undefined`, never a zero or an infinity.
pub fn compute_metrics(
    current: &FinancialPeriod,
    previous: Option<&FinancialPeriod>,
) -> CashFlowResult<CashFlowMetrics> {
    current.validate()?;
    if let Some(prev) = previous {
        prev.validate()?;
    }

    tracing::debug!(
        period = %current.label,
        previous = previous.map(|p| p.label.as_str()).unwrap_or("-"),
        "computing cash flow metrics"
    );

    let working_capital = working_capital_movement(current, previous);
    let cogs = working_capital.cogs;

    let operating_cash_flow = match current.depreciation_amortization {
        Some(depreciation) => Metric::defined(
            current.net_profit + depreciation - working_capital.ar_increase
                - working_capital.inventory_increase
                + working_capital.ap_increase,
        ),
        None => Metric::missing("depreciation_amortization"),
    };

    let operating_cash_flow_margin = operating_cash_flow
        .clone()
        .and_then(|ocf| Metric::ratio(ocf, current.revenue, "revenue"))
        .checked_scale(dec!(100), "operating_cash_flow_margin");

    let dso = Metric::ratio(current.accounts_receivable, current.revenue, "revenue")
        .checked_scale(DAYS_PER_YEAR, "dso");
    let dio = Metric::ratio(current.inventory, cogs, "cogs").checked_scale(DAYS_PER_YEAR, "dio");
    let dpo =
        Metric::ratio(current.accounts_payable, cogs, "cogs").checked_scale(DAYS_PER_YEAR, "dpo");
    let cash_conversion_cycle = dso
        .try_zip_with(&dio, Decimal::checked_add, "cash_conversion_cycle")
        .try_zip_with(&dpo, Decimal::checked_sub, "cash_conversion_cycle");

    let cash_flow_per_day = operating_cash_flow.clone().map(|ocf| ocf / DAYS_PER_YEAR);

    let working_capital_ratio = Metric::ratio(
        current.total_current_assets,
        current.total_current_liabilities,
        "total_current_liabilities",
    );

    let cost_base = current.operating_cost_base();
    let cash_reserve_ratio = Metric::ratio(current.cash, cost_base, "revenue_minus_operating_profit");

    let burn_rate = cost_base / MONTHS_PER_YEAR;
    let runway = Metric::ratio(current.cash, burn_rate, "monthly_burn_rate");

    let gross_profit_to_cash_conversion = operating_cash_flow
        .clone()
        .and_then(|ocf| Metric::ratio(ocf, current.gross_profit, "gross_profit"));

    let profit_cash_flow_gap = operating_cash_flow
        .clone()
        .map(|ocf| current.net_profit - ocf);

    let cost_of_sales_to_cash_outflow = Metric::ratio(
        cogs,
        cogs + working_capital.inventory_increase - working_capital.ap_increase,
        "cash_outflow_for_cost_of_sales",
    );

    let debt_service_numerator = match current.depreciation_amortization {
        Some(depreciation) => Metric::defined(current.operating_profit + depreciation),
        None => Metric::missing("depreciation_amortization"),
    };
    let interest = match current.interest_paid {
        Some(interest) => Metric::defined(interest),
        None => Metric::missing("interest_paid"),
    };
    let debt_service_coverage_ratio =
        Metric::ratio_of(&debt_service_numerator, &interest, "interest_paid");

    let metrics = CashFlowMetrics {
        period_label: current.label.clone(),
        working_capital,
        operating_cash_flow,
        operating_cash_flow_margin,
        cash_conversion_cycle,
        cash_flow_per_day,
        dso,
        dio,
        dpo,
        working_capital_ratio,
        cash_reserve_ratio,
        burn_rate,
        runway,
        gross_profit_to_cash_conversion,
        profit_cash_flow_gap,
        cost_of_sales_to_cash_outflow,
        debt_service_coverage_ratio,
    };

    for (name, reason) in metrics.undefined_metrics() {
        tracing::warn!(period = %current.label, metric = name, %reason, "metric undefined");
    }

    Ok(metrics)
}

/// Metrics for the most recent period of a chronological series, measured
/// against its predecessor. The whole series is validated first.
pub fn latest_metrics(periods: &[FinancialPeriod]) -> CashFlowResult<CashFlowMetrics> {
    validate_series(periods)?;
    let (current, previous) = latest_pair(periods)?;
    compute_metrics(current, previous)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn working_capital_movement(
    current: &FinancialPeriod,
    previous: Option<&FinancialPeriod>,
) -> WorkingCapitalMovement {
    let (ar_increase, inventory_increase, ap_increase) = match previous {
        Some(prev) => (
            current.accounts_receivable - prev.accounts_receivable,
            current.inventory - prev.inventory,
            current.accounts_payable - prev.accounts_payable,
        ),
        None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
    };
    WorkingCapitalMovement {
        cogs: current.cogs(),
        ar_increase,
        inventory_increase,
        ap_increase,
        has_previous: previous.is_some(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
