//! Normalized representation of one reporting period's financial line items.
//!
//! Periods are supplied by an import layer already parsed to decimals and in
//! chronological order. Required line items are plain fields, so a record
//! without them fails to deserialize; optional line items are `Option` and
//! only the formulas that can tolerate their absence treat them as zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CashFlowError;
use crate::types::Money;
use crate::CashFlowResult;

/// One reporting period's raw figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    /// Period label, e.g. "FY2023"
    pub label: String,
    /// Length of the period in months
    #[serde(default = "default_period_months")]
    pub period_months: u32,
    pub revenue: Money,
    pub gross_profit: Money,
    /// May be negative
    pub operating_profit: Money,
    /// May be negative
    pub net_profit: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depreciation_amortization: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_paid: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributions: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_assets: Option<Money>,
    pub cash: Money,
    pub accounts_receivable: Money,
    pub inventory: Money,
    pub total_current_assets: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_assets: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_liabilities: Option<Money>,
    pub accounts_payable: Money,
    pub total_current_liabilities: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_loans_current: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_loans_non_current: Option<Money>,
}

fn default_period_months() -> u32 {
    12
}

impl FinancialPeriod {
    /// Revenue minus gross profit.
    pub fn cogs(&self) -> Money {
        self.revenue - self.gross_profit
    }

    /// Revenue minus operating profit: the cost base used for burn rate.
    pub fn operating_cost_base(&self) -> Money {
        self.revenue - self.operating_profit
    }

    /// Current plus non-current bank loans; unreported loans count as zero.
    pub fn total_bank_debt(&self) -> Money {
        self.bank_loans_current.unwrap_or_default() + self.bank_loans_non_current.unwrap_or_default()
    }

    /// Validate a single period. Garbage-in on totals is tolerated; signs and
    /// structural fields are not.
    pub fn validate(&self) -> CashFlowResult<()> {
        if self.label.trim().is_empty() {
            return Err(CashFlowError::InvalidInput {
                field: "label".into(),
                reason: "Period label cannot be empty.".into(),
            });
        }
        if self.period_months == 0 || self.period_months > 12 {
            return Err(CashFlowError::InvalidInput {
                field: "period_months".into(),
                reason: format!(
                    "Period length must be between 1 and 12 months in period '{}'.",
                    self.label
                ),
            });
        }

        let required = [
            ("revenue", self.revenue),
            ("gross_profit", self.gross_profit),
            ("cash", self.cash),
            ("accounts_receivable", self.accounts_receivable),
            ("inventory", self.inventory),
            ("total_current_assets", self.total_current_assets),
            ("accounts_payable", self.accounts_payable),
            ("total_current_liabilities", self.total_current_liabilities),
        ];
        for (field, value) in required {
            ensure_non_negative(&self.label, field, value)?;
        }

        let optional = [
            ("depreciation_amortization", self.depreciation_amortization),
            ("interest_paid", self.interest_paid),
            ("distributions", self.distributions),
            ("total_assets", self.total_assets),
            ("fixed_assets", self.fixed_assets),
            ("total_liabilities", self.total_liabilities),
            ("bank_loans_current", self.bank_loans_current),
            ("bank_loans_non_current", self.bank_loans_non_current),
        ];
        for (field, value) in optional {
            if let Some(v) = value {
                ensure_non_negative(&self.label, field, v)?;
            }
        }

        let itemised = self.cash + self.accounts_receivable + self.inventory;
        if self.total_current_assets < itemised {
            tracing::warn!(
                period = %self.label,
                total_current_assets = %self.total_current_assets,
                itemised = %itemised,
                "total current assets below cash + receivables + inventory"
            );
        }

        Ok(())
    }
}

fn ensure_non_negative(period: &str, field: &str, value: Decimal) -> CashFlowResult<()> {
    if value < Decimal::ZERO {
        return Err(CashFlowError::InvalidInput {
            field: field.into(),
            reason: format!("Value cannot be negative in period '{period}'."),
        });
    }
    Ok(())
}

/// Validate a chronologically ordered series: non-empty, uniquely labelled,
/// and every period individually valid.
pub fn validate_series(periods: &[FinancialPeriod]) -> CashFlowResult<()> {
    if periods.is_empty() {
        return Err(CashFlowError::EmptyPeriodSeries);
    }
    let mut seen = HashSet::with_capacity(periods.len());
    for p in periods {
        p.validate()?;
        if !seen.insert(p.label.as_str()) {
            return Err(CashFlowError::InvalidInput {
                field: "label".into(),
                reason: format!("Duplicate period label '{}'.", p.label),
            });
        }
    }
    Ok(())
}

/// The most recent period and its predecessor, if any.
pub fn latest_pair(
    periods: &[FinancialPeriod],
) -> CashFlowResult<(&FinancialPeriod, Option<&FinancialPeriod>)> {
    match periods {
        [] => Err(CashFlowError::EmptyPeriodSeries),
        [only] => Ok((only, None)),
        [.., previous, current] => Ok((current, Some(previous))),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    pub fn fy2022() -> FinancialPeriod {
        FinancialPeriod {
            label: "FY2022".into(),
            period_months: 12,
            revenue: dec!(3_400_000),
            gross_profit: dec!(865_000),
            operating_profit: dec!(420_000),
            net_profit: dec!(240_000),
            depreciation_amortization: Some(dec!(90_000)),
            interest_paid: Some(dec!(45_000)),
            distributions: Some(dec!(100_000)),
            total_assets: Some(dec!(2_900_000)),
            cash: dec!(310_000),
            accounts_receivable: dec!(570_000),
            inventory: dec!(480_000),
            total_current_assets: dec!(1_400_000),
            fixed_assets: Some(dec!(1_500_000)),
            total_liabilities: Some(dec!(1_700_000)),
            accounts_payable: dec!(390_000),
            total_current_liabilities: dec!(950_000),
            bank_loans_current: Some(dec!(200_000)),
            bank_loans_non_current: Some(dec!(600_000)),
        }
    }

    pub fn fy2023() -> FinancialPeriod {
        FinancialPeriod {
            label: "FY2023".into(),
            period_months: 12,
            revenue: dec!(4_100_000),
            gross_profit: dec!(1_050_000),
            operating_profit: dec!(480_000),
            net_profit: dec!(280_000),
            depreciation_amortization: Some(dec!(100_000)),
            interest_paid: Some(dec!(50_000)),
            distributions: Some(dec!(120_000)),
            total_assets: Some(dec!(3_300_000)),
            cash: dec!(350_000),
            accounts_receivable: dec!(900_000),
            inventory: dec!(560_000),
            total_current_assets: dec!(1_850_000),
            fixed_assets: Some(dec!(1_450_000)),
            total_liabilities: Some(dec!(1_950_000)),
            accounts_payable: dec!(460_000),
            total_current_liabilities: dec!(1_150_000),
            bank_loans_current: Some(dec!(250_000)),
            bank_loans_non_current: Some(dec!(650_000)),
        }
    }
}
