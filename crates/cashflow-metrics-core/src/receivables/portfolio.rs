use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::types::{with_metadata, ComputationOutput, Metric, Money, Rate};
use crate::CashFlowResult;

use super::aging::{bucket_and_score, AgingBucket, ReceivableAccount, ReceivableRecord, ReceivablesConfig};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivablesInput {
    /// Evaluation date ("now")
    pub as_of: NaiveDate,
    pub accounts: Vec<ReceivableRecord>,
}

/// Aggregates for one aging bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub bucket: AgingBucket,
    pub count: usize,
    pub outstanding: Money,
    /// Share of total outstanding, in percent
    pub percentage_of_outstanding: Metric,
    pub recovery_rate: Rate,
    /// outstanding x recovery_rate
    pub expected_collection: Money,
}

/// Outstanding exposure to a single customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerExposure {
    pub customer_id: String,
    pub invoices: usize,
    pub outstanding: Money,
    /// Share of total outstanding, in percent
    pub share: Metric,
    pub max_days_overdue: i64,
}

/// Portfolio-level collection metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivablesMetrics {
    pub account_count: usize,
    pub total_outstanding: Money,
    pub overdue_count: usize,
    pub overdue_amount: Money,
    /// Always five entries, in bucket order
    pub buckets: Vec<BucketSummary>,
    /// Days since invoice, weighted by outstanding amount
    pub weighted_average_dso: Metric,
    /// Percent of outstanding in the 0-30 bucket
    pub collection_efficiency: Metric,
    /// Percent of outstanding in the 120+ bucket
    pub bad_debt_rate: Metric,
    /// Sum of each bucket's outstanding times its recovery rate
    pub monthly_collection_forecast: Money,
    /// Largest customers by outstanding amount
    pub top_customers: Vec<CustomerExposure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivablesAnalysis {
    /// Ordered by risk score, highest first
    pub accounts: Vec<ReceivableAccount>,
    pub portfolio: ReceivablesMetrics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Aggregate evaluated accounts into bucket, efficiency and forecast metrics.
///
/// An empty portfolio is valid: amounts are zero and every ratio is undefined.
pub fn compute_portfolio_metrics(
    accounts: &[ReceivableAccount],
    config: &ReceivablesConfig,
) -> CashFlowResult<ReceivablesMetrics> {
    config.validate()?;

    let total_outstanding: Money = accounts.iter().map(|a| a.outstanding_amount).sum();
    let overdue: Vec<&ReceivableAccount> = accounts.iter().filter(|a| a.days_overdue > 0).collect();
    let overdue_amount: Money = overdue.iter().map(|a| a.outstanding_amount).sum();

    let buckets: Vec<BucketSummary> = AgingBucket::ALL
        .iter()
        .map(|&bucket| {
            let in_bucket = accounts.iter().filter(|a| a.aging_bucket == bucket);
            let (count, outstanding) = in_bucket.fold((0usize, Decimal::ZERO), |(n, sum), a| {
                (n + 1, sum + a.outstanding_amount)
            });
            let recovery_rate = config.recovery_rates.rate(bucket);
            BucketSummary {
                bucket,
                count,
                outstanding,
                percentage_of_outstanding: percentage_of(outstanding, total_outstanding),
                recovery_rate,
                expected_collection: outstanding * recovery_rate,
            }
        })
        .collect();

    let weighted_days: Decimal = accounts
        .iter()
        .map(|a| a.outstanding_amount * Decimal::from(a.days_since_invoice))
        .sum();
    let weighted_average_dso = Metric::ratio(weighted_days, total_outstanding, "total_outstanding");

    let bucket_amount = |b: AgingBucket| {
        buckets
            .iter()
            .find(|s| s.bucket == b)
            .map(|s| s.outstanding)
            .unwrap_or_default()
    };
    let collection_efficiency = percentage_of(bucket_amount(AgingBucket::Current), total_outstanding);
    let bad_debt_rate = percentage_of(bucket_amount(AgingBucket::Over120), total_outstanding);

    let monthly_collection_forecast: Money = buckets.iter().map(|b| b.expected_collection).sum();

    let top_customers = customer_concentration(accounts, total_outstanding, config.top_customers);

    Ok(ReceivablesMetrics {
        account_count: accounts.len(),
        total_outstanding,
        overdue_count: overdue.len(),
        overdue_amount,
        buckets,
        weighted_average_dso,
        collection_efficiency,
        bad_debt_rate,
        monthly_collection_forecast,
        top_customers,
    })
}

/// Score every record as of `input.as_of` and aggregate the portfolio.
pub fn analyze_receivables(
    input: &ReceivablesInput,
    config: &ReceivablesConfig,
) -> CashFlowResult<ComputationOutput<ReceivablesAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let accounts = bucket_and_score(&input.accounts, input.as_of, config)?;
    let portfolio = compute_portfolio_metrics(&accounts, config)?;

    if accounts.is_empty() {
        warnings.push("No receivable accounts supplied; portfolio ratios are undefined.".into());
    }
    for a in accounts.iter().filter(|a| a.outstanding_amount > a.original_amount) {
        warnings.push(format!(
            "Invoice '{}': outstanding amount exceeds original amount.",
            a.invoice_number
        ));
    }
    if let Some(top) = portfolio.top_customers.first() {
        if matches!(top.share.value(), Some(s) if s > dec!(50)) {
            warnings.push(format!(
                "Customer '{}' holds more than half of outstanding receivables.",
                top.customer_id
            ));
        }
    }

    let output = ReceivablesAnalysis {
        accounts,
        portfolio,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Receivables aging (0-30/31-60/61-90/91-120/120+), linear risk score, recovery-rate collection forecast",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn percentage_of(part: Money, total: Money) -> Metric {
    Metric::ratio(part, total, "total_outstanding").map(|r| r * dec!(100))
}

fn customer_concentration(
    accounts: &[ReceivableAccount],
    total_outstanding: Money,
    limit: usize,
) -> Vec<CustomerExposure> {
    let mut by_customer: BTreeMap<&str, (usize, Money, i64)> = BTreeMap::new();
    for a in accounts {
        let entry = by_customer
            .entry(a.customer_id.as_str())
            .or_insert((0, Decimal::ZERO, 0));
        entry.0 += 1;
        entry.1 += a.outstanding_amount;
        entry.2 = entry.2.max(a.days_overdue);
    }

    let mut exposures: Vec<CustomerExposure> = by_customer
        .into_iter()
        .map(|(customer_id, (invoices, outstanding, max_days_overdue))| CustomerExposure {
            customer_id: customer_id.to_string(),
            invoices,
            outstanding,
            share: percentage_of(outstanding, total_outstanding),
            max_days_overdue,
        })
        .collect();

    exposures.sort_by(|a, b| {
        b.outstanding
            .cmp(&a.outstanding)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    exposures.truncate(limit);
    exposures
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
