//! Receivables aging buckets, risk scoring and collection actions.
//!
//! Every derived field is a function of days overdue as of the evaluation
//! date, so accounts are re-evaluated on every run rather than stored.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CashFlowError;
use crate::types::{Money, Rate};
use crate::CashFlowResult;

// ---------------------------------------------------------------------------
// Classification types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "0-30")]
    Current,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "91-120")]
    Days91To120,
    #[serde(rename = "120+")]
    Over120,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Days91To120,
        AgingBucket::Over120,
    ];

    pub fn from_days_overdue(days_overdue: i64) -> Self {
        match days_overdue {
            d if d < 31 => AgingBucket::Current,
            d if d < 61 => AgingBucket::Days31To60,
            d if d < 91 => AgingBucket::Days61To90,
            d if d < 121 => AgingBucket::Days91To120,
            _ => AgingBucket::Over120,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "0-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Days91To120 => "91-120",
            AgingBucket::Over120 => "120+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentHistoryTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// 0-6 days overdue
    Monitor,
    /// 7-14
    FriendlyReminder,
    /// 15-29
    PhoneFollowUp,
    /// 30-59
    FormalNotice,
    /// 60-89
    Escalate,
    /// 90+
    LegalOrWriteOff,
}

impl RecommendedAction {
    pub fn from_days_overdue(days_overdue: i64) -> Self {
        match days_overdue {
            d if d < 7 => RecommendedAction::Monitor,
            d if d < 15 => RecommendedAction::FriendlyReminder,
            d if d < 30 => RecommendedAction::PhoneFollowUp,
            d if d < 60 => RecommendedAction::FormalNotice,
            d if d < 90 => RecommendedAction::Escalate,
            _ => RecommendedAction::LegalOrWriteOff,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Assumed fraction of each bucket collected within a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryRates {
    pub current: Rate,
    pub days_31_60: Rate,
    pub days_61_90: Rate,
    pub days_91_120: Rate,
    pub over_120: Rate,
}

impl Default for RecoveryRates {
    fn default() -> Self {
        RecoveryRates {
            current: dec!(0.95),
            days_31_60: dec!(0.80),
            days_61_90: dec!(0.60),
            days_91_120: dec!(0.40),
            over_120: dec!(0.20),
        }
    }
}

impl RecoveryRates {
    pub fn rate(&self, bucket: AgingBucket) -> Rate {
        match bucket {
            AgingBucket::Current => self.current,
            AgingBucket::Days31To60 => self.days_31_60,
            AgingBucket::Days61To90 => self.days_61_90,
            AgingBucket::Days91To120 => self.days_91_120,
            AgingBucket::Over120 => self.over_120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivablesConfig {
    /// Risk points added per day overdue
    pub risk_points_per_day: Decimal,
    /// Deterministic adjustment added to every risk score (0 = none)
    pub risk_jitter: Decimal,
    pub urgent_above: Decimal,
    pub high_above: Decimal,
    pub medium_above: Decimal,
    pub excellent_below: Decimal,
    pub good_below: Decimal,
    pub fair_below: Decimal,
    pub recovery_rates: RecoveryRates,
    /// Number of customers listed in the concentration report
    pub top_customers: usize,
}

impl Default for ReceivablesConfig {
    fn default() -> Self {
        ReceivablesConfig {
            risk_points_per_day: dec!(0.8),
            risk_jitter: Decimal::ZERO,
            urgent_above: dec!(80),
            high_above: dec!(60),
            medium_above: dec!(40),
            excellent_below: dec!(30),
            good_below: dec!(50),
            fair_below: dec!(70),
            recovery_rates: RecoveryRates::default(),
            top_customers: 5,
        }
    }
}

impl ReceivablesConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        if self.risk_points_per_day < Decimal::ZERO {
            return Err(CashFlowError::InvalidInput {
                field: "receivables.risk_points_per_day".into(),
                reason: "Risk points per day cannot be negative.".into(),
            });
        }
        if !(self.medium_above < self.high_above && self.high_above < self.urgent_above) {
            return Err(CashFlowError::InvalidInput {
                field: "receivables.priority_thresholds".into(),
                reason: "Priority thresholds must satisfy medium < high < urgent.".into(),
            });
        }
        if !(self.excellent_below < self.good_below && self.good_below < self.fair_below) {
            return Err(CashFlowError::InvalidInput {
                field: "receivables.tier_thresholds".into(),
                reason: "Tier thresholds must satisfy excellent < good < fair.".into(),
            });
        }
        for bucket in AgingBucket::ALL {
            let rate = self.recovery_rates.rate(bucket);
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(CashFlowError::InvalidInput {
                    field: format!("receivables.recovery_rates[{}]", bucket.label()),
                    reason: "Recovery rate must be between 0 and 1.".into(),
                });
            }
        }
        Ok(())
    }

    /// `min(100, days_overdue x points + jitter)`, floored at zero.
    pub fn risk_score(&self, days_overdue: i64) -> Decimal {
        let raw = Decimal::from(days_overdue) * self.risk_points_per_day + self.risk_jitter;
        raw.clamp(Decimal::ZERO, dec!(100))
    }

    pub fn priority(&self, risk_score: Decimal) -> CollectionPriority {
        if risk_score > self.urgent_above {
            CollectionPriority::Urgent
        } else if risk_score > self.high_above {
            CollectionPriority::High
        } else if risk_score > self.medium_above {
            CollectionPriority::Medium
        } else {
            CollectionPriority::Low
        }
    }

    pub fn payment_tier(&self, risk_score: Decimal) -> PaymentHistoryTier {
        if risk_score < self.excellent_below {
            PaymentHistoryTier::Excellent
        } else if risk_score < self.good_below {
            PaymentHistoryTier::Good
        } else if risk_score < self.fair_below {
            PaymentHistoryTier::Fair
        } else {
            PaymentHistoryTier::Poor
        }
    }
}

// ---------------------------------------------------------------------------
// Account types
// ---------------------------------------------------------------------------

/// One outstanding invoice as delivered by the source system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivableRecord {
    pub customer_id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub original_amount: Money,
    pub outstanding_amount: Money,
}

/// An invoice evaluated as of a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivableAccount {
    pub customer_id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub original_amount: Money,
    pub outstanding_amount: Money,
    /// max(0, as_of - due_date)
    pub days_overdue: i64,
    /// max(0, as_of - invoice_date)
    pub days_since_invoice: i64,
    pub aging_bucket: AgingBucket,
    /// 0-100
    pub risk_score: Decimal,
    pub collection_priority: CollectionPriority,
    pub payment_history_tier: PaymentHistoryTier,
    pub recommended_action: RecommendedAction,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive bucket, score, priority, tier and action for one invoice.
pub fn evaluate_account(
    record: &ReceivableRecord,
    as_of: NaiveDate,
    config: &ReceivablesConfig,
) -> CashFlowResult<ReceivableAccount> {
    validate_record(record)?;

    let days_overdue = (as_of - record.due_date).num_days().max(0);
    let days_since_invoice = (as_of - record.invoice_date).num_days().max(0);
    let risk_score = config.risk_score(days_overdue);

    Ok(ReceivableAccount {
        customer_id: record.customer_id.clone(),
        invoice_number: record.invoice_number.clone(),
        invoice_date: record.invoice_date,
        due_date: record.due_date,
        original_amount: record.original_amount,
        outstanding_amount: record.outstanding_amount,
        days_overdue,
        days_since_invoice,
        aging_bucket: AgingBucket::from_days_overdue(days_overdue),
        risk_score,
        collection_priority: config.priority(risk_score),
        payment_history_tier: config.payment_tier(risk_score),
        recommended_action: RecommendedAction::from_days_overdue(days_overdue),
    })
}

/// Evaluate every record and order by risk score, highest first.
///
/// Ties break on larger outstanding amount, then invoice number, so the
/// ordering is stable across runs.
pub fn bucket_and_score(
    records: &[ReceivableRecord],
    as_of: NaiveDate,
    config: &ReceivablesConfig,
) -> CashFlowResult<Vec<ReceivableAccount>> {
    config.validate()?;
    tracing::debug!(accounts = records.len(), %as_of, "scoring receivables");

    let mut accounts = records
        .iter()
        .map(|r| evaluate_account(r, as_of, config))
        .collect::<CashFlowResult<Vec<_>>>()?;

    accounts.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| b.outstanding_amount.cmp(&a.outstanding_amount))
            .then_with(|| a.invoice_number.cmp(&b.invoice_number))
    });

    Ok(accounts)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_record(record: &ReceivableRecord) -> CashFlowResult<()> {
    if record.original_amount < Decimal::ZERO {
        return Err(CashFlowError::InvalidInput {
            field: "original_amount".into(),
            reason: format!("Amount cannot be negative on invoice '{}'.", record.invoice_number),
        });
    }
    if record.outstanding_amount < Decimal::ZERO {
        return Err(CashFlowError::InvalidInput {
            field: "outstanding_amount".into(),
            reason: format!("Amount cannot be negative on invoice '{}'.", record.invoice_number),
        });
    }
    if record.due_date < record.invoice_date {
        return Err(CashFlowError::InvalidInput {
            field: "due_date".into(),
            reason: format!(
                "Due date precedes invoice date on invoice '{}'.",
                record.invoice_number
            ),
        });
    }
    if record.outstanding_amount > record.original_amount {
        tracing::warn!(
            invoice = %record.invoice_number,
            outstanding = %record.outstanding_amount,
            original = %record.original_amount,
            "outstanding amount exceeds original amount"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
