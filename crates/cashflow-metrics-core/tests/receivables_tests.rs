use cashflow_metrics_core::receivables::aging::{
    bucket_and_score, AgingBucket, CollectionPriority, PaymentHistoryTier, ReceivableRecord,
    ReceivablesConfig, RecommendedAction,
};
use cashflow_metrics_core::receivables::portfolio::{analyze_receivables, ReceivablesInput};
use cashflow_metrics_core::CashFlowError;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(
    customer: &str,
    invoice: &str,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    original: Decimal,
    outstanding: Decimal,
) -> ReceivableRecord {
    ReceivableRecord {
        customer_id: customer.into(),
        invoice_number: invoice.into(),
        invoice_date,
        due_date,
        original_amount: original,
        outstanding_amount: outstanding,
    }
}

fn ledger() -> ReceivablesInput {
    ReceivablesInput {
        as_of: date(2024, 9, 30),
        accounts: vec![
            // Not yet due
            record(
                "C1",
                "A-100",
                date(2024, 9, 1),
                date(2024, 10, 1),
                dec!(25_000),
                dec!(25_000),
            ),
            // 60 days overdue
            record(
                "C1",
                "A-101",
                date(2024, 7, 2),
                date(2024, 8, 1),
                dec!(15_000),
                dec!(15_000),
            ),
            // 152 days overdue, partly paid
            record(
                "C2",
                "B-200",
                date(2024, 4, 1),
                date(2024, 5, 1),
                dec!(12_000),
                dec!(10_000),
            ),
        ],
    }
}

#[test]
fn test_accounts_classified_and_ordered_by_risk() {
    let input = ledger();
    let accounts =
        bucket_and_score(&input.accounts, input.as_of, &ReceivablesConfig::default()).unwrap();

    let order: Vec<&str> = accounts.iter().map(|a| a.invoice_number.as_str()).collect();
    assert_eq!(order, vec!["B-200", "A-101", "A-100"]);

    let worst = &accounts[0];
    assert_eq!(worst.days_overdue, 152);
    assert_eq!(worst.aging_bucket, AgingBucket::Over120);
    assert_eq!(worst.risk_score, dec!(100));
    assert_eq!(worst.collection_priority, CollectionPriority::Urgent);
    assert_eq!(worst.payment_history_tier, PaymentHistoryTier::Poor);
    assert_eq!(worst.recommended_action, RecommendedAction::LegalOrWriteOff);

    let middle = &accounts[1];
    assert_eq!(middle.days_overdue, 60);
    assert_eq!(middle.aging_bucket, AgingBucket::Days31To60);
    assert_eq!(middle.risk_score, dec!(48));
    assert_eq!(middle.collection_priority, CollectionPriority::Medium);
    assert_eq!(middle.payment_history_tier, PaymentHistoryTier::Good);
    assert_eq!(middle.recommended_action, RecommendedAction::Escalate);

    let current = &accounts[2];
    assert_eq!(current.days_overdue, 0);
    assert_eq!(current.aging_bucket, AgingBucket::Current);
    assert_eq!(current.risk_score, Decimal::ZERO);
    assert_eq!(current.recommended_action, RecommendedAction::Monitor);
}

#[test]
fn test_portfolio_metrics() {
    let out = analyze_receivables(&ledger(), &ReceivablesConfig::default()).unwrap();
    let p = &out.result.portfolio;

    assert_eq!(p.account_count, 3);
    assert_eq!(p.total_outstanding, dec!(50_000));
    assert_eq!(p.overdue_count, 2);
    assert_eq!(p.overdue_amount, dec!(25_000));

    assert_eq!(p.collection_efficiency.value(), Some(dec!(50)));
    assert_eq!(p.bad_debt_rate.value(), Some(dec!(20)));

    // 25k x .95 + 15k x .80 + 10k x .20
    assert_eq!(p.monthly_collection_forecast, dec!(37_750));

    // (25k x 29 + 15k x 90 + 10k x 182) / 50k
    assert_eq!(p.weighted_average_dso.value(), Some(dec!(77.9)));

    let counts: Vec<usize> = p.buckets.iter().map(|b| b.count).collect();
    assert_eq!(counts, vec![1, 1, 0, 0, 1]);

    assert_eq!(p.top_customers[0].customer_id, "C1");
    assert_eq!(p.top_customers[0].outstanding, dec!(40_000));
    assert_eq!(p.top_customers[0].share.value(), Some(dec!(80)));
    assert!(out.warnings.iter().any(|w| w.contains("'C1'")));
}

#[test]
fn test_bucket_labels_serialize_as_ranges() {
    let out = analyze_receivables(&ledger(), &ReceivablesConfig::default()).unwrap();
    let json = serde_json::to_value(&out.result.portfolio.buckets).unwrap();
    let labels: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["bucket"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["0-30", "31-60", "61-90", "91-120", "120+"]);
}

#[test]
fn test_empty_portfolio_has_undefined_ratios() {
    let input = ReceivablesInput {
        as_of: date(2024, 9, 30),
        accounts: vec![],
    };
    let out = analyze_receivables(&input, &ReceivablesConfig::default()).unwrap();
    let p = &out.result.portfolio;
    assert_eq!(p.total_outstanding, Decimal::ZERO);
    assert!(!p.collection_efficiency.is_defined());
    assert!(!p.weighted_average_dso.is_defined());
    assert_eq!(p.monthly_collection_forecast, Decimal::ZERO);
    assert!(!out.warnings.is_empty());
}

#[test]
fn test_custom_recovery_rates_change_forecast() {
    let mut config = ReceivablesConfig::default();
    config.recovery_rates.over_120 = Decimal::ZERO;
    let out = analyze_receivables(&ledger(), &config).unwrap();
    assert_eq!(out.result.portfolio.monthly_collection_forecast, dec!(35_750));
}

#[test]
fn test_due_before_invoice_rejected() {
    let mut input = ledger();
    input.accounts[0].due_date = date(2024, 8, 1);
    let err = analyze_receivables(&input, &ReceivablesConfig::default()).unwrap_err();
    assert!(matches!(err, CashFlowError::InvalidInput { .. }));
}

#[test]
fn test_scoring_is_deterministic() {
    let a = analyze_receivables(&ledger(), &ReceivablesConfig::default()).unwrap();
    let b = analyze_receivables(&ledger(), &ReceivablesConfig::default()).unwrap();
    assert_eq!(a.result.accounts, b.result.accounts);
}
