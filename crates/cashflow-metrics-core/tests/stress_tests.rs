use cashflow_metrics_core::metrics::calculator::compute_metrics;
use cashflow_metrics_core::stress::scenario::{
    analyze_stress, apply_scenario, default_scenario_library, run_stress_suite,
    ScenarioDefinition, ScenarioParameters, StressConfig, StressSeverity, StressTestInput,
};
use cashflow_metrics_core::stress::sensitivity::{SensitivityRequest, SensitivityVariable};
use cashflow_metrics_core::{CashFlowError, FinancialPeriod};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn base_period() -> FinancialPeriod {
    FinancialPeriod {
        label: "FY2023".into(),
        period_months: 12,
        revenue: dec!(4_100_000),
        gross_profit: dec!(1_050_000),
        operating_profit: dec!(480_000),
        net_profit: dec!(280_000),
        depreciation_amortization: Some(dec!(100_000)),
        interest_paid: Some(dec!(50_000)),
        distributions: None,
        total_assets: None,
        cash: dec!(350_000),
        accounts_receivable: dec!(900_000),
        inventory: dec!(560_000),
        total_current_assets: dec!(1_850_000),
        fixed_assets: None,
        total_liabilities: None,
        accounts_payable: dec!(460_000),
        total_current_liabilities: dec!(1_150_000),
        bank_loans_current: None,
        bank_loans_non_current: None,
    }
}

fn downturn() -> ScenarioDefinition {
    default_scenario_library()
        .into_iter()
        .find(|s| s.name == "Economic Downturn")
        .unwrap()
}

#[test]
fn test_library_has_five_named_scenarios() {
    let names: Vec<String> = default_scenario_library()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "Economic Downturn",
            "Supply Chain Disruption",
            "Major Customer Loss",
            "Interest Rate Shock",
            "Growth",
        ]
    );
}

#[test]
fn test_downturn_on_profitable_base_is_at_least_medium() {
    let p = base_period();
    let m = compute_metrics(&p, None).unwrap();
    let impact =
        apply_scenario(&p, &m, &downturn().parameters, &StressConfig::default()).unwrap();
    assert!(impact.severity >= StressSeverity::Medium);
    assert!(impact.operating_cash_flow < m.operating_cash_flow.value().unwrap());
    // Slower collections lengthen the cycle
    assert!(
        impact.cash_conversion_cycle.value().unwrap()
            > m.cash_conversion_cycle.value().unwrap()
    );
}

#[test]
fn test_severity_monotone_in_revenue_decline() {
    let p = base_period();
    let m = compute_metrics(&p, None).unwrap();
    let config = StressConfig::default();

    let severities: Vec<StressSeverity> = [dec!(0), dec!(-5), dec!(-10), dec!(-20), dec!(-40)]
        .iter()
        .map(|&r| {
            let params = ScenarioParameters {
                revenue_change_pct: r,
                ..ScenarioParameters::default()
            };
            apply_scenario(&p, &m, &params, &config).unwrap().severity
        })
        .collect();

    for pair in severities.windows(2) {
        assert!(pair[0] <= pair[1], "{severities:?}");
    }
    assert_eq!(severities[0], StressSeverity::Low);
    assert_eq!(severities[4], StressSeverity::Critical);
}

#[test]
fn test_burn_and_runway_follow_revenue_change() {
    let p = base_period();
    let m = compute_metrics(&p, None).unwrap();
    let config = StressConfig::default();

    let impacts: Vec<_> = [dec!(-30), dec!(-10), dec!(0), dec!(10), dec!(30)]
        .iter()
        .map(|&r| {
            let params = ScenarioParameters {
                revenue_change_pct: r,
                ..ScenarioParameters::default()
            };
            apply_scenario(&p, &m, &params, &config).unwrap()
        })
        .collect();

    assert_eq!(impacts[2].burn_rate.value(), Some(m.burn_rate));
    for pair in impacts.windows(2) {
        let (lower, higher) = (&pair[0], &pair[1]);
        assert!(lower.burn_rate.value().unwrap() < higher.burn_rate.value().unwrap());
        assert!(lower.runway.value().unwrap() > higher.runway.value().unwrap());
    }
    // Operating margin is held at 480k / 4.1M
    assert_eq!(
        impacts[0].adjusted.operating_profit.value(),
        Some(dec!(336_000))
    );
}

#[test]
fn test_scenario_does_not_mutate_base() {
    let p = base_period();
    let m = compute_metrics(&p, None).unwrap();
    let before = p.clone();
    let _ = apply_scenario(&p, &m, &downturn().parameters, &StressConfig::default()).unwrap();
    assert_eq!(p, before);
}

#[test]
fn test_suite_identifies_worst_case() {
    let p = base_period();
    let m = compute_metrics(&p, None).unwrap();
    let config = StressConfig::default();
    let suite = run_stress_suite(&p, &m, &config.scenarios, &config).unwrap();
    assert_eq!(suite.scenarios.len(), 5);

    let worst = suite.worst_case.as_deref().unwrap();
    let max = suite
        .scenarios
        .iter()
        .map(|s| s.impact.severity)
        .max()
        .unwrap();
    let worst_scenario = suite.scenarios.iter().find(|s| s.name == worst).unwrap();
    assert_eq!(worst_scenario.impact.severity, max);
    for s in suite.scenarios.iter().filter(|s| s.impact.severity == max) {
        assert!(worst_scenario.impact.operating_cash_flow <= s.impact.operating_cash_flow);
    }
}

#[test]
fn test_empty_library_yields_no_worst_case() {
    let p = base_period();
    let m = compute_metrics(&p, None).unwrap();
    let suite = run_stress_suite(&p, &m, &[], &StressConfig::default()).unwrap();
    assert!(suite.scenarios.is_empty());
    assert_eq!(suite.worst_case, None);
}

#[test]
fn test_analyze_stress_with_custom_library_and_sweep() {
    let input = StressTestInput {
        base_period: base_period(),
        previous_period: None,
        scenarios: Some(vec![ScenarioDefinition {
            name: "Mild".into(),
            description: String::new(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(-2),
                cogs_change_pct: dec!(-2),
                ..ScenarioParameters::default()
            },
        }]),
        sensitivities: vec![SensitivityRequest {
            variable: SensitivityVariable::Dso,
            changes: vec![dec!(-10), Decimal::ZERO, dec!(10)],
            range: None,
        }],
    };
    let out = analyze_stress(&input, &StressConfig::default()).unwrap();
    let result = &out.result;

    assert_eq!(result.suite.scenarios.len(), 1);
    assert_eq!(result.suite.worst_case.as_deref(), Some("Mild"));
    assert_eq!(result.sensitivities.len(), 1);

    let points = &result.sensitivities[0].points;
    assert_eq!(points.len(), 3);
    assert!(points[0].cash_flow_impact > Decimal::ZERO);
    assert_eq!(points[1].cash_flow_impact, Decimal::ZERO);
    assert!(points[2].cash_flow_impact < Decimal::ZERO);
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_stress_input_deserializes_with_defaults() {
    let json = r#"{
        "base_period": {
            "label": "FY2023",
            "revenue": "4100000",
            "gross_profit": "1050000",
            "operating_profit": "480000",
            "net_profit": "280000",
            "depreciation_amortization": "100000",
            "cash": "350000",
            "accounts_receivable": "900000",
            "inventory": "560000",
            "total_current_assets": "1850000",
            "accounts_payable": "460000",
            "total_current_liabilities": "1150000"
        }
    }"#;
    let input: StressTestInput = serde_json::from_str(json).unwrap();
    assert!(input.scenarios.is_none());
    assert!(input.sensitivities.is_empty());

    let out = analyze_stress(&input, &StressConfig::default()).unwrap();
    assert_eq!(out.result.suite.scenarios.len(), 5);
}

#[test]
fn test_invalid_scenario_surfaces_error() {
    let input = StressTestInput {
        base_period: base_period(),
        previous_period: None,
        scenarios: Some(vec![ScenarioDefinition {
            name: "Impossible".into(),
            description: String::new(),
            parameters: ScenarioParameters {
                revenue_change_pct: dec!(-150),
                ..ScenarioParameters::default()
            },
        }]),
        sensitivities: vec![],
    };
    let err = analyze_stress(&input, &StressConfig::default()).unwrap_err();
    match err {
        CashFlowError::InvalidScenarioParameters { scenario, .. } => {
            assert_eq!(scenario, "Impossible")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
