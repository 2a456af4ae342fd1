use serde_json::Value;

use super::format_scalar;

/// Print just the headline figure of a computation.
///
/// Looks for well-known result fields in priority order, descending into the
/// latest period of a series analysis, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let headline = result_obj
        .get("period_metrics")
        .and_then(Value::as_array)
        .and_then(|periods| periods.last())
        .unwrap_or(result_obj);

    let priority_keys = [
        "operating_cash_flow",
        "days_until_breach",
        "worst_case",
        "total_outstanding",
        "portfolio",
        "suite",
        "points",
    ];

    if let Value::Object(map) = headline {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(key, val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(key, val));
            return;
        }
    }

    println!("{}", format_minimal("", headline));
}

fn format_minimal(key: &str, value: &Value) -> String {
    if let Some(s) = format_scalar(value) {
        return s;
    }
    match (key, value) {
        ("portfolio", Value::Object(p)) => p
            .get("total_outstanding")
            .and_then(format_scalar)
            .unwrap_or_default(),
        ("suite", Value::Object(s)) => s
            .get("worst_case")
            .and_then(format_scalar)
            .unwrap_or_else(|| "none".to_string()),
        (_, Value::Null) => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
