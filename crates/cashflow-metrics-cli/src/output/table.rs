use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format_scalar;

/// Render a computation as tables.
///
/// Scalars and metrics go into a Field/Value table. Nested blocks such as
/// `trend_analysis` or `portfolio` get their own table, and record lists
/// (periods, accounts, alerts, scenarios, sweep points) one row per record.
pub fn print_table(value: &Value) {
    let envelope = match value {
        Value::Object(map) => map,
        Value::Array(records) => return print_records(None, records),
        _ => {
            println!("{}", value);
            return;
        }
    };

    match envelope.get("result") {
        Some(Value::Object(result)) => print_section(None, result),
        Some(Value::Array(records)) => print_records(None, records),
        Some(other) => println!("{}", other),
        None => print_section(None, envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_section(title: Option<&str>, map: &Map<String, Value>) {
    let mut fields = Builder::default();
    fields.push_record(["Field", "Value"]);
    let mut nested: Vec<(&str, &Map<String, Value>)> = Vec::new();
    let mut lists: Vec<(&str, &Vec<Value>)> = Vec::new();

    for (key, val) in map {
        if let Some(text) = format_scalar(val) {
            fields.push_record([key.as_str(), text.as_str()]);
            continue;
        }
        match val {
            Value::Object(inner) => nested.push((key.as_str(), inner)),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                lists.push((key.as_str(), items))
            }
            Value::Array(items) => {
                let joined: Vec<String> = items.iter().map(cell).collect();
                fields.push_record([key.as_str(), joined.join("; ").as_str()]);
            }
            _ => fields.push_record([key.as_str(), "-"]),
        }
    }

    if let Some(title) = title {
        println!("\n{}:", title);
    }
    println!("{}", Table::from(fields));

    for (name, inner) in nested {
        print_section(Some(name), inner);
    }
    for (name, items) in lists {
        print_records(Some(name), items);
    }
}

fn print_records(title: Option<&str>, records: &[Value]) {
    if let Some(title) = title {
        println!("\n{}:", title);
    }
    let Some(Value::Object(first)) = records.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for map in records.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn cell(value: &Value) -> String {
    match format_scalar(value) {
        Some(s) => s,
        None if value.is_null() => "-".to_string(),
        None => serde_json::to_string(value).unwrap_or_default(),
    }
}
