use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format_scalar;

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go into a Field/Value table; each array of objects
/// (allocations, frontier, performance) gets a table of its own.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_result_tables(result, map),
            _ => println!("{}", field_table(map)),
        },
        Value::Array(arr) => println!("{}", array_table(arr)),
        _ => println!("{}", value),
    }
}

fn print_result_tables(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    println!("{}", field_table(result));

    for (key, val) in result {
        if let Value::Array(rows) = val {
            if rows.first().is_some_and(Value::is_object) {
                println!("\n{}:", key);
                println!("{}", array_table(rows));
            }
        }
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

fn field_table(map: &Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        let rendered = match val {
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => continue,
            Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
            _ => format_scalar(val),
        };
        builder.push_record([key.clone(), rendered]);
    }
    builder.build()
}

fn array_table(arr: &[Value]) -> Table {
    let mut builder = Builder::default();
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        builder.push_record(headers.clone());
        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h).map(format_scalar).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
    } else {
        for item in arr {
            builder.push_record([format_scalar(item)]);
        }
    }
    builder.build()
}
