use serde_json::Value;

use super::format_scalar;

/// Headline figure of each command, in priority order.
const PRIORITY_KEYS: [&str; 5] = [
    "sharpe_ratio",
    "total_return_pct",
    "volatility",
    "expected_return",
    "skipped",
];

/// Print just the headline value from the result envelope.
///
/// Falls back to the first scalar field when none of the known keys exist.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return format_scalar(val);
            }
        }
        if let Some((key, val)) = map.iter().find(|(_, v)| !v.is_array() && !v.is_object()) {
            return format!("{}: {}", key, format_scalar(val));
        }
    }

    format_scalar(result_obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_sharpe() {
        let v = json!({"result": {"volatility": "0.2", "sharpe_ratio": "1.5"}});
        assert_eq!(minimal_line(&v), "1.5");
    }

    #[test]
    fn test_falls_back_to_first_scalar() {
        let v = json!({"result": {"points": [], "count": 3}});
        assert_eq!(minimal_line(&v), "count: 3");
    }
}
