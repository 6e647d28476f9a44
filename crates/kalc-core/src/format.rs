//! Result formatter: converts calculation values into display form with
//! configurable decimal precision. Integral floats render without a
//! decimal point; fractional values render to `decimal_places` digits with
//! trailing zeros stripped. Sentinels pass through unchanged.

use serde_json::{json, Value};

use crate::types::CalcKind;
use crate::value::{CalcValue, Sentinel};

/// Format a calculation value for the response body. Matrix results keep
/// their nesting (1-D stays flat, 2-D stays nested) with every scalar leaf
/// formatted independently; graph payloads pass through structurally.
pub fn format_result(value: &CalcValue, decimal_places: u32, kind: CalcKind) -> Value {
    match (kind, value) {
        (_, CalcValue::Sentinel(s)) => Value::String(s.as_str().into()),

        (CalcKind::Matrix, CalcValue::Vector(items)) => Value::Array(
            items
                .iter()
                .map(|item| format_result(item, decimal_places, kind))
                .collect(),
        ),
        (CalcKind::Matrix, CalcValue::Matrix(rows)) => Value::Array(
            rows.iter()
                .map(|row| {
                    Value::Array(
                        row.iter()
                            .map(|v| Value::String(format_number(*v, decimal_places)))
                            .collect(),
                    )
                })
                .collect(),
        ),

        (CalcKind::Graph, CalcValue::Graph(series)) => {
            json!({
                "type": "graph_data",
                "x_values": series.x_values,
                "y_values": series.y_values,
                "expression": series.expression,
                "success": true,
            })
        }

        (_, CalcValue::Number(n)) => Value::String(format_number(*n, decimal_places)),
        (_, CalcValue::Text(t)) => Value::String(t.clone()),

        // A structured value under a scalar kind cannot be coerced to a
        // number; fall back to its serialized representation.
        (_, other) => Value::String(fallback_string(other)),
    }
}

/// Format a single number. Sentinel floats keep their literal names;
/// integral values drop the decimal point entirely.
pub fn format_number(n: f64, decimal_places: u32) -> String {
    if let Some(s) = Sentinel::from_f64(n) {
        return s.as_str().to_string();
    }
    if n == n.trunc() {
        // 0.0 and -0.0 both render as "0"
        if n == 0.0 {
            return "0".to_string();
        }
        return format!("{n:.0}");
    }
    let formatted = format!("{n:.prec$}", prec = decimal_places as usize);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

fn fallback_string(value: &CalcValue) -> String {
    match value {
        CalcValue::Matrix(rows) => serde_json::to_string(rows).unwrap_or_default(),
        CalcValue::Vector(items) => {
            let parts: Vec<String> = items.iter().map(fallback_string).collect();
            format!("[{}]", parts.join(", "))
        }
        CalcValue::Number(n) => n.to_string(),
        CalcValue::Text(t) => t.clone(),
        CalcValue::Sentinel(s) => s.as_str().into(),
        CalcValue::Graph(series) => serde_json::to_string(series).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GraphSeries;

    #[test]
    fn test_integral_float_renders_bare() {
        assert_eq!(format_number(4.0, 10), "4");
        assert_eq!(format_number(-12.0, 10), "-12");
        assert_eq!(format_number(0.0, 10), "0");
        assert_eq!(format_number(-0.0, 10), "0");
    }

    #[test]
    fn test_trailing_zeros_stripped() {
        let third = format_number(1.0 / 3.0, 10);
        assert_eq!(third, "0.3333333333");
        assert_eq!(format_number(2.5, 10), "2.5");
        assert_eq!(format_number(0.25, 4), "0.25");
    }

    #[test]
    fn test_rounds_to_zero_cleanly() {
        // 1e-11 at 10 decimal places rounds to all zeros; no bare "0."
        assert_eq!(format_number(1e-11, 10), "0");
    }

    #[test]
    fn test_zero_decimal_places() {
        assert_eq!(format_number(2.7, 0), "3");
    }

    #[test]
    fn test_formatting_is_idempotent_on_integers() {
        let once = format_number(4.0, 10);
        let twice = format_number(once.parse().unwrap(), 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sentinel_passthrough() {
        let v = format_result(&CalcValue::Sentinel(Sentinel::Infinity), 10, CalcKind::Basic);
        assert_eq!(v, Value::String("Infinity".into()));
        assert_eq!(format_number(f64::NAN, 10), "NaN");
    }

    #[test]
    fn test_matrix_nesting_preserved() {
        let flat = CalcValue::Vector(vec![CalcValue::Number(1.0), CalcValue::Number(2.5)]);
        let v = format_result(&flat, 10, CalcKind::Matrix);
        assert_eq!(v, json!(["1", "2.5"]));

        let nested = CalcValue::Matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let v = format_result(&nested, 10, CalcKind::Matrix);
        assert_eq!(v, json!([["1", "0"], ["0", "1"]]));
    }

    #[test]
    fn test_graph_passthrough() {
        let series = CalcValue::Graph(GraphSeries {
            x_values: vec![0.0, 1.0],
            y_values: vec![Some(0.0), None],
            expression: "x^2".into(),
        });
        let v = format_result(&series, 10, CalcKind::Graph);
        assert_eq!(v["type"], "graph_data");
        assert_eq!(v["y_values"], json!([0.0, null]));
    }

    #[test]
    fn test_scalar_under_matrix_kind() {
        // det/trace/rank come back as plain numbers even in matrix mode
        let v = format_result(&CalcValue::Number(1.0), 10, CalcKind::Matrix);
        assert_eq!(v, Value::String("1".into()));
    }
}
