//! Calculation dispatch: one request in, one value out. Basic and
//! scientific expressions run normalize → parse → evaluate; graph requests
//! go through the function sampler; matrix requests bypass the evaluator
//! and call the linear-algebra collaborator directly.

use crate::error::{KalcError, KalcResult};
use crate::eval::Evaluator;
use crate::matrix::{self, MatrixOp};
use crate::normalize::normalize;
use crate::parser::parse_expression;
use crate::sampler;
use crate::types::{CalcKind, Preferences};
use crate::value::CalcValue;

#[derive(Debug, Clone)]
pub struct CalcRequest {
    pub expression: String,
    pub kind: CalcKind,
    pub action: String,
    pub matrix_data: Option<Vec<Vec<f64>>>,
}

/// Run one calculation against the owner's preferences. Synchronous, no
/// shared mutable state.
pub fn calculate(req: &CalcRequest, prefs: &Preferences) -> KalcResult<CalcValue> {
    match req.kind {
        CalcKind::Matrix => {
            let op: MatrixOp = req
                .action
                .parse()
                .map_err(KalcError::InvalidInput)?;
            let rows = req.matrix_data.clone().unwrap_or_else(identity3);
            matrix::apply(op, &rows)
        }
        CalcKind::Graph => {
            if req.action == "plot" {
                Ok(CalcValue::Graph(sampler::sample(&req.expression)?))
            } else {
                Ok(CalcValue::Text(format!(
                    "graph action '{}' completed",
                    req.action
                )))
            }
        }
        CalcKind::Basic | CalcKind::Scientific => {
            let normalized = normalize(&req.expression);
            let expr = parse_expression(&normalized)?;
            let outcome = Evaluator::new(prefs.angle_unit).eval(&expr)?;
            Ok(outcome.into())
        }
    }
}

/// Default grid when a matrix request carries no data.
fn identity3() -> Vec<Vec<f64>> {
    vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AngleUnit;
    use crate::value::{EvalOutcome, Sentinel};

    fn basic(expression: &str) -> CalcRequest {
        CalcRequest {
            expression: expression.into(),
            kind: CalcKind::Basic,
            action: "calculate".into(),
            matrix_data: None,
        }
    }

    #[test]
    fn test_basic_pipeline() {
        let prefs = Preferences::default();
        let value = calculate(&basic("1 + 2×3"), &prefs).unwrap();
        assert!(matches!(value, CalcValue::Number(v) if v == 7.0));
    }

    #[test]
    fn test_empty_expression_short_circuits_to_zero() {
        let prefs = Preferences::default();
        let value = calculate(&basic("   "), &prefs).unwrap();
        assert!(matches!(value, CalcValue::Number(v) if v == 0.0));
    }

    #[test]
    fn test_scientific_honors_angle_unit() {
        let prefs = Preferences {
            angle_unit: AngleUnit::Degrees,
            ..Preferences::default()
        };
        let req = CalcRequest {
            kind: CalcKind::Scientific,
            ..basic("sin(90)")
        };
        let CalcValue::Number(v) = calculate(&req, &prefs).unwrap() else {
            panic!("expected number");
        };
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_defaults_to_identity() {
        let prefs = Preferences::default();
        let req = CalcRequest {
            expression: String::new(),
            kind: CalcKind::Matrix,
            action: "det".into(),
            matrix_data: None,
        };
        let CalcValue::Number(det) = calculate(&req, &prefs).unwrap() else {
            panic!("expected number");
        };
        assert!((det - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_matrix_action() {
        let prefs = Preferences::default();
        let req = CalcRequest {
            expression: String::new(),
            kind: CalcKind::Matrix,
            action: "pseudoinverse".into(),
            matrix_data: None,
        };
        assert!(matches!(
            calculate(&req, &prefs),
            Err(KalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_graph_plot_action() {
        let prefs = Preferences::default();
        let req = CalcRequest {
            expression: "f(x)=x^2".into(),
            kind: CalcKind::Graph,
            action: "plot".into(),
            matrix_data: None,
        };
        let CalcValue::Graph(series) = calculate(&req, &prefs).unwrap() else {
            panic!("expected graph");
        };
        assert_eq!(series.expression, "x^2");
    }

    #[test]
    fn test_graph_other_action_acknowledged() {
        let prefs = Preferences::default();
        let req = CalcRequest {
            expression: "x".into(),
            kind: CalcKind::Graph,
            action: "trace".into(),
            matrix_data: None,
        };
        assert!(matches!(
            calculate(&req, &prefs).unwrap(),
            CalcValue::Text(_)
        ));
    }

    #[test]
    fn test_sentinel_flows_through() {
        let prefs = Preferences::default();
        let value = calculate(&basic("exp(1000)"), &prefs).unwrap();
        assert!(matches!(value, CalcValue::Sentinel(Sentinel::Infinity)));
    }

    #[test]
    fn test_outcome_conversion() {
        let v: CalcValue = EvalOutcome::Finite(1.5).into();
        assert!(matches!(v, CalcValue::Number(n) if n == 1.5));
    }
}
