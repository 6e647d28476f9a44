//! Function sampler for plotting. Screens the expression against a
//! deny-list, parses it once, then evaluates it with `x` bound at 301
//! evenly spaced points across [-10, 10]. A failed point records `None`;
//! a single bad point never fails the plot.

use crate::error::{KalcError, KalcResult};
use crate::eval::Evaluator;
use crate::normalize::{normalize, strip_plot_label};
use crate::parser::parse_expression;
use crate::types::AngleUnit;
use crate::value::{EvalOutcome, GraphSeries};

/// 300 equal steps, endpoints included.
pub const SAMPLE_POINTS: usize = 301;
const X_MIN: f64 = -10.0;
const X_MAX: f64 = 10.0;
/// Points with |y| beyond this are capped to `None` so one asymptote
/// doesn't flatten the rest of the plot.
const Y_LIMIT: f64 = 1e6;

/// Tokens that abort sampling before any evaluation is attempted. Checked
/// as substrings of the lowercased expression.
const FORBIDDEN: &[&str] = &[
    "import", "exec", "eval", "open", "file", "input", "raw_input", "__", "lambda", "def",
    "class", "for", "while", "if", "else", "try", "except", "with", "assert", "del", "global",
    "nonlocal",
];

/// Reject expressions containing any deny-listed token.
pub fn screen_expression(expr: &str) -> KalcResult<()> {
    let lower = expr.to_lowercase();
    for pat in FORBIDDEN {
        if lower.contains(pat) {
            return Err(KalcError::ForbiddenToken((*pat).to_string()));
        }
    }
    Ok(())
}

/// Sample a single-variable function across [-10, 10]. The optional
/// `f(x)=` label is stripped before use. The returned x and y series are
/// positionally aligned and always have equal length.
pub fn sample(expression: &str) -> KalcResult<GraphSeries> {
    let cleaned = strip_plot_label(expression);
    if cleaned.is_empty() {
        return Err(KalcError::InvalidInput("please enter a function".into()));
    }
    screen_expression(cleaned)?;

    // Parse once up front; `x` is a bound variable in the namespace, so
    // function names containing the letter x (exp, ...) are untouched.
    let expr = parse_expression(&normalize(cleaned))?;
    let evaluator = Evaluator::new(AngleUnit::Radians);

    let steps = (SAMPLE_POINTS - 1) as f64;
    let mut x_values = Vec::with_capacity(SAMPLE_POINTS);
    let mut y_values = Vec::with_capacity(SAMPLE_POINTS);

    for i in 0..SAMPLE_POINTS {
        let x = X_MIN + (i as f64 / steps) * (X_MAX - X_MIN);
        x_values.push(x);
        let y = match evaluator.eval_with_var(&expr, "x", x) {
            Ok(EvalOutcome::Finite(v)) if v.abs() <= Y_LIMIT => Some(v),
            _ => None,
        };
        y_values.push(y);
    }

    Ok(GraphSeries {
        x_values,
        y_values,
        expression: cleaned.to_string(),
    })
}
