use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Non-finite sentinels
// ---------------------------------------------------------------------------

/// Non-finite evaluation outcomes. These are valid data, not errors, and
/// pass through formatting unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Infinity,
    NegInfinity,
    NaN,
}

impl Sentinel {
    pub fn from_f64(v: f64) -> Option<Self> {
        if v == f64::INFINITY {
            Some(Self::Infinity)
        } else if v == f64::NEG_INFINITY {
            Some(Self::NegInfinity)
        } else if v.is_nan() {
            Some(Self::NaN)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infinity => "Infinity",
            Self::NegInfinity => "-Infinity",
            Self::NaN => "NaN",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Evaluation outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalOutcome {
    Finite(f64),
    Sentinel(Sentinel),
}

impl EvalOutcome {
    /// Classify a raw float: infinities and NaN become sentinels.
    pub fn classify(v: f64) -> Self {
        match Sentinel::from_f64(v) {
            Some(s) => Self::Sentinel(s),
            None => Self::Finite(v),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph payload
// ---------------------------------------------------------------------------

/// Coordinate series produced by the function sampler. The two series are
/// positionally aligned and always have equal length; unevaluable points
/// are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSeries {
    pub x_values: Vec<f64>,
    pub y_values: Vec<Option<f64>>,
    pub expression: String,
}

// ---------------------------------------------------------------------------
// Calculation value
// ---------------------------------------------------------------------------

/// Any value a calculation can produce, prior to display formatting.
#[derive(Debug, Clone)]
pub enum CalcValue {
    Number(f64),
    Sentinel(Sentinel),
    /// Flat sequence of scalar leaves (eigenvalues may mix real numbers
    /// with complex-valued display strings).
    Vector(Vec<CalcValue>),
    Matrix(Vec<Vec<f64>>),
    Graph(GraphSeries),
    Text(String),
}

impl From<EvalOutcome> for CalcValue {
    fn from(outcome: EvalOutcome) -> Self {
        match outcome {
            EvalOutcome::Finite(v) => Self::Number(v),
            EvalOutcome::Sentinel(s) => Self::Sentinel(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_classification() {
        assert_eq!(Sentinel::from_f64(f64::INFINITY), Some(Sentinel::Infinity));
        assert_eq!(
            Sentinel::from_f64(f64::NEG_INFINITY),
            Some(Sentinel::NegInfinity)
        );
        assert_eq!(Sentinel::from_f64(f64::NAN), Some(Sentinel::NaN));
        assert_eq!(Sentinel::from_f64(1.5), None);
    }

    #[test]
    fn test_outcome_classify() {
        assert_eq!(EvalOutcome::classify(2.0), EvalOutcome::Finite(2.0));
        assert_eq!(
            EvalOutcome::classify(f64::INFINITY),
            EvalOutcome::Sentinel(Sentinel::Infinity)
        );
    }

    #[test]
    fn test_sentinel_strings() {
        assert_eq!(Sentinel::Infinity.to_string(), "Infinity");
        assert_eq!(Sentinel::NegInfinity.to_string(), "-Infinity");
        assert_eq!(Sentinel::NaN.to_string(), "NaN");
    }
}
