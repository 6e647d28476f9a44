//! Matrix operations, delegated to nalgebra. Shapes are validated here;
//! collaborator failures are rewrapped as `KalcError::Matrix` with a
//! descriptive message.

use nalgebra::DMatrix;
use serde_json::Value;
use std::fmt;

use crate::error::{KalcError, KalcResult};
use crate::value::CalcValue;

/// Tolerance shared by the singularity check and the rank computation.
const SINGULAR_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixOp {
    Determinant,
    Inverse,
    Rank,
    Transpose,
    Eigenvalues,
    Trace,
}

impl fmt::Display for MatrixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Determinant => write!(f, "det"),
            Self::Inverse => write!(f, "inv"),
            Self::Rank => write!(f, "rank"),
            Self::Transpose => write!(f, "transpose"),
            Self::Eigenvalues => write!(f, "eigenvalues"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for MatrixOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "det" => Ok(Self::Determinant),
            "inv" => Ok(Self::Inverse),
            "rank" => Ok(Self::Rank),
            "transpose" => Ok(Self::Transpose),
            "eigenvalues" => Ok(Self::Eigenvalues),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown matrix operation: {other}")),
        }
    }
}

/// Coerce raw JSON cells to floats: empty strings, nulls, and anything
/// non-numeric become 0, matching lenient grid input.
pub fn clean_matrix(raw: &[Vec<Value>]) -> Vec<Vec<f64>> {
    raw.iter()
        .map(|row| row.iter().map(cell_to_f64).collect())
        .collect()
}

fn cell_to_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Apply a matrix operation to rectangular row data.
pub fn apply(op: MatrixOp, rows: &[Vec<f64>]) -> KalcResult<CalcValue> {
    let m = build(rows)?;
    match op {
        MatrixOp::Determinant => {
            require_square(&m, "determinant")?;
            Ok(CalcValue::Number(m.determinant()))
        }
        MatrixOp::Inverse => {
            require_square(&m, "inverse")?;
            if m.determinant().abs() < SINGULAR_EPS {
                return Err(KalcError::Matrix(
                    "matrix is singular (non-invertible)".into(),
                ));
            }
            let inv = m.clone().try_inverse().ok_or_else(|| {
                KalcError::Matrix("matrix is singular (non-invertible)".into())
            })?;
            Ok(CalcValue::Matrix(to_rows(&inv)))
        }
        MatrixOp::Rank => Ok(CalcValue::Number(m.rank(SINGULAR_EPS) as f64)),
        MatrixOp::Transpose => Ok(CalcValue::Matrix(to_rows(&m.transpose()))),
        MatrixOp::Eigenvalues => {
            require_square(&m, "eigenvalue")?;
            let eigen = m.complex_eigenvalues();
            let items = eigen
                .iter()
                .map(|c| {
                    if c.im.abs() <= SINGULAR_EPS {
                        CalcValue::Number(c.re)
                    } else {
                        CalcValue::Text(format!("{:.6} + {:.6}i", c.re, c.im))
                    }
                })
                .collect();
            Ok(CalcValue::Vector(items))
        }
        MatrixOp::Trace => {
            require_square(&m, "trace")?;
            Ok(CalcValue::Number(m.trace()))
        }
    }
}

fn build(rows: &[Vec<f64>]) -> KalcResult<DMatrix<f64>> {
    if rows.is_empty() || rows[0].is_empty() {
        return Err(KalcError::Matrix("matrix cannot be empty".into()));
    }
    let cols = rows[0].len();
    if rows.iter().any(|r| r.len() != cols) {
        return Err(KalcError::Matrix(
            "matrix rows must all have the same length".into(),
        ));
    }
    let data: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(rows.len(), cols, &data))
}

fn require_square(m: &DMatrix<f64>, what: &str) -> KalcResult<()> {
    if m.nrows() == m.ncols() {
        Ok(())
    } else {
        Err(KalcError::Matrix(format!(
            "matrix must be square for {what} calculation"
        )))
    }
}

fn to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity3() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]
    }

    fn number(value: &CalcValue) -> f64 {
        match value {
            CalcValue::Number(n) => *n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn test_determinant_of_identity() {
        let det = apply(MatrixOp::Determinant, &identity3()).unwrap();
        assert!((number(&det) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_determinant_2x2() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let det = apply(MatrixOp::Determinant, &rows).unwrap();
        assert!((number(&det) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let rows = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = apply(MatrixOp::Inverse, &rows).unwrap();
        let CalcValue::Matrix(inv_rows) = inv else {
            panic!("expected matrix");
        };
        assert!((inv_rows[0][0] - 0.6).abs() < 1e-12);
        assert!((inv_rows[0][1] + 0.7).abs() < 1e-12);
        assert!((inv_rows[1][0] + 0.2).abs() < 1e-12);
        assert!((inv_rows[1][1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix_fails() {
        let zeros = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let err = apply(MatrixOp::Inverse, &zeros).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn test_non_square_rejected() {
        let rect = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        for op in [
            MatrixOp::Determinant,
            MatrixOp::Inverse,
            MatrixOp::Eigenvalues,
            MatrixOp::Trace,
        ] {
            let err = apply(op, &rect).unwrap_err();
            assert!(err.to_string().contains("must be square"), "{op} accepted");
        }
        // rank and transpose accept rectangles
        assert!(apply(MatrixOp::Rank, &rect).is_ok());
        assert!(apply(MatrixOp::Transpose, &rect).is_ok());
    }

    #[test]
    fn test_rank() {
        assert_eq!(number(&apply(MatrixOp::Rank, &identity3()).unwrap()), 3.0);
        let dependent = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(number(&apply(MatrixOp::Rank, &dependent).unwrap()), 1.0);
    }

    #[test]
    fn test_transpose() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let t = apply(MatrixOp::Transpose, &rows).unwrap();
        let CalcValue::Matrix(t_rows) = t else {
            panic!("expected matrix");
        };
        assert_eq!(t_rows, vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);
    }

    #[test]
    fn test_trace() {
        let rows = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        assert_eq!(number(&apply(MatrixOp::Trace, &rows).unwrap()), 5.0);
    }

    #[test]
    fn test_real_eigenvalues() {
        // diag(2, 5) has eigenvalues {2, 5}
        let rows = vec![vec![2.0, 0.0], vec![0.0, 5.0]];
        let CalcValue::Vector(items) = apply(MatrixOp::Eigenvalues, &rows).unwrap() else {
            panic!("expected vector");
        };
        let mut values: Vec<f64> = items.iter().map(number).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_complex_eigenvalues_formatted() {
        // 90-degree rotation has eigenvalues ±i
        let rows = vec![vec![0.0, -1.0], vec![1.0, 0.0]];
        let CalcValue::Vector(items) = apply(MatrixOp::Eigenvalues, &rows).unwrap() else {
            panic!("expected vector");
        };
        assert!(items.iter().all(|item| matches!(item, CalcValue::Text(_))));
        let CalcValue::Text(first) = &items[0] else {
            unreachable!()
        };
        assert!(first.ends_with('i'));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        assert!(apply(MatrixOp::Determinant, &[]).is_err());
        assert!(apply(MatrixOp::Determinant, &[vec![]]).is_err());
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(apply(MatrixOp::Determinant, &ragged).is_err());
    }

    #[test]
    fn test_clean_matrix_lenient_cells() {
        let raw = vec![vec![json!(1), json!(""), json!("2.5"), json!(null)]];
        assert_eq!(clean_matrix(&raw), vec![vec![1.0, 0.0, 2.5, 0.0]]);
    }
}
