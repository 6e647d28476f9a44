//! Restricted evaluator. Executes an expression tree against a closed
//! allow-list of functions and constants — the allow-list is the complete
//! security boundary; no other identifier or call target is reachable.
//!
//! Every failure (unknown identifier, wrong arity, division by zero,
//! domain error) surfaces as a uniform `KalcError::Calculation` carrying
//! the underlying message. Division by zero is detected structurally, so
//! it is always an error and never leaks through as an infinity sentinel.

use crate::error::{KalcError, KalcResult};
use crate::parser::{BinOp, Expr, UnaryOp};
use crate::types::AngleUnit;
use crate::value::EvalOutcome;

pub struct Evaluator {
    angle_unit: AngleUnit,
}

impl Evaluator {
    pub fn new(angle_unit: AngleUnit) -> Self {
        Self { angle_unit }
    }

    /// Evaluate with no free variables.
    pub fn eval(&self, expr: &Expr) -> KalcResult<EvalOutcome> {
        let v = self.eval_node(expr, None)?;
        Ok(EvalOutcome::classify(v))
    }

    /// Evaluate with a single bound variable (the function sampler binds
    /// `x` here, per sample point).
    pub fn eval_with_var(&self, expr: &Expr, name: &str, value: f64) -> KalcResult<EvalOutcome> {
        let v = self.eval_node(expr, Some((name, value)))?;
        Ok(EvalOutcome::classify(v))
    }

    fn eval_node(&self, expr: &Expr, var: Option<(&str, f64)>) -> KalcResult<f64> {
        match expr {
            Expr::Num(v) => Ok(*v),
            Expr::Ident(name) => self.constant(name, var),
            Expr::Unary(UnaryOp::Neg, inner) => Ok(-self.eval_node(inner, var)?),
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval_node(lhs, var)?;
                let r = self.eval_node(rhs, var)?;
                self.binary(*op, l, r)
            }
            Expr::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_node(arg, var)?);
                }
                self.call(name, &values)
            }
        }
    }

    fn constant(&self, name: &str, var: Option<(&str, f64)>) -> KalcResult<f64> {
        if let Some((var_name, value)) = var {
            if name == var_name {
                return Ok(value);
            }
        }
        match name {
            "pi" => Ok(std::f64::consts::PI),
            "e" => Ok(std::f64::consts::E),
            "tau" => Ok(std::f64::consts::TAU),
            _ => Err(KalcError::Calculation(format!(
                "unknown identifier '{name}'"
            ))),
        }
    }

    fn binary(&self, op: BinOp, l: f64, r: f64) -> KalcResult<f64> {
        match op {
            BinOp::Add => Ok(l + r),
            BinOp::Sub => Ok(l - r),
            BinOp::Mul => Ok(l * r),
            BinOp::Div => {
                if r == 0.0 {
                    return Err(KalcError::Calculation("division by zero".into()));
                }
                Ok(l / r)
            }
            BinOp::FloorDiv => {
                if r == 0.0 {
                    return Err(KalcError::Calculation("floor division by zero".into()));
                }
                Ok((l / r).floor())
            }
            BinOp::Rem => {
                if r == 0.0 {
                    return Err(KalcError::Calculation("modulo by zero".into()));
                }
                // Remainder takes the divisor's sign
                Ok(l - r * (l / r).floor())
            }
            BinOp::Pow => {
                // 0^-n is division by zero in disguise; an error must
                // precede the infinity check.
                if l == 0.0 && r < 0.0 {
                    return Err(KalcError::Calculation(
                        "zero cannot be raised to a negative power".into(),
                    ));
                }
                Ok(l.powf(r))
            }
        }
    }

    fn call(&self, name: &str, args: &[f64]) -> KalcResult<f64> {
        // Variadic reductions first
        match name {
            "min" => return reduce(name, args, |a, b| a.min(b)),
            "max" => return reduce(name, args, |a, b| a.max(b)),
            "sum" => return reduce(name, args, |a, b| a + b),
            _ => {}
        }

        // round takes an optional digit count
        if name == "round" {
            return match args {
                [x] => Ok(x.round()),
                [x, digits] => {
                    let scale = 10f64.powi(*digits as i32);
                    Ok((x * scale).round() / scale)
                }
                _ => Err(arity_error(name)),
            };
        }

        let [x] = args else {
            return Err(arity_error(name));
        };
        let x = *x;

        match name {
            "sin" => Ok(self.to_radians(x).sin()),
            "cos" => Ok(self.to_radians(x).cos()),
            "tan" => Ok(self.to_radians(x).tan()),
            "asin" => {
                check_domain(x.abs() <= 1.0)?;
                Ok(self.from_radians(x.asin()))
            }
            "acos" => {
                check_domain(x.abs() <= 1.0)?;
                Ok(self.from_radians(x.acos()))
            }
            "atan" => Ok(self.from_radians(x.atan())),
            "sinh" => Ok(x.sinh()),
            "cosh" => Ok(x.cosh()),
            "tanh" => Ok(x.tanh()),
            "log" => {
                check_domain(x > 0.0)?;
                Ok(x.log10())
            }
            "ln" => {
                check_domain(x > 0.0)?;
                Ok(x.ln())
            }
            "sqrt" => {
                check_domain(x >= 0.0)?;
                Ok(x.sqrt())
            }
            "exp" => Ok(x.exp()),
            "abs" => Ok(x.abs()),
            "ceil" => Ok(x.ceil()),
            "floor" => Ok(x.floor()),
            "factorial" => factorial(x),
            "degrees" => Ok(x.to_degrees()),
            "radians" => Ok(x.to_radians()),
            _ => Err(KalcError::Calculation(format!("unknown function '{name}'"))),
        }
    }

    /// Forward trig argument conversion in degrees mode. Applied per call
    /// node, so nested-parenthesis arguments are handled correctly.
    fn to_radians(&self, x: f64) -> f64 {
        match self.angle_unit {
            AngleUnit::Radians => x,
            AngleUnit::Degrees => x.to_radians(),
        }
    }

    /// Inverse trig result conversion in degrees mode.
    fn from_radians(&self, x: f64) -> f64 {
        match self.angle_unit {
            AngleUnit::Radians => x,
            AngleUnit::Degrees => x.to_degrees(),
        }
    }
}

fn reduce(name: &str, args: &[f64], f: impl Fn(f64, f64) -> f64) -> KalcResult<f64> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| KalcError::Calculation(format!("{name}() requires at least one argument")))?;
    Ok(rest.iter().fold(*first, |acc, v| f(acc, *v)))
}

fn arity_error(name: &str) -> KalcError {
    KalcError::Calculation(format!("wrong number of arguments for {name}()"))
}

fn check_domain(ok: bool) -> KalcResult<()> {
    if ok {
        Ok(())
    } else {
        Err(KalcError::Calculation("math domain error".into()))
    }
}

fn factorial(x: f64) -> KalcResult<f64> {
    if x < 0.0 {
        return Err(KalcError::Calculation(
            "factorial() not defined for negative values".into(),
        ));
    }
    if x.fract() != 0.0 {
        return Err(KalcError::Calculation(
            "factorial() only accepts integral values".into(),
        ));
    }
    let n = x as u64;
    let mut acc = 1.0f64;
    for k in 2..=n {
        acc *= k as f64;
        if acc.is_infinite() {
            break;
        }
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::value::Sentinel;

    fn eval_rad(input: &str) -> KalcResult<EvalOutcome> {
        let expr = parse_expression(input)?;
        Evaluator::new(AngleUnit::Radians).eval(&expr)
    }

    fn eval_deg(input: &str) -> KalcResult<EvalOutcome> {
        let expr = parse_expression(input)?;
        Evaluator::new(AngleUnit::Degrees).eval(&expr)
    }

    fn finite(outcome: KalcResult<EvalOutcome>) -> f64 {
        match outcome.unwrap() {
            EvalOutcome::Finite(v) => v,
            other => panic!("expected finite value, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(finite(eval_rad("2+3*4")), 14.0);
        assert_eq!(finite(eval_rad("(2+3)*4")), 20.0);
        assert_eq!(finite(eval_rad("2^10")), 1024.0);
        assert_eq!(finite(eval_rad("-2^2")), -4.0);
        assert_eq!(finite(eval_rad("7//2")), 3.0);
        assert_eq!(finite(eval_rad("7%3")), 1.0);
    }

    #[test]
    fn test_constants() {
        assert!((finite(eval_rad("pi")) - std::f64::consts::PI).abs() < 1e-12);
        assert!((finite(eval_rad("tau")) - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert!((finite(eval_rad("2*e")) - 2.0 * std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_trig_radians() {
        assert!((finite(eval_rad("sin(pi/2)")) - 1.0).abs() < 1e-12);
        assert!((finite(eval_rad("cos(pi)")) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_trig_degrees() {
        assert!((finite(eval_deg("sin(90)")) - 1.0).abs() < 1e-12);
        assert!(finite(eval_deg("sin(180)")).abs() < 1e-12);
        assert!((finite(eval_deg("cos(60)")) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_trig_degrees() {
        assert!((finite(eval_deg("asin(1)")) - 90.0).abs() < 1e-9);
        assert!((finite(eval_deg("atan(1)")) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_degrees_nested_parens() {
        // The regex-based rewrite this replaced could not handle nested
        // parentheses in a trig argument.
        assert!((finite(eval_deg("sin((45+45))")) - 1.0).abs() < 1e-12);
        assert!((finite(eval_deg("sin((30*2)+(10+20))")) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero_is_error_not_sentinel() {
        let err = eval_rad("1/0").unwrap_err();
        assert!(matches!(err, KalcError::Calculation(_)));
        assert!(eval_rad("5%0").is_err());
        assert!(eval_rad("5//0").is_err());
    }

    #[test]
    fn test_zero_to_negative_power_is_error_not_sentinel() {
        let err = eval_rad("0^-1").unwrap_err();
        assert!(matches!(err, KalcError::Calculation(_)));
        assert!(eval_rad("0^-0.5").is_err());
        assert!(eval_rad("(2-2)**-2").is_err());
        // Zero to a non-negative power is still fine
        assert_eq!(finite(eval_rad("0^0")), 1.0);
        assert_eq!(finite(eval_rad("0^2")), 0.0);
    }

    #[test]
    fn test_infinity_sentinel() {
        assert_eq!(
            eval_rad("exp(1000)").unwrap(),
            EvalOutcome::Sentinel(Sentinel::Infinity)
        );
        assert_eq!(
            eval_rad("-exp(1000)").unwrap(),
            EvalOutcome::Sentinel(Sentinel::NegInfinity)
        );
    }

    #[test]
    fn test_domain_errors() {
        assert!(eval_rad("sqrt(-1)").is_err());
        assert!(eval_rad("ln(0)").is_err());
        assert!(eval_rad("log(-5)").is_err());
        assert!(eval_rad("asin(2)").is_err());
    }

    #[test]
    fn test_factorial() {
        assert_eq!(finite(eval_rad("factorial(5)")), 120.0);
        assert_eq!(finite(eval_rad("factorial(0)")), 1.0);
        assert!(eval_rad("factorial(-1)").is_err());
        assert!(eval_rad("factorial(2.5)").is_err());
    }

    #[test]
    fn test_reductions() {
        assert_eq!(finite(eval_rad("min(3, 1, 2)")), 1.0);
        assert_eq!(finite(eval_rad("max(3, 1, 2)")), 3.0);
        assert_eq!(finite(eval_rad("sum(1, 2, 3, 4)")), 10.0);
        assert!(eval_rad("min()").is_err());
    }

    #[test]
    fn test_round() {
        assert_eq!(finite(eval_rad("round(2.4)")), 2.0);
        assert_eq!(finite(eval_rad("round(2.567, 2)")), 2.57);
    }

    #[test]
    fn test_unknown_names() {
        assert!(eval_rad("frobnicate(1)").is_err());
        assert!(eval_rad("y + 1").is_err());
    }

    #[test]
    fn test_log_variants() {
        assert!((finite(eval_rad("log(100)")) - 2.0).abs() < 1e-12);
        assert!((finite(eval_rad("ln(e)")) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_variable_binding() {
        let expr = parse_expression("x^2 + 1").unwrap();
        let ev = Evaluator::new(AngleUnit::Radians);
        assert_eq!(finite(ev.eval_with_var(&expr, "x", 3.0)), 10.0);
        // Unbound, `x` is an unknown identifier
        assert!(ev.eval(&expr).is_err());
    }
}
