//! Evaluation of parsed expressions and the equality check used for verdicts.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::InvalidExpression;
use crate::normalize_minus;
use crate::parser::parse_expression;

/// Tolerance used by [`check_equality`] when callers have no better value.
pub const DEFAULT_EPSILON: f64 = 1e-6;

impl Expr {
    /// Evaluate the tree. Pure: the same tree always yields the same result.
    pub fn eval(&self) -> Result<f64, InvalidExpression> {
        let result = match self {
            Expr::Number(n) => *n,
            Expr::Unary { op, operand } => {
                let v = operand.eval()?;
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Pos => v,
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval()?;
                let r = rhs.eval()?;
                apply_binary(*op, l, r)?
            }
            Expr::Call { func, arg } => func.apply_degrees(arg.eval()?),
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(InvalidExpression::Domain(format!(
                "`{self}` does not evaluate to a finite number"
            )))
        }
    }
}

fn apply_binary(op: BinOp, l: f64, r: f64) -> Result<f64, InvalidExpression> {
    match op {
        BinOp::Add => Ok(l + r),
        BinOp::Sub => Ok(l - r),
        BinOp::Mul => Ok(l * r),
        BinOp::Div => {
            if r == 0.0 {
                return Err(InvalidExpression::DivisionByZero);
            }
            Ok(l / r)
        }
        BinOp::Pow => {
            if l == 0.0 && r < 0.0 {
                return Err(InvalidExpression::DivisionByZero);
            }
            if l < 0.0 && r.fract() != 0.0 {
                return Err(InvalidExpression::Domain(format!(
                    "{l} ^ {r} has no real value"
                )));
            }
            Ok(l.powf(r))
        }
    }
}

/// Parse and evaluate `expression`.
pub fn evaluate(expression: &str) -> Result<f64, InvalidExpression> {
    parse_expression(expression)?.eval()
}

/// Decide an arithmetic claim.
///
/// With an `=`, the text is split once on the first `=` and both sides must
/// agree within `epsilon`. Without one, the expression asserts that its value
/// is non-zero: `"3"` is true, `"0"` is false.
///
/// Evaluation failures (grammar violations, division by zero, domain errors)
/// are returned as errors, never as `false`.
pub fn check_equality(expression: &str, epsilon: f64) -> Result<bool, InvalidExpression> {
    let normalized = normalize_minus(expression);
    match normalized.split_once('=') {
        Some((lhs, rhs)) => {
            let l = evaluate(lhs)?;
            let r = evaluate(rhs)?;
            Ok((l - r).abs() <= epsilon)
        }
        None => Ok(evaluate(&normalized)?.abs() > epsilon),
    }
}
