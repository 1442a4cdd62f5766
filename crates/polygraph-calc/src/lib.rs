//! Polygraph calc: allow-listed arithmetic for math claims
//!
//! Math claims ("2 * 3 = 6", "sin(90) = 1") are untrusted text. This crate
//! parses them into a closed expression tree that can only contain:
//!
//! - numeric literals
//! - binary `+ - * / ^` (`**` is accepted as a spelling of `^`)
//! - unary `+ -`
//! - parenthesized sub-expressions
//! - the unary functions `sin` and `cos`, both in **degrees**
//!
//! Anything else (identifiers, strings, other calls) has no node kind and is
//! rejected at parse time. Nesting deeper than [`MAX_DEPTH`] is rejected too,
//! so hostile input fails the claim instead of exhausting the stack.
//!
//! ```text
//!   claim text ──► normalize_minus ──► parser ──► Expr ──► eval ──► f64
//!                                                            │
//!                         check_equality: lhs = rhs ◄────────┘
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;

pub use ast::{BinOp, Expr, Func, UnaryOp};
pub use error::{InvalidExpression, InvalidExpressionKind};
pub use eval::{check_equality, evaluate, DEFAULT_EPSILON};
pub use parser::{parse_expression, MAX_DEPTH};

/// Replace the Unicode minus sign (U+2212) and en dash (U+2013) with ASCII `-`.
pub fn normalize_minus(text: &str) -> String {
    text.replace(['\u{2212}', '\u{2013}'], "-")
}
