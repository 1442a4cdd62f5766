use thiserror::Error;

/// Why an expression was rejected or could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidExpression {
    #[error("empty expression")]
    Empty,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected token `{found}` at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("identifier `{name}` at offset {offset} is not allowed (only sin and cos)")]
    UnknownIdentifier { name: String, offset: usize },

    #[error("expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error: {0}")]
    Domain(String),
}

/// Coarse classification of [`InvalidExpression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidExpressionKind {
    /// Text does not match the arithmetic grammar.
    Syntax,
    /// An identifier outside the `sin`/`cos` allow-list.
    DisallowedIdentifier,
    DivisionByZero,
    /// NaN, infinite or complex intermediate result.
    Domain,
}

impl InvalidExpression {
    pub fn kind(&self) -> InvalidExpressionKind {
        match self {
            InvalidExpression::Empty
            | InvalidExpression::UnexpectedEnd
            | InvalidExpression::UnexpectedChar { .. }
            | InvalidExpression::UnexpectedToken { .. }
            | InvalidExpression::TooDeep { .. } => InvalidExpressionKind::Syntax,
            InvalidExpression::UnknownIdentifier { .. } => {
                InvalidExpressionKind::DisallowedIdentifier
            }
            InvalidExpression::DivisionByZero => InvalidExpressionKind::DivisionByZero,
            InvalidExpression::Domain(_) => InvalidExpressionKind::Domain,
        }
    }
}
