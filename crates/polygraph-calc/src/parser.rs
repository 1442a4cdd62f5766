//! Recursive-descent parser for the arithmetic allow-list.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := ("-" | "+") unary | power
//! power   := primary (("^" | "**") unary)?
//! primary := number | func "(" expr ")" | "(" expr ")"
//! func    := "sin" | "cos"
//! ```
//!
//! `power` is right associative and binds tighter than unary minus, so
//! `-2^2 = -4` and `2^-1 = 0.5`.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{
    alpha1, alphanumeric1, char as pchar, digit0, digit1, multispace0, one_of,
};
use nom::combinator::{all_consuming, cut, map_opt, map_res, opt, recognize, value};
use nom::error::{Error as NomError, ErrorKind};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

use crate::ast::{BinOp, Expr, Func, UnaryOp};
use crate::error::InvalidExpression;
use crate::normalize_minus;

/// Deepest nesting accepted, counted both as parser recursion (brackets,
/// calls, sign and power chains) and as height of the resulting tree.
pub const MAX_DEPTH: usize = 100;

/// Parse `input` into an [`Expr`].
///
/// Minus-sign variants are normalized first; surrounding whitespace is ignored.
pub fn parse_expression(input: &str) -> Result<Expr, InvalidExpression> {
    let normalized = normalize_minus(input);
    let source = normalized.trim();
    if source.is_empty() {
        return Err(InvalidExpression::Empty);
    }

    let result = all_consuming(|i| expr(i, 0))(source);
    match result {
        Ok((_, parsed)) => Ok(parsed),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
            Err(InvalidExpression::TooDeep { limit: MAX_DEPTH })
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(describe_failure(source, e.input)),
        Err(nom::Err::Incomplete(_)) => Err(InvalidExpression::UnexpectedEnd),
    }
}

/// Turn the remaining input at the failure point into a precise error.
fn describe_failure(source: &str, rest: &str) -> InvalidExpression {
    let rest = rest.trim_start();
    let offset = source.len() - rest.len();

    let Some(first) = rest.chars().next() else {
        return InvalidExpression::UnexpectedEnd;
    };

    if first.is_alphabetic() || first == '_' {
        let name: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if Func::from_name(&name).is_some() {
            return InvalidExpression::UnexpectedToken {
                found: name,
                offset,
            };
        }
        return InvalidExpression::UnknownIdentifier { name, offset };
    }

    InvalidExpression::UnexpectedChar {
        found: first,
        offset,
    }
}

fn too_deep(input: &str) -> nom::Err<NomError<&str>> {
    nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge))
}

/// One level further down, or a hard failure past [`MAX_DEPTH`].
fn descend(input: &str, depth: usize) -> Result<usize, nom::Err<NomError<&str>>> {
    if depth >= MAX_DEPTH {
        return Err(too_deep(input));
    }
    Ok(depth + 1)
}

/// Reject a freshly built node whose height exceeds [`MAX_DEPTH`].
fn bounded(input: &str, node: Expr) -> IResult<&str, Expr> {
    if node.depth() > MAX_DEPTH {
        return Err(too_deep(input));
    }
    Ok((input, node))
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Left fold that tracks the height as it goes, so long flat chains are
/// caught without re-walking the tree.
fn fold_left<'a>(input: &'a str, first: Expr, rest: Vec<(BinOp, Expr)>) -> IResult<&'a str, Expr> {
    let mut height = first.depth();
    let mut acc = first;
    for (op, rhs) in rest {
        height = height.max(rhs.depth()) + 1;
        if height > MAX_DEPTH {
            return Err(too_deep(input));
        }
        acc = Expr::binary(op, acc, rhs);
    }
    Ok((input, acc))
}

fn expr(input: &str, depth: usize) -> IResult<&str, Expr> {
    let depth = descend(input, depth)?;
    let (input, first) = term(input, depth)?;
    let (input, rest) = many0(pair(ws(additive_op), cut(|i| term(i, depth))))(input)?;
    fold_left(input, first, rest)
}

fn additive_op(input: &str) -> IResult<&str, BinOp> {
    alt((value(BinOp::Add, pchar('+')), value(BinOp::Sub, pchar('-'))))(input)
}

fn term(input: &str, depth: usize) -> IResult<&str, Expr> {
    let (input, first) = unary(input, depth)?;
    let (input, rest) = many0(pair(ws(multiplicative_op), cut(|i| unary(i, depth))))(input)?;
    fold_left(input, first, rest)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinOp> {
    alt((value(BinOp::Mul, pchar('*')), value(BinOp::Div, pchar('/'))))(input)
}

fn sign(input: &str) -> IResult<&str, UnaryOp> {
    alt((value(UnaryOp::Neg, pchar('-')), value(UnaryOp::Pos, pchar('+'))))(input)
}

fn unary(input: &str, depth: usize) -> IResult<&str, Expr> {
    match opt(ws(sign))(input)? {
        (rest, Some(op)) => {
            let depth = descend(input, depth)?;
            let (rest, operand) = cut(|i| unary(i, depth))(rest)?;
            bounded(rest, Expr::unary(op, operand))
        }
        (_, None) => power(input, depth),
    }
}

fn power(input: &str, depth: usize) -> IResult<&str, Expr> {
    let (input, base) = primary(input, depth)?;
    let (rest, caret) = opt(ws(alt((tag("**"), tag("^")))))(input)?;
    if caret.is_none() {
        return Ok((input, base));
    }
    let depth = descend(input, depth)?;
    let (rest, exponent) = cut(|i| unary(i, depth))(rest)?;
    bounded(rest, Expr::binary(BinOp::Pow, base, exponent))
}

fn primary(input: &str, depth: usize) -> IResult<&str, Expr> {
    ws(alt((number, |i| call(i, depth), |i| parenthesized(i, depth))))(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    let mantissa = alt((
        recognize(pair(digit1, opt(pair(pchar('.'), digit0)))),
        recognize(pair(pchar('.'), digit1)),
    ));
    let exponent = opt(tuple((one_of("eE"), opt(one_of("+-")), digit1)));
    map_res(recognize(pair(mantissa, exponent)), |text: &str| {
        text.parse::<f64>().map(Expr::Number)
    })(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn call(input: &str, depth: usize) -> IResult<&str, Expr> {
    let (input, func) = map_opt(identifier, Func::from_name)(input)?;
    let (input, arg) = cut(delimited(ws(pchar('(')), |i| expr(i, depth), pchar(')')))(input)?;
    bounded(input, Expr::call(func, arg))
}

fn parenthesized(input: &str, depth: usize) -> IResult<&str, Expr> {
    preceded(pchar('('), cut(terminated(|i| expr(i, depth), pchar(')'))))(input)
}
