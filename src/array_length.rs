use crate::ast::LengthExpr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("array length `{0}` is not a non-negative integer literal")]
pub struct ArrayLengthError(pub String);

/// Evaluates the length of a fixed array. Only integer literals are accepted;
/// constants and constant expressions are not folded.
pub fn evaluate(length: &LengthExpr) -> Result<u64, ArrayLengthError> {
    match length {
        LengthExpr::Literal(text) => {
            parse_int_literal(text).ok_or_else(|| ArrayLengthError(text.clone()))
        }
        LengthExpr::Named(_) | LengthExpr::Ellipsis | LengthExpr::Expression(_) => {
            Err(ArrayLengthError(length.text().to_string()))
        }
    }
}

// Go integer literal: decimal, 0x/0b/0o prefixed or legacy 0-prefixed octal,
// with single underscores allowed between digits and after a base prefix.
fn parse_int_literal(text: &str) -> Option<u64> {
    let lower = text.to_ascii_lowercase();

    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };

    let digits = if radix == 10 {
        digits
    } else {
        digits.strip_prefix('_').unwrap_or(digits)
    };

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__")
    {
        return None;
    }

    let digits = digits.replace('_', "");

    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    u64::from_str_radix(&digits, radix).ok()
}
