//! Numeric helpers for double-precision evaluation
//!
//! Literals accepted by the tokenizer are an optional leading `-`, digits and
//! at most one decimal point, with at least one digit.

use crate::CalcError;

/// Parse a numeric literal token.
pub fn parse_literal(text: &str) -> Result<f64, CalcError> {
    let digits = text.strip_prefix('-').unwrap_or(text);

    let mut seen_point = false;
    let mut seen_digit = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return Err(CalcError::InvalidNumber(text.to_string())),
        }
    }
    if !seen_digit {
        return Err(CalcError::InvalidNumber(text.to_string()));
    }

    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CalcError::InvalidNumber(text.to_string()))
}

/// Map `-0.0` to `0.0`, leaving every other value untouched.
pub fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

/// Render a result for display.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_negative() { "-inf" } else { "inf" }.to_string()
    } else {
        format!("{}", value)
    }
}
