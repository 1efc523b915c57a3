//! Numeric field decoding for RPC responses.
//!
//! Chains disagree on how they encode counters. EVM nodes return `0x`-prefixed hex
//! quantities, Bitcoin returns JSON numbers, Aptos returns decimal strings. Every
//! decoder here accepts all three and reports anything else as a [`QuantityError`]
//! rather than guessing.

use serde_json::Value;
use thiserror::Error;

/// Failure to turn an RPC field into a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("invalid hex quantity: {0}")]
    InvalidHex(String),

    #[error("invalid decimal quantity: {0}")]
    InvalidDecimal(String),

    #[error("quantity out of range: {0}")]
    OutOfRange(String),

    #[error("expected a number or numeric string, got {0}")]
    UnexpectedType(&'static str),
}

/// Parses a `0x`-prefixed hex string to `u64`.
///
/// The prefix is required: `"1a"` is rejected so that decimal strings are never
/// silently reinterpreted as hex.
///
/// # Errors
///
/// Returns [`QuantityError::InvalidHex`] for a missing prefix, empty digits, or
/// non-hex characters, and [`QuantityError::OutOfRange`] on overflow.
pub fn parse_hex_u64(hex: &str) -> Result<u64, QuantityError> {
    let digits = hex_digits(hex)?;
    u64::from_str_radix(digits, 16).map_err(|_| QuantityError::OutOfRange(hex.to_string()))
}

/// Parses a `0x`-prefixed hex string to `u128`.
///
/// # Errors
///
/// Same conditions as [`parse_hex_u64`].
pub fn parse_hex_u128(hex: &str) -> Result<u128, QuantityError> {
    let digits = hex_digits(hex)?;
    u128::from_str_radix(digits, 16).map_err(|_| QuantityError::OutOfRange(hex.to_string()))
}

fn hex_digits(hex: &str) -> Result<&str, QuantityError> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .ok_or_else(|| QuantityError::InvalidHex(hex.to_string()))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QuantityError::InvalidHex(hex.to_string()));
    }
    Ok(digits)
}

/// Decodes a block height or similar counter.
///
/// # Errors
///
/// Returns a [`QuantityError`] for negative, fractional, non-numeric, or overflowing input.
pub fn quantity_u64(value: &Value) -> Result<u64, QuantityError> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            match n.as_f64() {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
                _ => Err(QuantityError::OutOfRange(n.to_string())),
            }
        }
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => parse_hex_u64(s),
        Value::String(s) => {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(QuantityError::InvalidDecimal(s.clone()));
            }
            s.parse::<u64>().map_err(|_| QuantityError::OutOfRange(s.clone()))
        }
        other => Err(QuantityError::UnexpectedType(json_type_name(other))),
    }
}

/// Decodes a difficulty value.
///
/// Hex input goes through `u128` because cumulative EVM difficulty exceeds `u64`.
///
/// # Errors
///
/// Returns a [`QuantityError`] for negative, non-finite, or non-numeric input.
pub fn quantity_f64(value: &Value) -> Result<f64, QuantityError> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => Ok(f),
            _ => Err(QuantityError::OutOfRange(n.to_string())),
        },
        #[allow(clippy::cast_precision_loss)]
        Value::String(s) if s.starts_with("0x") || s.starts_with("0X") => {
            parse_hex_u128(s).map(|v| v as f64)
        }
        Value::String(s) => match s.parse::<f64>() {
            Ok(f) if f.is_finite() && f >= 0.0 => Ok(f),
            _ => Err(QuantityError::InvalidDecimal(s.clone())),
        },
        other => Err(QuantityError::UnexpectedType(json_type_name(other))),
    }
}

/// Renders a version-like field as a label value.
///
/// Strings pass through, numbers are printed (Bitcoin reports `250000`), anything
/// else is treated as missing.
#[must_use]
pub fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
