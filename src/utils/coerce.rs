//! Coercion helpers for loosely-typed feed values
//!
//! Card-network exports arrive as strings with inconsistent casing and
//! spotty numeric hygiene. Every coercion here is total: bad input
//! degrades to a type-appropriate default instead of failing the row.

use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Accepted truthy spellings for flag-like fields, case-insensitive
const TRUTHY: [&str; 5] = ["TRUE", "T", "1", "Y", "YES"];

/// Coerce a loosely-typed flag value to a strict boolean
///
/// Unknown or missing values are false.
pub fn truthy(value: &str) -> bool {
    TRUTHY.contains(&value.trim().to_uppercase().as_str())
}

/// Coerce a string to a monetary amount; non-numeric input becomes zero
pub fn to_amount(value: &str) -> BigDecimal {
    BigDecimal::from_str(value.trim()).unwrap_or_else(|_| BigDecimal::from(0))
}

/// Coerce a string to a float; non-numeric input becomes zero
pub fn to_number(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}
