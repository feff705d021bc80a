//! Coercion of loosely typed remote values.
//!
//! The spreadsheet endpoint returns whatever the cells hold: numbers may
//! arrive as strings, booleans as `"TRUE"`, empty cells as `""` or `null`.
//! These functions map any JSON value onto the type a field expects and
//! never fail; unusable input becomes the type's default.

use serde_json::Value;

/// Coerces a value to text.
///
/// `null`, `false`, `0` and `""` become the empty string. Other scalars
/// are rendered as text, numbers in their shortest form; arrays and
/// objects are rendered as JSON.
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => String::new(),
            // Whole floats print without a fraction: 2.0 is "2".
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Coerces a value to a number.
///
/// Numeric strings are parsed after trimming; booleans count as `1`/`0`.
/// Anything else, including non-finite results, becomes `0`.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Coerces a value to a boolean.
///
/// Only literal `true` and the string `"true"` in any letter case are
/// true.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
