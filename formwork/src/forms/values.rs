//! Loose conversions between client-supplied JSON and the strings, numbers
//! and booleans the form model stores.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Lowercases and collapses every whitespace run into a single `_`.
pub fn slugify(label: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&label.to_lowercase(), "_")
        .into_owned()
}

pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Truthiness as browsers' scripts see it: `null`, `false`, `0`, `NaN` and
/// `""` are false, everything else (including `"false"`, `[]` and `{}`) is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Non-empty string or number, as text. Used for ids, labels and keys.
pub fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stringifies a submitted value: strings verbatim, numbers in shortest
/// form, booleans as `true`/`false`, anything else as its JSON text.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Numeric reading of a submitted value. Numbers pass through, strings are
/// trimmed and parsed (blank reads as zero), booleans are 1 or 0.
pub fn to_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// JSON form of a coerced number; integral values become JSON integers.
pub fn number_value(number: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_collapses_whitespace() {
        assert_eq!(slugify("First Name"), "first_name");
        assert_eq!(slugify("Date  of\tBirth"), "date_of_birth");
        assert_eq!(slugify("Name"), "name");
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!("false")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!({})));
        assert!(truthy(&json!(-1.5)));
    }

    #[test]
    fn numbers_from_submissions() {
        assert_eq!(to_number(&json!("17")), Some(17.0));
        assert_eq!(to_number(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(to_number(&json!(true)), Some(1.0));
        assert_eq!(to_number(&json!("abc")), None);
        assert_eq!(to_number(&json!("inf")), None);
        assert_eq!(to_number(&json!([1])), None);
        assert_eq!(number_value(17.0), json!(17));
        assert_eq!(number_value(2.5), json!(2.5));
    }

    #[test]
    fn display_text_of_scalars() {
        assert_eq!(display_text(&json!("  padded ")), "  padded ");
        assert_eq!(display_text(&json!(42)), "42");
        assert_eq!(display_text(&json!(false)), "false");
    }
}
