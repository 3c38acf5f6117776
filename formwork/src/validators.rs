use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use super::validation::ValidationError;

// ---------- shared helpers ----------

#[inline]
fn err(code: &'static str, msg: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code, msg)
}

// ---------- presence ----------

pub fn required() -> ValidationError {
    err("required", "is required")
}

// ---------- string validators ----------

/// Checks that a string is not empty or whitespace-only.
pub fn non_empty(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        Err(err("blank", "may not be blank"))
    } else {
        Ok(())
    }
}

/// Validates minimum character count (Unicode-aware).
pub fn min_chars(n: usize) -> impl Fn(&str) -> Result<(), ValidationError> {
    move |s| {
        if s.chars().count() < n {
            Err(err("min_chars", format!("must be at least {n} characters")))
        } else {
            Ok(())
        }
    }
}

/// Validates maximum character count (Unicode-aware).
pub fn max_chars(n: usize) -> impl Fn(&str) -> Result<(), ValidationError> {
    move |s| {
        if s.chars().count() > n {
            Err(err("max_chars", format!("must be at most {n} characters")))
        } else {
            Ok(())
        }
    }
}

/// Unanchored search, so `pattern` must match somewhere in the value.
pub fn pattern(re: &Regex) -> impl Fn(&str) -> Result<(), ValidationError> + '_ {
    move |s| {
        if re.is_match(s) {
            Ok(())
        } else {
            Err(err("invalid", "has an invalid format"))
        }
    }
}

/// RFC-ish, pragmatic email
pub fn email(s: &str) -> Result<(), ValidationError> {
    static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9-]+(\.[a-z0-9-]+)+$")
            .expect("valid email regex")
    });

    if EMAIL_RE.is_match(s) {
        Ok(())
    } else {
        Err(err("email", "must be a valid email address"))
    }
}

// ---------- numeric validators ----------

pub fn min<T>(min: T) -> impl Fn(&T) -> Result<(), ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    move |v| {
        if *v < min {
            Err(err("min_value", format!("must be at least {min}")))
        } else {
            Ok(())
        }
    }
}

pub fn max<T>(max: T) -> impl Fn(&T) -> Result<(), ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    move |v| {
        if *v > max {
            Err(err("max_value", format!("must be at most {max}")))
        } else {
            Ok(())
        }
    }
}

// ---------- shape ----------

pub fn not_a_number() -> ValidationError {
    err("number", "must be a number")
}

pub fn not_a_table() -> ValidationError {
    err("table", "must be a table")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let err = required();
        assert_eq!(err.code, "required");
        assert_eq!(err.render("Name"), "Name is required");
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty("a").is_ok());
        assert!(non_empty("").is_err());
        assert!(non_empty("   ").is_err());
    }

    #[test]
    fn test_min_max_chars() {
        let min3 = min_chars(3);
        assert!(min3("世界").is_err()); // 2 chars
        assert!(min3("世界!").is_ok()); // 3 chars

        let max5 = max_chars(5);
        assert!(max5("Hello, 世界").is_err()); // 9 chars
        assert!(max5("世界").is_ok()); // 2 chars

        assert_eq!(
            min_chars(3)("ab").unwrap_err().render("Name"),
            "Name must be at least 3 characters"
        );
    }

    #[test]
    fn test_email_and_pattern() {
        assert!(email("user@example.com").is_ok());
        assert!(email("not-an-email").is_err());

        let digits = Regex::new(r"\d+").expect("regex");
        let has_digits = pattern(&digits);
        assert!(has_digits("abc123").is_ok());
        assert!(has_digits("abc").is_err());
    }

    #[test]
    fn test_min_max() {
        let min5 = min(5);
        assert!(min5(&3).is_err());
        assert!(min5(&5).is_ok());

        let max10 = max(10.0);
        assert!(max10(&10.5).is_err());
        assert!(max10(&10.0).is_ok());

        assert_eq!(min(18.0)(&17.0).unwrap_err().message, "must be at least 18");
    }
}
