use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// A single failed check. The message is a predicate without a subject
/// ("must be at least 3 characters") so callers can prefix the field label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: Cow<'static, str>,
}

impl ValidationError {
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn render(&self, subject: &str) -> String {
        format!("{subject} {}", self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Per-key error messages, in the order they were found. Serializes as a
/// plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    errors: IndexMap<String, String>,
}

impl ValidationReport {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Records `err` for `key`, keeping the first message per key.
    pub fn add(&mut self, key: impl Into<String>, subject: &str, err: ValidationError) {
        self.errors
            .entry(key.into())
            .or_insert_with(|| err.render(subject));
    }

    /// Records the error of a failed check; returns whether the check passed.
    pub fn check(
        &mut self,
        key: impl Into<String>,
        subject: &str,
        result: Result<(), ValidationError>,
    ) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.add(key, subject, err);
                false
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Implemented by request payloads that check themselves before use.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationReport>;
}
