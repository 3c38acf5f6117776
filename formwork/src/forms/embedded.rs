use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A document property that may arrive either as structured JSON or as a
/// JSON-encoded string (clients echo back what the store hands out).
///
/// It is resolved once, at the normalizer boundary, with [`decode_or_default`];
/// nothing past that point ever sees the ambiguous form.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Embedded {
    #[default]
    Absent,
    Encoded(String),
    Inline(Value),
}

impl Embedded {
    pub fn is_absent(&self) -> bool {
        matches!(self, Embedded::Absent)
    }

    /// Resolves to plain JSON. `Ok(None)` for absent properties and for an
    /// encoded literal `null`.
    pub fn to_value(&self) -> Result<Option<Value>, serde_json::Error> {
        match self {
            Embedded::Absent => Ok(None),
            Embedded::Encoded(text) => {
                serde_json::from_str::<Value>(text).map(|v| Some(v).filter(|v| !v.is_null()))
            }
            Embedded::Inline(value) => Ok(Some(value.clone())),
        }
    }

    /// Like [`Embedded::to_value`], but a malformed encoding is logged and
    /// treated as absent.
    pub fn decode(&self) -> Option<Value> {
        match self.to_value() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed embedded document");
                None
            }
        }
    }
}

impl From<Value> for Embedded {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Embedded::Absent,
            Value::String(text) => Embedded::Encoded(text),
            other => Embedded::Inline(other),
        }
    }
}

impl From<&Value> for Embedded {
    fn from(value: &Value) -> Self {
        Embedded::from(value.clone())
    }
}

impl<'de> Deserialize<'de> for Embedded {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Embedded::from)
    }
}

impl Serialize for Embedded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Embedded::Absent => serializer.serialize_none(),
            Embedded::Encoded(text) => serializer.serialize_str(text),
            Embedded::Inline(value) => value.serialize(serializer),
        }
    }
}

/// Decodes an embedded property into `T`.
///
/// Absent properties, undecodable strings and JSON of the wrong shape all
/// yield `default()`. Failures are logged, never returned.
pub fn decode_or_default<T, F>(raw: &Embedded, default: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let value = match raw.to_value() {
        Ok(Some(value)) => value,
        Ok(None) => return default(),
        Err(err) => {
            tracing::warn!(
                target_type = std::any::type_name::<T>(),
                error = %err,
                "embedded document is not valid JSON, using fallback"
            );
            return default();
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!(
                target_type = std::any::type_name::<T>(),
                error = %err,
                "embedded document has an unexpected shape, using fallback"
            );
            default()
        }
    }
}
