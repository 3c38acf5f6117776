use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::values::{number_value, to_number};

/// The field types with dedicated handling. Anything else is [`FieldKind::Other`]
/// and passes through normalization and submission untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Checkbox,
    Radio,
    Droplist,
    Table,
    Other(String),
}

impl FieldKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "number" => FieldKind::Number,
            "checkbox" => FieldKind::Checkbox,
            "radio" => FieldKind::Radio,
            "droplist" => FieldKind::Droplist,
            "table" => FieldKind::Table,
            other => FieldKind::Other(other.to_string()),
        }
    }

    /// Whether fields of this kind carry an option list.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            FieldKind::Radio | FieldKind::Droplist | FieldKind::Checkbox
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>, disabled: bool) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            disabled,
        }
    }
}

/// Constraints attached to a field. Every rule is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Number>,
}

impl ValidationRules {
    /// Reads a client-supplied rules document one rule at a time. An
    /// ill-typed rule is dropped on its own and the rest are kept. Length
    /// and bound rules also accept numeric strings.
    pub fn from_document(doc: &Map<String, Value>) -> ValidationRules {
        let mut rules = ValidationRules::default();
        for (key, value) in doc {
            if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
                continue;
            }
            let accepted = match key.as_str() {
                "required" => value.as_bool().map(|b| rules.required = Some(b)).is_some(),
                "minLength" => length(value).map(|n| rules.min_length = Some(n)).is_some(),
                "maxLength" => length(value).map(|n| rules.max_length = Some(n)).is_some(),
                "pattern" => value.as_str().map(|s| rules.pattern = Some(s.to_string())).is_some(),
                "message" => value.as_str().map(|s| rules.message = Some(s.to_string())).is_some(),
                "min" => bound(value).map(|n| rules.min = Some(n)).is_some(),
                "max" => bound(value).map(|n| rules.max = Some(n)).is_some(),
                _ => true,
            };
            if !accepted {
                tracing::warn!(rule = %key, value = %value, "dropping ill-typed validation rule");
            }
        }
        rules
    }

    /// Rule-by-rule merge where `self` (the prior canonical rules) wins over
    /// `incoming`. `required` falls back to `required_flag`, so the result
    /// always carries an explicit `required`.
    pub fn merged_with(&self, incoming: &ValidationRules, required_flag: bool) -> ValidationRules {
        ValidationRules {
            required: Some(
                self.required
                    .or(incoming.required)
                    .unwrap_or(required_flag),
            ),
            min_length: self.min_length.or(incoming.min_length),
            max_length: self.max_length.or(incoming.max_length),
            pattern: self.pattern.clone().or_else(|| incoming.pattern.clone()),
            message: self.message.clone().or_else(|| incoming.message.clone()),
            min: self.min.clone().or_else(|| incoming.min.clone()),
            max: self.max.clone().or_else(|| incoming.max.clone()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.required == Some(true)
    }

    /// True when at least one rule is set to something other than
    /// "absent" or `required: false`.
    pub fn is_meaningful(&self) -> bool {
        self.is_required()
            || self.min_length.is_some()
            || self.max_length.is_some()
            || self.pattern.is_some()
            || self.message.is_some()
            || self.min.is_some()
            || self.max.is_some()
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) | Value::String(_) => to_number(value),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    let n = numeric(value)?;
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn bound(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        _ => match number_value(numeric(value)?) {
            Value::Number(n) => Some(n),
            _ => None,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub id: String,
    pub label: String,
    pub key: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub validation: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: String,
    /// Keyed by column key, in column order.
    pub values: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// A canonical, storage-ready form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(rename = "order")]
    pub index: usize,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub disabled: bool,
    pub class_name: Option<String>,
    pub options: Option<Vec<FieldOption>>,
    pub validation: Option<ValidationRules>,
    pub table_data: Option<TableSchema>,
}

impl Field {
    pub fn kind(&self) -> FieldKind {
        FieldKind::parse(&self.field_type)
    }
}
