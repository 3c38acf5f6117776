use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::embedded::{Embedded, decode_or_default};
use super::model::{Field, FieldKind, FieldOption, ValidationRules};
use super::table::process_table;
use super::values::{fresh_id, scalar_text, slugify, truthy};

/// A field description as an authoring client sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub options: Embedded,
    #[serde(default)]
    pub validation: Embedded,
    #[serde(default)]
    pub table_data: Embedded,
}

impl From<&Field> for RawField {
    fn from(field: &Field) -> Self {
        let inline = |value: serde_json::Result<Value>| {
            value.map(Embedded::from).unwrap_or_default()
        };
        Self {
            id: Some(field.id.clone()),
            field_type: Some(field.field_type.clone()),
            label: Some(field.label.clone()),
            description: field.description.clone(),
            placeholder: field.placeholder.clone(),
            required: Some(field.required),
            disabled: Some(field.disabled),
            class_name: field.class_name.clone(),
            options: inline(serde_json::to_value(&field.options)),
            validation: inline(serde_json::to_value(&field.validation)),
            table_data: inline(serde_json::to_value(&field.table_data)),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field at position {index} has no type")]
    MissingType { index: usize },
}

/// Normalizes a whole authoring batch. Each raw field is paired with the
/// prior stored field carrying the same id. The first malformed field fails
/// the batch.
pub fn normalize_all(raws: &[RawField], prior: &[Field]) -> Result<Vec<Field>, FieldError> {
    let mut seen = HashSet::new();
    raws.iter()
        .enumerate()
        .map(|(index, raw)| {
            let claimed = raw
                .id
                .as_deref()
                .filter(|id| !id.is_empty() && seen.insert(id.to_string()));
            let existing = claimed.and_then(|id| prior.iter().find(|field| field.id == id));
            let mut field = normalize(raw, existing, index)?;
            if claimed.is_none() && raw.id.as_deref().is_some_and(|id| !id.is_empty()) {
                tracing::warn!(duplicate = ?raw.id, index, "duplicate field id in batch, assigning a new one");
                field.id = fresh_id();
            }
            Ok(field)
        })
        .collect()
}

/// Produces the canonical record for one field.
///
/// `existing` is the previously stored version of the same field; its rules
/// and options take precedence over what the client sends, and it is the
/// fallback for any embedded document that cannot be decoded.
pub fn normalize(raw: &RawField, existing: Option<&Field>, index: usize) -> Result<Field, FieldError> {
    let field_type = raw
        .field_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(FieldError::MissingType { index })?
        .to_string();
    let kind = FieldKind::parse(&field_type);
    let label = raw.label.clone().unwrap_or_default();
    let disabled = raw.disabled.unwrap_or(false);

    let prior_rules = existing
        .and_then(|field| field.validation.clone())
        .unwrap_or_default();
    let incoming_rules = match raw.validation.decode() {
        Some(Value::Object(doc)) => ValidationRules::from_document(&doc),
        Some(other) => {
            tracing::warn!(index, document = %other, "validation is not an object, keeping prior rules");
            prior_rules.clone()
        }
        None => prior_rules.clone(),
    };
    let rules = prior_rules.merged_with(&incoming_rules, raw.required.unwrap_or(false));

    let options = match kind {
        FieldKind::Radio | FieldKind::Droplist => Some(choice_options(raw, existing)),
        FieldKind::Checkbox => Some(vec![FieldOption::new(
            non_empty(raw.label.clone()).unwrap_or_else(|| "Checkbox".to_string()),
            "true",
            disabled,
        )]),
        _ => None,
    };

    let table_data = (kind == FieldKind::Table).then(|| {
        let prior_table = || {
            existing
                .and_then(|field| field.table_data.as_ref())
                .and_then(|table| serde_json::to_value(table).ok())
                .unwrap_or(Value::Null)
        };
        let document: Value = decode_or_default(&raw.table_data, prior_table);
        process_table(&document)
    });

    let field = Field {
        id: non_empty(raw.id.clone())
            .or_else(|| existing.map(|field| field.id.clone()))
            .unwrap_or_else(fresh_id),
        index,
        field_type,
        label,
        description: non_empty(raw.description.clone()),
        placeholder: non_empty(raw.placeholder.clone()),
        required: rules.is_required(),
        disabled,
        class_name: non_empty(raw.class_name.clone()),
        options,
        validation: rules.is_meaningful().then_some(rules),
        table_data,
    };

    tracing::debug!(
        field_id = %field.id,
        field_type = %field.field_type,
        index,
        "normalized field"
    );
    Ok(field)
}

/// Radio and droplist choices: prior options, else the supplied ones, else
/// three placeholders. A selectable field never ends up without choices.
fn choice_options(raw: &RawField, existing: Option<&Field>) -> Vec<FieldOption> {
    if let Some(prior) = existing
        .and_then(|field| field.options.as_ref())
        .filter(|options| !options.is_empty())
    {
        return prior.clone();
    }

    let supplied: Vec<Value> = decode_or_default(&raw.options, Vec::new);
    let options: Vec<FieldOption> = supplied.iter().filter_map(option_from).collect();
    if options.is_empty() {
        default_options()
    } else {
        options
    }
}

fn option_from(entry: &Value) -> Option<FieldOption> {
    let option = entry.as_object()?;
    let label = scalar_text(option.get("label")).unwrap_or_default();
    let value = scalar_text(option.get("value")).unwrap_or_else(|| slugify(&label));
    let disabled = option.get("disabled").is_some_and(truthy);
    Some(FieldOption::new(label, value, disabled))
}

pub fn default_options() -> Vec<FieldOption> {
    (1..=3)
        .map(|n| FieldOption::new(format!("Option {n}"), format!("option{n}"), false))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
