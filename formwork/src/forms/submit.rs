use regex::Regex;
use serde_json::{Map, Value};

use super::model::{Field, FieldKind, ValidationRules};
use super::values::{display_text, number_value, to_number, truthy};
use crate::validation::{ValidationError, ValidationReport};
use crate::validators;

/// Checks a submitted response map against the stored fields and coerces
/// each present value to its canonical type.
///
/// Every field is checked; on failure the report holds one message per
/// invalid field and nothing should be persisted. On success the returned
/// map holds exactly the fields that were present and valid.
pub fn validate_submission(
    fields: &[Field],
    responses: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationReport> {
    let mut ordered: Vec<&Field> = fields.iter().collect();
    ordered.sort_by_key(|field| field.index);

    let mut report = ValidationReport::empty();
    let mut accepted = Map::new();

    for field in ordered {
        let empty = ValidationRules::default();
        let rules = field.validation.as_ref().unwrap_or(&empty);
        let required = field.required || rules.is_required();

        let value = match responses.get(&field.id) {
            Some(value) if !is_missing(value) => value,
            _ => {
                if required {
                    report.add(&field.id, &field.label, validators::required());
                }
                continue;
            }
        };

        match coerce(field, rules, value) {
            Ok(coerced) => {
                accepted.insert(field.id.clone(), coerced);
            }
            Err(err) => report.add(&field.id, &field.label, err),
        }
    }

    if report.is_empty() {
        Ok(accepted)
    } else {
        tracing::debug!(errors = report.len(), "submission rejected");
        Err(report)
    }
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn coerce(field: &Field, rules: &ValidationRules, value: &Value) -> Result<Value, ValidationError> {
    match field.kind() {
        FieldKind::Table => {
            if value.is_array() {
                Ok(value.clone())
            } else {
                Err(validators::not_a_table())
            }
        }
        FieldKind::Number => {
            let number = to_number(value).ok_or_else(validators::not_a_number)?;
            if let Some(min) = rules.min.as_ref().and_then(|n| n.as_f64()) {
                validators::min(min)(&number)?;
            }
            if let Some(max) = rules.max.as_ref().and_then(|n| n.as_f64()) {
                validators::max(max)(&number)?;
            }
            Ok(number_value(number))
        }
        FieldKind::Text | FieldKind::Textarea => {
            let text = display_text(value);
            if let Some(n) = rules.min_length {
                validators::min_chars(n)(&text)?;
            }
            if let Some(n) = rules.max_length {
                validators::max_chars(n)(&text)?;
            }
            if let Some(source) = rules.pattern.as_deref() {
                match Regex::new(source) {
                    Ok(re) => validators::pattern(&re)(&text)?,
                    Err(err) => {
                        tracing::warn!(
                            field_id = %field.id,
                            pattern = source,
                            error = %err,
                            "ignoring invalid validation pattern"
                        );
                    }
                }
            }
            Ok(Value::String(text))
        }
        FieldKind::Checkbox => Ok(Value::Bool(truthy(value))),
        _ => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::normalize::{RawField, normalize_all};
    use serde_json::json;

    fn fields(raw: Value) -> Vec<Field> {
        let raws: Vec<RawField> = serde_json::from_value(raw).expect("raw fields");
        normalize_all(&raws, &[]).expect("normalized")
    }

    fn responses(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn below_minimum_is_rejected() {
        let form = fields(json!([{"id": "age", "type": "number", "label": "Age", "validation": {"min": 18}}]));
        let report = validate_submission(&form, &responses(json!({"age": "17"}))).unwrap_err();
        assert_eq!(report.get("age"), Some("Age must be at least 18"));
    }

    #[test]
    fn numbers_are_coerced() {
        let form = fields(json!([{"id": "n", "type": "number", "label": "N", "validation": {"min": 1, "max": 5}}]));
        let accepted = validate_submission(&form, &responses(json!({"n": " 3 "}))).unwrap();
        assert_eq!(accepted["n"], json!(3));

        let accepted = validate_submission(&form, &responses(json!({"n": 2.5}))).unwrap();
        assert_eq!(accepted["n"], json!(2.5));

        let report = validate_submission(&form, &responses(json!({"n": "many"}))).unwrap_err();
        assert_eq!(report.get("n"), Some("N must be a number"));

        let report = validate_submission(&form, &responses(json!({"n": 7}))).unwrap_err();
        assert_eq!(report.get("n"), Some("N must be at most 5"));
    }

    #[test]
    fn every_invalid_field_is_reported() {
        let form = fields(json!([
            {"id": "name", "type": "text", "label": "Name", "required": true},
            {"id": "bio", "type": "textarea", "label": "Bio", "validation": {"maxLength": 3}},
            {"id": "code", "type": "text", "label": "Code", "validation": {"pattern": "^[A-Z]+$"}},
            {"id": "grid", "type": "table", "label": "Grid"},
            {"id": "ok", "type": "text", "label": "Ok"}
        ]));
        let report = validate_submission(
            &form,
            &responses(json!({"bio": "long", "code": "abc", "grid": {"rows": []}, "ok": "fine"})),
        )
        .unwrap_err();

        assert_eq!(report.len(), 4);
        assert_eq!(report.get("name"), Some("Name is required"));
        assert_eq!(report.get("bio"), Some("Bio must be at most 3 characters"));
        assert_eq!(report.get("code"), Some("Code has an invalid format"));
        assert_eq!(report.get("grid"), Some("Grid must be a table"));
        assert_eq!(report.get("ok"), None);
    }

    #[test]
    fn length_rule_wins_over_pattern() {
        let form = fields(json!([{
            "id": "t", "type": "text", "label": "T",
            "validation": {"minLength": 5, "pattern": "^x"}
        }]));
        let report = validate_submission(&form, &responses(json!({"t": "ab"}))).unwrap_err();
        assert_eq!(report.get("t"), Some("T must be at least 5 characters"));
    }

    #[test]
    fn missing_optional_fields_are_left_out() {
        let form = fields(json!([
            {"id": "a", "type": "text", "label": "A"},
            {"id": "b", "type": "text", "label": "B"},
            {"id": "c", "type": "number", "label": "C"},
            {"id": "d", "type": "text", "label": "D"}
        ]));
        let accepted = validate_submission(
            &form,
            &responses(json!({"a": "", "b": null, "d": 12, "unknown": "x"})),
        )
        .unwrap();
        assert_eq!(accepted, responses(json!({"d": "12"})));
    }

    #[test]
    fn text_is_stored_untrimmed() {
        let form = fields(json!([{"id": "t", "type": "text", "label": "T", "validation": {"maxLength": 4}}]));
        let accepted = validate_submission(&form, &responses(json!({"t": " ab "}))).unwrap();
        assert_eq!(accepted["t"], json!(" ab "));
    }

    #[test]
    fn checkbox_uses_truthiness() {
        let form = fields(json!([{"id": "c", "type": "checkbox", "label": "Agree"}]));
        for (input, expected) in [
            (json!("false"), true),
            (json!(false), false),
            (json!(0), false),
            (json!([]), true),
            (json!("yes"), true),
        ] {
            let accepted = validate_submission(&form, &responses(json!({"c": input}))).unwrap();
            assert_eq!(accepted["c"], json!(expected));
        }
    }

    #[test]
    fn tables_and_other_types_pass_through() {
        let form = fields(json!([
            {"id": "g", "type": "table", "label": "G"},
            {"id": "r", "type": "rating", "label": "R"}
        ]));
        let submitted = responses(json!({"g": [{"name": "x"}], "r": {"stars": 4}}));
        let accepted = validate_submission(&form, &submitted).unwrap();
        assert_eq!(accepted, submitted);
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let form = fields(json!([{"id": "t", "type": "text", "label": "T", "validation": {"pattern": "(["}}]));
        assert!(validate_submission(&form, &responses(json!({"t": "anything"}))).is_ok());
    }
}
