use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::embedded::Embedded;
use super::model::{TableColumn, TableRow, TableSchema};
use super::values::{fresh_id, scalar_text, slugify, truthy};

/// Reconciles a raw table description into a [`TableSchema`].
///
/// Never fails: malformed documents degrade to an empty schema and malformed
/// entries are dropped. Columns are settled first because row values are
/// keyed by the final (possibly defaulted) column keys. A table with columns
/// but no rows gets a single sample row so it always has something to render.
pub fn process_table(raw: &Value) -> TableSchema {
    let document = match Embedded::from(raw).decode() {
        Some(Value::Object(document)) => document,
        Some(other) => {
            tracing::warn!(found = %json_kind(&other), "table data is not an object");
            return TableSchema::default();
        }
        None => return TableSchema::default(),
    };

    let columns = process_columns(document.get("columns"));
    if columns.is_empty() {
        return TableSchema::default();
    }

    let mut rows = process_rows(document.get("rows"), &columns);
    if rows.is_empty() {
        rows.push(sample_row(&columns));
    }

    TableSchema { columns, rows }
}

fn process_columns(raw: Option<&Value>) -> Vec<TableColumn> {
    let Some(entries) = sequence(raw, "columns") else {
        return Vec::new();
    };
    entries.iter().filter_map(column_from).collect()
}

fn column_from(entry: &Value) -> Option<TableColumn> {
    let decoded = Embedded::from(entry).decode()?;
    let column = decoded.as_object()?;

    let label = scalar_text(column.get("label")).unwrap_or_default();
    let key = scalar_text(column.get("key")).unwrap_or_else(|| slugify(&label));
    if label.is_empty() || key.is_empty() {
        tracing::debug!(?column, "dropping table column without label or key");
        return None;
    }

    Some(TableColumn {
        id: scalar_text(column.get("id")).unwrap_or_else(fresh_id),
        column_type: scalar_text(column.get("type")).unwrap_or_else(|| "text".to_string()),
        validation: nested(column, "validation"),
        required: column.get("required").is_some_and(truthy),
        placeholder: scalar_text(column.get("placeholder")),
        options: nested(column, "options"),
        label,
        key,
    })
}

fn process_rows(raw: Option<&Value>, columns: &[TableColumn]) -> Vec<TableRow> {
    let Some(entries) = sequence(raw, "rows") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| row_from(entry, columns))
        .collect()
}

fn row_from(entry: &Value, columns: &[TableColumn]) -> Option<TableRow> {
    let decoded = Embedded::from(entry).decode()?;
    let Some(row) = decoded.as_object() else {
        tracing::debug!(found = %json_kind(&decoded), "dropping non-object table row");
        return None;
    };

    let nested_values = row.get("values").and_then(Value::as_object);
    let values = columns
        .iter()
        .map(|column| {
            let cell = nested_values
                .and_then(|values| values.get(&column.key))
                .filter(|value| !value.is_null())
                .or_else(|| row.get(&column.key));
            (column.key.clone(), cell_text(cell))
        })
        .collect::<IndexMap<_, _>>();

    Some(TableRow {
        id: scalar_text(row.get("id")).unwrap_or_else(fresh_id),
        values,
    })
}

fn sample_row(columns: &[TableColumn]) -> TableRow {
    TableRow {
        id: fresh_id(),
        values: columns
            .iter()
            .map(|column| (column.key.clone(), format!("Sample {}", column.label)))
            .collect(),
    }
}

fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// A nested column document (`validation`, `options`), decoded if encoded.
fn nested(column: &Map<String, Value>, name: &str) -> Option<Value> {
    column.get(name).and_then(|value| Embedded::from(value).decode())
}

fn sequence<'a>(raw: Option<&'a Value>, what: &str) -> Option<&'a Vec<Value>> {
    match raw {
        Some(Value::Array(entries)) => Some(entries),
        None | Some(Value::Null) => None,
        Some(other) => {
            tracing::warn!(found = %json_kind(other), "table {} is not an array", what);
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_column_key_and_type_and_adds_sample_row() {
        let table = process_table(&json!({"columns": [{"label": "Name"}], "rows": []}));

        assert_eq!(table.columns.len(), 1);
        let column = &table.columns[0];
        assert_eq!(column.label, "Name");
        assert_eq!(column.key, "name");
        assert_eq!(column.column_type, "text");
        assert!(!column.id.is_empty());

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].values.get("name").map(String::as_str), Some("Sample Name"));
    }

    #[test]
    fn accepts_string_encoded_document_and_entries() {
        let raw = json!(
            r#"{"columns":["{\"label\":\"Unit Price\",\"id\":\"c1\"}"],"rows":["{\"id\":\"r1\",\"values\":{\"unit_price\":3}}"]}"#
        );
        let table = process_table(&raw);

        assert_eq!(table.columns[0].id, "c1");
        assert_eq!(table.columns[0].key, "unit_price");
        assert_eq!(table.rows[0].id, "r1");
        assert_eq!(table.rows[0].values["unit_price"], "3");
    }

    #[test]
    fn drops_malformed_columns_and_rows() {
        let table = process_table(&json!({
            "columns": [
                {"label": "Qty"},
                "{broken",
                {"placeholder": "nothing to key on"},
                42
            ],
            "rows": [
                "{broken",
                7,
                {"values": {"qty": 2}}
            ]
        }));

        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].values["qty"], "2");
    }

    #[test]
    fn rekeys_rows_to_current_columns() {
        let table = process_table(&json!({
            "columns": [{"label": "A", "key": "a"}, {"label": "B", "key": "b"}],
            "rows": [
                {"id": "r1", "values": {"a": " x ", "stale": "gone"}, "b": true},
                {"id": "r2", "a": 1.5}
            ]
        }));

        let first: Vec<_> = table.rows[0].values.iter().collect();
        assert_eq!(
            first,
            vec![(&"a".to_string(), &"x".to_string()), (&"b".to_string(), &"true".to_string())]
        );
        assert_eq!(table.rows[1].values["a"], "1.5");
        assert_eq!(table.rows[1].values["b"], "");
    }

    #[test]
    fn degrades_to_empty_schema() {
        assert_eq!(process_table(&json!("{not json")), TableSchema::default());
        assert_eq!(process_table(&json!(null)), TableSchema::default());
        assert_eq!(process_table(&json!([1, 2])), TableSchema::default());
        assert_eq!(
            process_table(&json!({"columns": "nope", "rows": [{"a": 1}]})),
            TableSchema::default()
        );
    }

    #[test]
    fn no_columns_means_no_rows() {
        let table = process_table(&json!({"columns": [], "rows": [{"id": "r1"}]}));
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn nested_column_documents_are_decoded() {
        let table = process_table(&json!({
            "columns": [{
                "label": "Size",
                "type": "droplist",
                "required": 1,
                "options": "[{\"label\":\"S\",\"value\":\"s\"}]",
                "validation": "{broken"
            }]
        }));
        let column = &table.columns[0];
        assert_eq!(column.column_type, "droplist");
        assert!(column.required);
        assert_eq!(column.options, Some(json!([{"label": "S", "value": "s"}])));
        assert_eq!(column.validation, None);
    }

    #[test]
    fn reprocessing_is_stable() {
        let first = process_table(&json!({"columns": [{"label": "Name"}]}));
        let again = process_table(&serde_json::to_value(&first).unwrap());
        assert_eq!(first, again);
    }
}
