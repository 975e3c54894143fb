//! JSON table export and import
//!
//! Export shape: an object mapping each column name to an array of its
//! stringified row values in index order. Empty rows export as `null`.
//! Key order carries no meaning.

use serde_json::{Map, Value as Json};

use cqlstore_core::{ColumnId, CqlError, CqlResult, CqlStore, Table, Value};

use crate::table_file::{fill_table, ParsedColumn};

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Export a table as `{ column: [value, ...] }`.
pub fn export_table(table: &Table) -> Json {
    let mut object = Map::new();
    for column in table.columns() {
        let values = column
            .rows()
            .map(|r| r.value().map_or(Json::Null, |v| Json::String(v.to_string())))
            .collect();
        object.insert(column.name().to_string(), Json::Array(values));
    }
    Json::Object(object)
}

fn cell_value(cell: &Json) -> CqlResult<Option<Value>> {
    match cell {
        Json::Null => Ok(None),
        Json::String(s) => Ok(Some(Value::infer(s))),
        Json::Number(n) => Ok(Some(Value::infer(&n.to_string()))),
        Json::Bool(b) => Ok(Some(Value::Boolean(*b))),
        other => Err(CqlError::TypeMismatch {
            expected: "string, number, boolean or null".to_string(),
            found: json_kind(other).to_string(),
        }),
    }
}

/// Add every column of an exported table to the active document.
///
/// The columns are inserted in name order into a staged copy of the table,
/// which replaces the live one only if every cell parses and every insert
/// succeeds. Any error leaves the table untouched.
pub fn import_table(store: &mut CqlStore, json: &Json) -> CqlResult<Vec<ColumnId>> {
    let object = json.as_object().ok_or_else(|| CqlError::TypeMismatch {
        expected: "object".to_string(),
        found: json_kind(json).to_string(),
    })?;

    let mut columns: Vec<ParsedColumn> = Vec::with_capacity(object.len());
    for (name, cells) in object {
        let cells = cells.as_array().ok_or_else(|| CqlError::TypeMismatch {
            expected: "array".to_string(),
            found: json_kind(cells).to_string(),
        })?;
        let values = cells.iter().map(cell_value).collect::<CqlResult<Vec<_>>>()?;
        columns.push((name.clone(), values));
    }
    columns.sort_by(|a, b| a.0.cmp(&b.0));

    store.edit_table(|table, rng, config| fill_table(table, rng, config, columns))
}
