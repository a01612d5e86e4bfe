use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::error::SqlFluentError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// How a column's declared type refines the storage class SQLite hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredKind {
    Plain,
    Boolean,
    Timestamp,
    Json,
}

fn declared_kind(decl_type: Option<&str>) -> DeclaredKind {
    let Some(decl) = decl_type else {
        return DeclaredKind::Plain;
    };
    let decl = decl.to_ascii_uppercase();
    if decl.starts_with("BOOL") {
        DeclaredKind::Boolean
    } else if decl.starts_with("DATETIME") || decl.starts_with("TIMESTAMP") {
        DeclaredKind::Timestamp
    } else if decl == "JSON" {
        DeclaredKind::Json
    } else {
        DeclaredKind::Plain
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlFluentError` if the value cannot be read.
fn sqlite_extract_value(
    row: &rusqlite::Row,
    idx: usize,
    kind: DeclaredKind,
) -> Result<RowValues, SqlFluentError> {
    let value: Value = row.get(idx)?;
    let extracted = match (value, kind) {
        (Value::Null, _) => RowValues::Null,
        (Value::Integer(i @ (0 | 1)), DeclaredKind::Boolean) => RowValues::Bool(i == 1),
        (Value::Integer(i), _) => RowValues::Int(i),
        (Value::Real(f), _) => RowValues::Float(f),
        (Value::Text(s), DeclaredKind::Timestamp) => match parse_timestamp(&s) {
            Some(dt) => RowValues::Timestamp(dt),
            None => RowValues::Text(s),
        },
        (Value::Text(s), DeclaredKind::Json) => match serde_json::from_str(&s) {
            Ok(json) => RowValues::JSON(json),
            Err(_) => RowValues::Text(s),
        },
        (Value::Text(s), _) => RowValues::Text(s),
        (Value::Blob(b), _) => RowValues::Blob(b),
    };
    Ok(extracted)
}

/// Run a prepared `SQLite` query and collect every tuple.
///
/// # Errors
/// Returns `SqlFluentError` if query execution or value extraction fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, SqlFluentError> {
    let (column_names, kinds): (Vec<String>, Vec<DeclaredKind>) = stmt
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), declared_kind(col.decl_type())))
        .unzip();

    let mut result_set = ResultSet::with_columns(column_names);
    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;

    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(kinds.len());
        for (i, kind) in kinds.iter().enumerate() {
            row_values.push(sqlite_extract_value(row, i, *kind)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_refine_storage_classes() {
        assert_eq!(declared_kind(Some("boolean")), DeclaredKind::Boolean);
        assert_eq!(declared_kind(Some("DATETIME")), DeclaredKind::Timestamp);
        assert_eq!(declared_kind(Some("timestamp with time zone")), DeclaredKind::Timestamp);
        assert_eq!(declared_kind(Some("json")), DeclaredKind::Json);
        assert_eq!(declared_kind(Some("varchar(20)")), DeclaredKind::Plain);
        assert_eq!(declared_kind(None), DeclaredKind::Plain);
    }

    #[test]
    fn timestamps_parse_with_and_without_fraction() {
        assert!(parse_timestamp("2024-01-02 03:04:05").is_some());
        assert!(parse_timestamp("2024-01-02 03:04:05.123").is_some());
        assert!(parse_timestamp("2024-01-02T03:04:05").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
