//! Value conversion utilities.
//!
//! Conversions from an opaque [`RowValues`] into a requested Rust type. Two
//! forms are offered: the [`FromRowValue`] trait, checked at compile time and
//! used by [`Row::get_as`](crate::results::Row::get_as), and [`TargetKind`],
//! a closed set of targets selected at runtime (for example from a type
//! name held in configuration).
//!
//! A `Null` input always converts to `None`. A non-null value that is not
//! already of the requested shape is rejected with
//! [`SqlFluentError::ConversionError`]; text is never parsed into numbers,
//! booleans or timestamps.

use chrono::NaiveDateTime;

use crate::error::SqlFluentError;
use crate::types::RowValues;

/// Conversion from a database value into `Self`.
pub trait FromRowValue: Sized {
    /// Name reported in error messages.
    const TYPE_NAME: &'static str;

    /// Convert a non-null value.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ConversionError` if the value is not assignable to `Self`.
    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError>;

    /// Convert a value, mapping `Null` to `None`.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ConversionError` if the value is not assignable to `Self`.
    fn from_row_value(value: &RowValues) -> Result<Option<Self>, SqlFluentError> {
        if value.is_null() {
            return Ok(None);
        }
        Self::from_non_null(value).map(Some)
    }
}

fn not_a(target: &str, value: &RowValues) -> SqlFluentError {
    SqlFluentError::ConversionError(format!("not a {target} type: {}", value.kind_name()))
}

impl FromRowValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError> {
        match value {
            RowValues::Bool(b) => Ok(*b),
            // SQLite stores booleans as 0/1 integers.
            RowValues::Int(0) => Ok(false),
            RowValues::Int(1) => Ok(true),
            other => Err(not_a(Self::TYPE_NAME, other)),
        }
    }
}

impl FromRowValue for i64 {
    const TYPE_NAME: &'static str = "long";

    #[allow(clippy::cast_possible_truncation)]
    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError> {
        match value {
            RowValues::Int(i) => Ok(*i),
            RowValues::Float(f) => Ok(*f as i64),
            other => Err(not_a(Self::TYPE_NAME, other)),
        }
    }
}

impl FromRowValue for i32 {
    const TYPE_NAME: &'static str = "integer";

    #[allow(clippy::cast_possible_truncation)]
    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError> {
        match value {
            RowValues::Int(i) => i32::try_from(*i).map_err(|_| {
                SqlFluentError::ConversionError(format!("integer value {i} out of range"))
            }),
            RowValues::Float(f) => Ok(*f as i32),
            other => Err(not_a(Self::TYPE_NAME, other)),
        }
    }
}

impl FromRowValue for f64 {
    const TYPE_NAME: &'static str = "double";

    #[allow(clippy::cast_precision_loss)]
    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError> {
        match value {
            RowValues::Float(f) => Ok(*f),
            RowValues::Int(i) => Ok(*i as f64),
            other => Err(not_a(Self::TYPE_NAME, other)),
        }
    }
}

impl FromRowValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError> {
        match value {
            RowValues::Text(s) => Ok(s.clone()),
            other => Err(not_a(Self::TYPE_NAME, other)),
        }
    }
}

impl FromRowValue for NaiveDateTime {
    const TYPE_NAME: &'static str = "timestamp";

    fn from_non_null(value: &RowValues) -> Result<Self, SqlFluentError> {
        match value {
            RowValues::Timestamp(dt) => Ok(*dt),
            other => Err(not_a(Self::TYPE_NAME, other)),
        }
    }
}

/// Runtime-selected conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Boolean,
    Integer,
    Long,
    Double,
    String,
    Timestamp,
}

impl TargetKind {
    /// Look up a target by type name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::UnsupportedType` carrying the name if no target matches.
    pub fn from_name(name: &str) -> Result<Self, SqlFluentError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(TargetKind::Boolean),
            "int" | "i32" | "integer" => Ok(TargetKind::Integer),
            "long" | "i64" | "bigint" => Ok(TargetKind::Long),
            "double" | "f64" | "float" => Ok(TargetKind::Double),
            "string" | "text" => Ok(TargetKind::String),
            "timestamp" | "datetime" => Ok(TargetKind::Timestamp),
            _ => Err(SqlFluentError::UnsupportedType(name.to_string())),
        }
    }
}

/// Result of a runtime conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
    Timestamp(NaiveDateTime),
}

/// Convert `value` into the shape named by `kind`.
///
/// # Errors
///
/// Returns `SqlFluentError::ConversionError` if the value is not assignable to the target.
pub fn convert_to(kind: TargetKind, value: &RowValues) -> Result<Option<Converted>, SqlFluentError> {
    let converted = match kind {
        TargetKind::Boolean => bool::from_row_value(value)?.map(Converted::Boolean),
        TargetKind::Integer => i32::from_row_value(value)?.map(Converted::Integer),
        TargetKind::Long => i64::from_row_value(value)?.map(Converted::Long),
        TargetKind::Double => f64::from_row_value(value)?.map(Converted::Double),
        TargetKind::String => String::from_row_value(value)?.map(Converted::String),
        TargetKind::Timestamp => NaiveDateTime::from_row_value(value)?.map(Converted::Timestamp),
    };
    Ok(converted)
}

/// Convert `value` into the target named `type_name`.
///
/// # Errors
///
/// Returns `SqlFluentError::UnsupportedType` for an unknown type name, or
/// `SqlFluentError::ConversionError` if the value is not assignable to the target.
pub fn convert_by_name(
    type_name: &str,
    value: &RowValues,
) -> Result<Option<Converted>, SqlFluentError> {
    convert_to(TargetKind::from_name(type_name)?, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_converts_to_none_for_every_target() {
        for kind in [
            TargetKind::Boolean,
            TargetKind::Integer,
            TargetKind::Long,
            TargetKind::Double,
            TargetKind::String,
            TargetKind::Timestamp,
        ] {
            assert_eq!(convert_to(kind, &RowValues::Null).unwrap(), None);
        }
    }

    #[test]
    fn text_is_not_parsed_as_boolean() {
        let err = bool::from_row_value(&RowValues::Text("true".into())).unwrap_err();
        assert!(matches!(err, SqlFluentError::ConversionError(ref m) if m.contains("boolean")));
    }

    #[test]
    fn integer_encodings_of_boolean_are_accepted() {
        assert_eq!(bool::from_row_value(&RowValues::Int(1)).unwrap(), Some(true));
        assert_eq!(bool::from_row_value(&RowValues::Int(0)).unwrap(), Some(false));
        assert!(bool::from_row_value(&RowValues::Int(2)).is_err());
    }

    #[test]
    fn numbers_widen_between_numeric_targets() {
        assert_eq!(f64::from_row_value(&RowValues::Int(3)).unwrap(), Some(3.0));
        assert_eq!(i64::from_row_value(&RowValues::Float(9.7)).unwrap(), Some(9));
        assert_eq!(i32::from_row_value(&RowValues::Int(90)).unwrap(), Some(90));
        assert!(i32::from_row_value(&RowValues::Int(i64::MAX)).is_err());
        assert!(i64::from_row_value(&RowValues::Text("12".into())).is_err());
    }

    #[test]
    fn string_and_timestamp_are_strict() {
        assert!(String::from_row_value(&RowValues::Int(1)).is_err());
        assert!(NaiveDateTime::from_row_value(&RowValues::Text("2024-01-01 00:00:00".into())).is_err());
    }

    #[test]
    fn unknown_type_name_is_reported() {
        let err = convert_by_name("uuid", &RowValues::Int(1)).unwrap_err();
        assert!(matches!(err, SqlFluentError::UnsupportedType(ref name) if name == "uuid"));
        assert_eq!(
            convert_by_name("Long", &RowValues::Int(5)).unwrap(),
            Some(Converted::Long(5))
        );
    }
}
