use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::conversion::FromRowValue;
use crate::error::SqlFluentError;
use crate::types::RowValues;

/// Column layout shared by every row of one result set.
#[derive(Debug)]
pub(crate) struct RowLayout {
    /// Lowercased, de-duplicated column names in select order.
    pub(crate) names: Vec<String>,
    pub(crate) index: HashMap<String, usize>,
}

/// One result tuple keyed by lowercased column name.
///
/// When a statement selects several columns under the same label
/// (`select id, name as id from t`), only the first one is kept.
#[derive(Debug, Clone)]
pub struct Row {
    layout: Arc<RowLayout>,
    values: Vec<RowValues>,
}

impl Row {
    pub(crate) fn from_layout(layout: Arc<RowLayout>, values: Vec<RowValues>) -> Self {
        Self { layout, values }
    }

    fn position(&self, key: &str) -> Option<usize> {
        if let Some(&idx) = self.layout.index.get(key) {
            return Some(idx);
        }
        self.layout.index.get(&key.to_lowercase()).copied()
    }

    /// Get a value by column name; the lookup is case-insensitive.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RowValues> {
        self.position(key).and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Number of distinct columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names in select order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.layout.names.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.keys().zip(self.values.iter())
    }

    /// Convert the value under `key` into `T`.
    ///
    /// A missing column or a `NULL` value yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ConversionError` if the stored value is not assignable to `T`.
    pub fn get_as<T: FromRowValue>(&self, key: &str) -> Result<Option<T>, SqlFluentError> {
        match self.get(key) {
            Some(value) => T::from_row_value(value),
            None => Ok(None),
        }
    }

    /// # Errors
    /// See [`Row::get_as`].
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, SqlFluentError> {
        self.get_as(key)
    }

    /// # Errors
    /// See [`Row::get_as`].
    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, SqlFluentError> {
        self.get_as(key)
    }

    /// # Errors
    /// See [`Row::get_as`].
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, SqlFluentError> {
        self.get_as(key)
    }

    /// # Errors
    /// See [`Row::get_as`].
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, SqlFluentError> {
        self.get_as(key)
    }

    /// # Errors
    /// See [`Row::get_as`].
    pub fn get_string(&self, key: &str) -> Result<Option<String>, SqlFluentError> {
        self.get_as(key)
    }

    /// # Errors
    /// See [`Row::get_as`].
    pub fn get_timestamp(&self, key: &str) -> Result<Option<NaiveDateTime>, SqlFluentError> {
        self.get_as(key)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
