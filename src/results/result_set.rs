use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

use super::row::{Row, RowLayout};

/// Raw result of a query as handed back by a driver.
///
/// Column labels are kept exactly as the driver reported them, in select
/// order; each entry of `results` holds one value per label.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    column_names: Vec<String>,
    /// The value vectors returned by the query
    pub results: Vec<Vec<RowValues>>,
}

impl ResultSet {
    /// Create an empty result set for the given column labels.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>) -> Self {
        Self {
            column_names,
            results: Vec::new(),
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add one tuple. Its length must match the column count.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        debug_assert_eq!(row_values.len(), self.column_names.len());
        self.results.push(row_values);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Materialize rows keyed by lowercased column label.
    ///
    /// Labels are lowercased before comparison; for a repeated label only
    /// the first column is kept and the rest are dropped. The resulting
    /// layout is computed once and shared by every row.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        let mut names = Vec::with_capacity(self.column_names.len());
        let mut index = HashMap::with_capacity(self.column_names.len());
        let mut kept = Vec::with_capacity(self.column_names.len());

        for (position, label) in self.column_names.iter().enumerate() {
            let key = label.to_lowercase();
            if index.contains_key(&key) {
                continue;
            }
            index.insert(key.clone(), names.len());
            names.push(key);
            kept.push(position);
        }

        let all_kept = kept.len() == self.column_names.len();
        let layout = Arc::new(RowLayout { names, index });

        self.results
            .into_iter()
            .map(|values| {
                let values = if all_kept {
                    values
                } else {
                    let mut values: Vec<Option<RowValues>> =
                        values.into_iter().map(Some).collect();
                    kept.iter()
                        .map(|&pos| values[pos].take().unwrap_or(RowValues::Null))
                        .collect()
                };
                Row::from_layout(Arc::clone(&layout), values)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> ResultSet {
        let mut rs = ResultSet::with_columns(vec!["ID".into(), "Name".into(), "id".into()]);
        rs.add_row_values(vec![
            RowValues::Int(1),
            RowValues::Text("TEST 1".into()),
            RowValues::Text("shadow".into()),
        ]);
        rs.add_row_values(vec![
            RowValues::Int(2),
            RowValues::Null,
            RowValues::Text("shadow".into()),
        ]);
        rs
    }

    #[test]
    fn duplicate_labels_keep_first_column() {
        let rows = people().into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0].get("id"), Some(&RowValues::Int(1)));
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn lookups_ignore_case_and_convert() {
        let rows = people().into_rows();
        assert_eq!(rows[0].get_string("NAME").unwrap().as_deref(), Some("TEST 1"));
        assert_eq!(rows[1].get_string("name").unwrap(), None);
        assert_eq!(rows[1].get_i64("missing").unwrap(), None);
        assert!(rows[0].get_i64("name").is_err());
        assert!(rows[0].contains_key("Id"));
    }

    #[test]
    fn row_serializes_as_object() {
        let rows = people().into_rows();
        let out = serde_json::to_value(&rows[0]).expect("serialize");
        assert_eq!(out, json!({"id": 1, "name": "TEST 1"}));
    }
}
