use crate::connection::DbConnection;
use crate::error::SqlFluentError;
use crate::results::Row;
use crate::types::RowValues;

use super::Query;

#[allow(clippy::cast_possible_truncation)]
fn count_from_value(value: Option<&RowValues>) -> Result<i64, SqlFluentError> {
    match value {
        Some(RowValues::Int(count)) => Ok(*count),
        Some(RowValues::Float(count)) if count.fract() == 0.0 => Ok(*count as i64),
        Some(RowValues::Text(text)) => text
            .trim()
            .split_once('.')
            .filter(|(_, frac)| frac.chars().all(|c| c == '0'))
            .map_or(text.trim(), |(whole, _)| whole)
            .parse::<i64>()
            .map_err(|_| SqlFluentError::ExecutionError(format!("unexpected count value: {text}"))),
        Some(other) => Err(SqlFluentError::ExecutionError(format!(
            "unexpected count value of type {}",
            other.kind_name()
        ))),
        None => Err(SqlFluentError::ExecutionError(
            "count query returned no count column".into(),
        )),
    }
}

impl<C: DbConnection + ?Sized> Query<'_, C> {
    /// Run the statement with paging applied (when both page numbers are positive).
    ///
    /// # Errors
    /// Returns an error if rendering, binding or execution fails.
    pub fn get(&mut self) -> Result<Vec<Row>, SqlFluentError> {
        let sql = self.fragments.render(self.conn.dialect(), true)?;
        self.execute_query(&sql)
    }

    /// [`Query::get`], mapping every row.
    ///
    /// # Errors
    /// Returns an error if the query or any mapping fails.
    pub fn get_with<T, F>(&mut self, mapper: F) -> Result<Vec<T>, SqlFluentError>
    where
        F: FnMut(&Row) -> Result<T, SqlFluentError>,
    {
        self.get()?.iter().map(mapper).collect()
    }

    /// Run the statement without paging, whatever `paginate` was given.
    ///
    /// # Errors
    /// Returns an error if rendering, binding or execution fails.
    pub fn all(&mut self) -> Result<Vec<Row>, SqlFluentError> {
        let sql = self.fragments.render(self.conn.dialect(), false)?;
        self.execute_query(&sql)
    }

    /// [`Query::all`], mapping every row.
    ///
    /// # Errors
    /// Returns an error if the query or any mapping fails.
    pub fn all_with<T, F>(&mut self, mapper: F) -> Result<Vec<T>, SqlFluentError>
    where
        F: FnMut(&Row) -> Result<T, SqlFluentError>,
    {
        self.all()?.iter().map(mapper).collect()
    }

    /// First row of [`Query::all`], if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn first(&mut self) -> Result<Option<Row>, SqlFluentError> {
        Ok(self.all()?.into_iter().next())
    }

    /// Hand the result of [`Query::first`] (possibly `None`) to `mapper`.
    ///
    /// # Errors
    /// Returns an error if the query or the mapping fails.
    pub fn first_with<T, F>(&mut self, mapper: F) -> Result<T, SqlFluentError>
    where
        F: FnOnce(Option<Row>) -> Result<T, SqlFluentError>,
    {
        mapper(self.first()?)
    }

    /// `COUNT(*)` over the current joins, predicates and grouping.
    ///
    /// # Errors
    /// Returns an error if the query fails or the count cannot be read.
    pub fn count(&mut self) -> Result<i64, SqlFluentError> {
        self.count_of("*")
    }

    /// `COUNT(expression)`, e.g. `count_of("distinct student_id")`; blank means `*`.
    ///
    /// # Errors
    /// Returns an error if the query fails or the count cannot be read.
    pub fn count_of(&mut self, expression: &str) -> Result<i64, SqlFluentError> {
        let sql = self.fragments.render_count(Some(expression))?;
        let rows = self.execute_query(&sql)?;
        match rows.first() {
            Some(row) => count_from_value(row.get("count")),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_accepts_integer_and_exact_decimal_forms() {
        assert_eq!(count_from_value(Some(&RowValues::Int(4))).unwrap(), 4);
        assert_eq!(count_from_value(Some(&RowValues::Float(2.0))).unwrap(), 2);
        assert_eq!(count_from_value(Some(&RowValues::Text("12".into()))).unwrap(), 12);
        assert_eq!(count_from_value(Some(&RowValues::Text("7.000".into()))).unwrap(), 7);
        assert!(count_from_value(Some(&RowValues::Text("7.5".into()))).is_err());
        assert!(count_from_value(Some(&RowValues::Float(2.5))).is_err());
        assert!(count_from_value(None).is_err());
    }
}
