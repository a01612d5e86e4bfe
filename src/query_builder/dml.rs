use crate::connection::DbConnection;
use crate::error::SqlFluentError;
use crate::results::Row;
use crate::translation::parse_named;
use crate::types::RowValues;

use super::Query;

impl<C: DbConnection + ?Sized> Query<'_, C> {
    /// Translate `:name` markers for this connection and bind the parameter map.
    fn bind(&self, sql: &str) -> Result<(String, Vec<RowValues>), SqlFluentError> {
        let named = parse_named(sql, self.conn.dialect().placeholder_style());
        let values = named.bind(&self.fragments.params)?;
        tracing::debug!(sql = %named.sql(), params = values.len(), "executing statement");
        Ok((named.into_sql(), values))
    }

    /// Render the unpaged statement (or the raw statement) and run it.
    ///
    /// Returns `true` when the statement produced a result set.
    ///
    /// # Errors
    /// Returns an error if rendering, binding or execution fails.
    pub fn execute(&mut self) -> Result<bool, SqlFluentError> {
        let sql = self.fragments.render(self.conn.dialect(), false)?;
        self.execute_sql(&sql)
    }

    /// Run caller SQL with the accumulated parameters.
    ///
    /// ```rust,no_run
    /// # use sql_fluent::prelude::*;
    /// # fn demo(conn: &mut SqliteConnection) -> Result<(), SqlFluentError> {
    /// Query::connect(conn)
    ///     .param("name", "some")
    ///     .execute_sql("update people set gender = 'male' where name = :name")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns an error if binding or execution fails.
    pub fn execute_sql(&mut self, sql: &str) -> Result<bool, SqlFluentError> {
        let (positional, values) = self.bind(sql)?;
        self.conn.execute(&positional, &values)
    }

    /// Run an insert, update or delete and return the affected row count.
    ///
    /// # Errors
    /// Returns an error if binding or execution fails.
    pub fn execute_update(&mut self, sql: &str) -> Result<usize, SqlFluentError> {
        let (positional, values) = self.bind(sql)?;
        self.conn.execute_update(&positional, &values)
    }

    /// Run a query written by the caller and materialize its rows.
    ///
    /// # Errors
    /// Returns an error if binding or execution fails.
    pub fn execute_query(&mut self, sql: &str) -> Result<Vec<Row>, SqlFluentError> {
        let (positional, values) = self.bind(sql)?;
        Ok(self.conn.query(&positional, &values)?.into_rows())
    }
}
