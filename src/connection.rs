//! The connection capability the scope manager and the query builder run on.
//!
//! Pooling, timeouts and wire protocols live behind these traits; the crate
//! only needs to acquire a connection, toggle auto-commit, end transactions
//! and run statements that already carry positional placeholders in the
//! connection's [`SqlDialect`].

use crate::dialect::SqlDialect;
use crate::error::SqlFluentError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Source of fresh connections.
pub trait ConnectionProvider {
    type Connection: DbConnection;

    /// Open (or check out) a connection.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if no connection can be obtained.
    fn acquire(&self) -> Result<Self::Connection, SqlFluentError>;
}

/// A single open database connection.
///
/// Statement methods receive SQL whose placeholders were written for
/// [`DbConnection::dialect`], with `params` in placeholder order.
pub trait DbConnection {
    fn dialect(&self) -> SqlDialect;

    fn is_closed(&self) -> bool;

    /// # Errors
    /// Returns `SqlFluentError` if the connection is closed.
    fn auto_commit(&self) -> Result<bool, SqlFluentError>;

    /// Turning auto-commit back on commits any open transaction.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if the mode cannot be changed.
    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), SqlFluentError>;

    /// # Errors
    /// Returns `SqlFluentError` if the commit fails.
    fn commit(&mut self) -> Result<(), SqlFluentError>;

    /// # Errors
    /// Returns `SqlFluentError` if the rollback fails.
    fn rollback(&mut self) -> Result<(), SqlFluentError>;

    /// Release the connection. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if the driver reports a failure while closing.
    fn close(&mut self) -> Result<(), SqlFluentError>;

    /// Run a statement; `true` when it produced a result set.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if execution fails.
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<bool, SqlFluentError>;

    /// Run a DML statement and report the affected row count.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if execution fails.
    fn execute_update(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, SqlFluentError>;

    /// Run a query and collect every tuple.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if execution or value extraction fails.
    fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFluentError>;

    /// Run one or more statements without parameters.
    ///
    /// # Errors
    /// Returns `SqlFluentError` if any statement fails.
    fn execute_batch(&mut self, sql: &str) -> Result<(), SqlFluentError>;
}
