use std::time::Duration;

use rusqlite::OpenFlags;

use crate::connection::ConnectionProvider;
use crate::error::SqlFluentError;

use super::connection::SqliteConnection;

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub busy_timeout: Option<Duration>,
    pub read_only: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: None,
            read_only: false,
        }
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    fn open_flags(&self) -> OpenFlags {
        if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone, Default)]
pub struct SqliteOptionsBuilder {
    db_path: Option<String>,
    busy_timeout: Option<Duration>,
    read_only: bool,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = Some(db_path.into());
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Build a provider from the collected options.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ConfigError` if no database path was given.
    pub fn build(self) -> Result<SqliteProvider, SqlFluentError> {
        let db_path = self.db_path.ok_or_else(|| {
            SqlFluentError::ConfigError("SQLite database path is required".into())
        })?;
        SqliteProvider::from_options(SqliteOptions {
            db_path,
            busy_timeout: self.busy_timeout,
            read_only: self.read_only,
        })
    }
}

/// Opens a new `SQLite` connection on every `acquire`.
#[derive(Debug, Clone)]
pub struct SqliteProvider {
    opts: SqliteOptions,
}

impl SqliteProvider {
    /// Provider for the database at `db_path` with default options.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ConfigError` if the path is blank.
    pub fn new(db_path: impl Into<String>) -> Result<Self, SqlFluentError> {
        Self::from_options(SqliteOptions::new(db_path))
    }

    /// # Errors
    ///
    /// Returns `SqlFluentError::ConfigError` if the path is blank.
    pub fn from_options(opts: SqliteOptions) -> Result<Self, SqlFluentError> {
        if opts.db_path.trim().is_empty() {
            return Err(SqlFluentError::ConfigError(
                "SQLite database path is required".into(),
            ));
        }
        Ok(Self { opts })
    }

    #[must_use]
    pub fn builder() -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::default()
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.opts
    }
}

impl ConnectionProvider for SqliteProvider {
    type Connection = SqliteConnection;

    fn acquire(&self) -> Result<SqliteConnection, SqlFluentError> {
        let conn = rusqlite::Connection::open_with_flags(&self.opts.db_path, self.opts.open_flags())
            .map_err(|e| {
                SqlFluentError::ConnectionError(format!(
                    "failed to open SQLite database {}: {e}",
                    self.opts.db_path
                ))
            })?;
        if let Some(timeout) = self.opts.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        tracing::debug!(path = %self.opts.db_path, "opened SQLite connection");
        Ok(SqliteConnection::new(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_path_is_a_config_error() {
        assert!(matches!(
            SqliteProvider::new("  "),
            Err(SqlFluentError::ConfigError(_))
        ));
        assert!(matches!(
            SqliteProvider::builder().read_only(true).build(),
            Err(SqlFluentError::ConfigError(_))
        ));
    }

    #[test]
    fn builder_carries_options() {
        let provider = SqliteProvider::builder()
            .path("file.db")
            .busy_timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(provider.options().db_path, "file.db");
        assert_eq!(provider.options().busy_timeout, Some(Duration::from_millis(250)));
        assert!(!provider.options().read_only);
    }
}
