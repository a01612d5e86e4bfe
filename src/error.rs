use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;

#[derive(Debug, Error)]
pub enum SqlFluentError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("Type not supported: {0}")]
    UnsupportedType(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// A unit of work run by a scope failed; the original cause is attached.
    #[error("Unit of work failed: {0}")]
    UnitOfWorkFailed(#[source] Box<SqlFluentError>),

    #[error("Unit of work panicked: {0}")]
    Panicked(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlFluentError {
    /// Wrap `self` as a unit-of-work failure unless it already is one.
    #[must_use]
    pub fn into_unit_failure(self) -> Self {
        match self {
            wrapped @ SqlFluentError::UnitOfWorkFailed(_) => wrapped,
            other => SqlFluentError::UnitOfWorkFailed(Box::new(other)),
        }
    }

    /// The innermost error, looking through a unit-of-work wrapper.
    #[must_use]
    pub fn root_cause(&self) -> &SqlFluentError {
        match self {
            SqlFluentError::UnitOfWorkFailed(inner) => inner.root_cause(),
            other => other,
        }
    }
}
