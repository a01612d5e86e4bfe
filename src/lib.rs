//! Fluent SQL over a connection scope.
//!
//! * [`Query`] assembles `SELECT` statements from fragments (table, joins,
//!   predicates, ordering, grouping, paging) or runs hand-written SQL, with
//!   `:name` parameters translated for the connection's dialect.
//! * [`ScopeManager`] and [`Scope`] run units of work that share one
//!   connection and one transaction however deeply they nest.
//! * [`Row`] gives case-insensitive access to result columns with typed
//!   accessors.
//!
//! Backends plug in through [`ConnectionProvider`] and [`DbConnection`];
//! an `SQLite` backend ships behind the default `sqlite` feature.

pub mod prelude;

pub mod connection;
pub mod conversion;
pub mod dialect;
pub mod error;
pub mod query_builder;
pub mod results;
pub mod scope;
pub mod translation;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use connection::{ConnectionProvider, DbConnection};
pub use conversion::{Converted, FromRowValue, TargetKind, convert_by_name, convert_to};
pub use dialect::SqlDialect;
pub use error::SqlFluentError;
pub use query_builder::{EmptySetPolicy, JoinKind, Query, SortDirection};
pub use results::{ResultSet, Row};
pub use scope::{Scope, ScopeManager};
pub use translation::{
    NamedParams, NamedStatement, PlaceholderStyle, parse_named, synthetic_names,
    synthetic_placeholders,
};
pub use types::RowValues;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteOptions, SqliteOptionsBuilder, SqliteProvider};
