//! `use sql_fluent::prelude::*;` brings in what a unit of work touches:
//! the [`Query`] builder and its [`Row`] results, [`ScopeManager`] and
//! [`Scope`], the connection traits, the error type and, with the `sqlite`
//! feature, the `SQLite` provider and connection.

pub use crate::connection::{ConnectionProvider, DbConnection};
pub use crate::conversion::FromRowValue;
pub use crate::dialect::SqlDialect;
pub use crate::error::SqlFluentError;
pub use crate::query_builder::{EmptySetPolicy, Query};
pub use crate::results::{ResultSet, Row};
pub use crate::scope::{Scope, ScopeManager};
pub use crate::translation::{PlaceholderStyle, parse_named};
pub use crate::types::RowValues;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteOptions, SqliteProvider};
