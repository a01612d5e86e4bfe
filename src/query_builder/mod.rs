//! Fluent statement builder bound to one connection.
//!
//! Fragments accumulate in a fixed structure and are rendered by a terminal
//! action (`get`, `all`, `first`, `count`, `execute`):
//!
//! ```rust,no_run
//! # use sql_fluent::prelude::*;
//! # fn demo(conn: &mut SqliteConnection) -> Result<(), SqlFluentError> {
//! let rows = Query::connect(conn)
//!     .table("people")
//!     .where_eq("age", 30)
//!     .where_like("name", "ali")
//!     .order_by("name", "desc")
//!     .paginate(1, 20)
//!     .get()?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

use crate::connection::DbConnection;
use crate::error::SqlFluentError;
use crate::types::RowValues;

mod dml;
mod fragments;
mod select;

pub use fragments::{EmptySetPolicy, JoinKind, SortDirection};
use fragments::QueryFragments;

/// Single-use statement builder.
///
/// Builder methods consume and return the builder for chaining. Terminal
/// actions borrow it, render the statement from scratch, bind the named
/// parameters and run it; calling one twice renders twice.
pub struct Query<'c, C: DbConnection + ?Sized> {
    pub(crate) conn: &'c mut C,
    pub(crate) fragments: QueryFragments,
}

impl<'c, C: DbConnection + ?Sized> Query<'c, C> {
    pub fn connect(conn: &'c mut C) -> Self {
        Self {
            conn,
            fragments: QueryFragments::default(),
        }
    }

    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.fragments.set_table(table);
        self
    }

    /// Select list; unset or blank renders as `*`.
    #[must_use]
    pub fn select(mut self, select: &str) -> Self {
        self.fragments.set_select(select);
        self
    }

    #[must_use]
    pub fn join(mut self, table: &str, condition: &str) -> Self {
        self.fragments.add_join(JoinKind::Inner, table, condition);
        self
    }

    #[must_use]
    pub fn left_join(mut self, table: &str, condition: &str) -> Self {
        self.fragments.add_join(JoinKind::Left, table, condition);
        self
    }

    #[must_use]
    pub fn right_join(mut self, table: &str, condition: &str) -> Self {
        self.fragments.add_join(JoinKind::Right, table, condition);
        self
    }

    /// Use `statement` verbatim for every terminal action.
    ///
    /// Table, joins, predicates, grouping, ordering and paging are ignored
    /// from then on; only the parameter map still applies.
    #[must_use]
    pub fn statement(mut self, statement: &str) -> Self {
        self.fragments.set_statement(statement);
        self
    }

    #[must_use]
    pub fn where_raw(mut self, predicate: &str) -> Self {
        self.fragments.add_where_raw(predicate);
        self
    }

    /// `token = :token`, binding `value`.
    ///
    /// Characters outside `[A-Za-z0-9_]` in the token become `_` in the
    /// parameter name, so `people.id` binds `:people_id`.
    #[must_use]
    pub fn where_eq(mut self, token: &str, value: impl Into<RowValues>) -> Self {
        self.fragments.add_where_eq(token, value.into());
        self
    }

    /// `token IN (...)` with one generated parameter per value.
    ///
    /// A blank token is ignored. An empty list follows the
    /// [`EmptySetPolicy`] in force when the statement is rendered.
    #[must_use]
    pub fn where_in<I, V>(mut self, token: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.fragments
            .add_where_in(token, values.into_iter().map(Into::into).collect());
        self
    }

    /// Case-insensitive substring match on `token`.
    ///
    /// Skipped entirely when the token is blank or the text is `None` or blank.
    #[must_use]
    pub fn where_like<'t>(mut self, token: &str, text: impl Into<Option<&'t str>>) -> Self {
        self.fragments.add_where_like(token, text.into());
        self
    }

    /// 1-based page; ignored unless both numbers are positive.
    #[must_use]
    pub fn paginate(mut self, page: i64, per_page: i64) -> Self {
        self.fragments.set_page(page, per_page);
        self
    }

    /// Sort by `column`; `direction` is descending only for `"desc"` (any case).
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.fragments
            .set_order_by(column, SortDirection::parse(direction));
        self
    }

    #[must_use]
    pub fn group_by(mut self, group_by: &str) -> Self {
        self.fragments.set_group_by(group_by);
        self
    }

    #[must_use]
    pub fn empty_set_policy(mut self, policy: EmptySetPolicy) -> Self {
        self.fragments.set_empty_set_policy(policy);
        self
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<RowValues>) -> Self {
        self.fragments.insert_param(key, value.into());
        self
    }

    #[must_use]
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RowValues>,
    {
        for (key, value) in params {
            self.fragments.insert_param(key.as_ref(), value.into());
        }
        self
    }

    /// Set a parameter on a builder that is already being executed.
    pub fn set_param(&mut self, key: &str, value: impl Into<RowValues>) -> &mut Self {
        self.fragments.insert_param(key, value.into());
        self
    }

    /// The statement `get` would run, still carrying `:name` markers.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConfigError` if no table (and no raw statement)
    /// is set, or if the page window does not fit in a row offset.
    pub fn sql(&mut self) -> Result<String, SqlFluentError> {
        self.fragments.render(self.conn.dialect(), true)
    }
}
