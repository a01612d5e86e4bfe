//! Connection and transaction scopes.
//!
//! A [`Scope`] holds at most one open connection plus the state of the
//! transaction running on it. `execute` and `transaction` can be nested to
//! any depth on the same scope: the outermost call acquires the connection
//! and is the only one that closes it, and the outermost `transaction`
//! is the only one that commits. Nested calls reuse what is already open.
//!
//! The scope is an explicit value handed to every unit of work, so a unit
//! of work can only share its connection by passing the scope along; a
//! scope is never visible to another thread by accident.
//!
//! ```rust,no_run
//! # use sql_fluent::prelude::*;
//! # fn demo() -> Result<(), SqlFluentError> {
//! let manager = ScopeManager::new(SqliteProvider::new("app.db")?);
//! manager.transaction(|scope| {
//!     scope.query()?.param("id", 1).execute_update("delete from orders where id = :id")?;
//!     // joins the outer transaction, commits nothing itself
//!     scope.transaction(|scope| {
//!         scope.query()?.param("id", 1).execute_update("delete from order_lines where order_id = :id")?;
//!         Ok(())
//!     })
//! })?;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::connection::{ConnectionProvider, DbConnection};
use crate::error::SqlFluentError;
use crate::query_builder::Query;

mod transaction;

use transaction::TxState;

/// Owns a connection provider and hands out fresh scopes.
#[derive(Debug, Clone)]
pub struct ScopeManager<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> ScopeManager<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// A new scope with nothing open yet.
    pub fn scope(&self) -> Scope<'_, P> {
        Scope::new(&self.provider)
    }

    /// [`Scope::execute`] on a fresh scope.
    ///
    /// # Errors
    /// See [`Scope::execute`].
    pub fn execute<'a, T, F>(&'a self, work: F) -> Result<T, SqlFluentError>
    where
        F: FnOnce(&mut Scope<'a, P>) -> Result<T, SqlFluentError>,
    {
        self.scope().execute(work)
    }

    /// [`Scope::transaction`] on a fresh scope.
    ///
    /// # Errors
    /// See [`Scope::transaction`].
    pub fn transaction<'a, T, F>(&'a self, work: F) -> Result<T, SqlFluentError>
    where
        F: FnOnce(&mut Scope<'a, P>) -> Result<T, SqlFluentError>,
    {
        self.scope().transaction(work)
    }
}

/// One logical unit of work's connection and transaction state.
pub struct Scope<'m, P: ConnectionProvider> {
    provider: &'m P,
    conn: Option<P::Connection>,
    conn_depth: usize,
    tx: Option<TxState>,
}

impl<'m, P: ConnectionProvider> Scope<'m, P> {
    pub fn new(provider: &'m P) -> Self {
        Self {
            provider,
            conn: None,
            conn_depth: 0,
            tx: None,
        }
    }

    /// The open connection.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConnectionError` outside `execute`/`transaction`.
    pub fn connection(&mut self) -> Result<&mut P::Connection, SqlFluentError> {
        self.conn
            .as_mut()
            .filter(|conn| !conn.is_closed())
            .ok_or_else(|| {
                SqlFluentError::ConnectionError(
                    "no open connection; run inside execute or transaction".into(),
                )
            })
    }

    /// A statement builder on the open connection.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConnectionError` outside `execute`/`transaction`.
    pub fn query(&mut self) -> Result<Query<'_, P::Connection>, SqlFluentError> {
        Ok(Query::connect(self.connection()?))
    }

    /// Number of `execute`/`transaction` calls currently running on this scope.
    #[must_use]
    pub fn connection_depth(&self) -> usize {
        self.conn_depth
    }

    /// Number of `transaction` calls currently running on this scope.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.depth)
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Run `work` with an open connection.
    ///
    /// Opens a connection when none is open (or the cached one was closed
    /// elsewhere). The call that opened it closes it afterwards, whatever
    /// `work` returned. No rollback happens here: statements that already
    /// ran outside a transaction stay applied.
    ///
    /// # Errors
    /// A failure (or panic) inside `work` is returned as
    /// `SqlFluentError::UnitOfWorkFailed`. Failing to acquire or close the
    /// connection is a `SqlFluentError::ConnectionError`; a close failure
    /// never replaces an earlier failure from `work`.
    pub fn execute<T, F>(&mut self, work: F) -> Result<T, SqlFluentError>
    where
        F: FnOnce(&mut Self) -> Result<T, SqlFluentError>,
    {
        self.enter_connection()?;
        let outcome = run_unit_of_work(self, work).map_err(SqlFluentError::into_unit_failure);
        self.leave_connection(outcome)
    }

    /// Run `work` inside a transaction.
    ///
    /// The outermost `transaction` on the scope turns auto-commit off
    /// (remembering the previous mode), commits after `work` succeeds and
    /// restores the mode. Nested calls join the running transaction.
    ///
    /// A failure at any level rolls back immediately and marks the
    /// transaction rollback-only: the outermost call will not commit, even if
    /// an intermediate unit of work swallowed the failure.
    ///
    /// # Errors
    /// As for [`Scope::execute`]; commit failures and rollback-only
    /// completion are reported as `SqlFluentError::UnitOfWorkFailed` too.
    pub fn transaction<T, F>(&mut self, work: F) -> Result<T, SqlFluentError>
    where
        F: FnOnce(&mut Self) -> Result<T, SqlFluentError>,
    {
        self.enter_connection()?;
        let outcome = self.run_in_transaction(work);
        self.leave_connection(outcome)
    }

    fn run_in_transaction<T, F>(&mut self, work: F) -> Result<T, SqlFluentError>
    where
        F: FnOnce(&mut Self) -> Result<T, SqlFluentError>,
    {
        self.begin_transaction()
            .map_err(SqlFluentError::into_unit_failure)?;
        match run_unit_of_work(self, work) {
            Ok(value) => self
                .finish_transaction()
                .map(|()| value)
                .map_err(SqlFluentError::into_unit_failure),
            Err(err) => {
                self.abort_transaction();
                Err(err.into_unit_failure())
            }
        }
    }

    fn enter_connection(&mut self) -> Result<(), SqlFluentError> {
        if self.conn.as_ref().is_none_or(DbConnection::is_closed) {
            let mut conn = self.provider.acquire().map_err(|err| match err {
                err @ SqlFluentError::ConnectionError(_) => err,
                other => SqlFluentError::ConnectionError(format!(
                    "failed to acquire connection: {other}"
                )),
            })?;
            if let Some(tx) = self.tx.as_mut() {
                // nested work must stay uncommitted until the final rollback
                tracing::warn!("connection closed during a transaction; marking it rollback-only");
                tx.rollback_only = true;
                if let Err(err) = conn.set_auto_commit(false) {
                    if let Err(close_err) = conn.close() {
                        tracing::warn!(error = %close_err, "closing replacement connection failed");
                    }
                    return Err(err);
                }
            }
            tracing::debug!(depth = self.conn_depth, "acquired connection");
            self.conn = Some(conn);
        }
        self.conn_depth += 1;
        Ok(())
    }

    fn leave_connection<T>(
        &mut self,
        outcome: Result<T, SqlFluentError>,
    ) -> Result<T, SqlFluentError> {
        self.conn_depth = self.conn_depth.saturating_sub(1);
        if self.conn_depth > 0 {
            return outcome;
        }
        let Some(mut conn) = self.conn.take() else {
            return outcome;
        };

        match conn.close() {
            Ok(()) => {
                tracing::debug!("closed connection");
                outcome
            }
            Err(close_err) => {
                let close_err = match close_err {
                    err @ SqlFluentError::ConnectionError(_) => err,
                    other => SqlFluentError::ConnectionError(format!(
                        "failed to close connection: {other}"
                    )),
                };
                match outcome {
                    Ok(_) => Err(close_err),
                    Err(err) => {
                        tracing::warn!(error = %close_err, "closing connection failed after an earlier failure");
                        Err(err)
                    }
                }
            }
        }
    }
}

/// Run `work`, turning a panic into an error.
fn run_unit_of_work<S, T, F>(scope: &mut S, work: F) -> Result<T, SqlFluentError>
where
    F: FnOnce(&mut S) -> Result<T, SqlFluentError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| work(scope))) {
        Ok(result) => result,
        Err(payload) => Err(SqlFluentError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::dialect::SqlDialect;
    use crate::results::ResultSet;
    use crate::types::RowValues;

    #[derive(Default)]
    struct Journal {
        events: RefCell<Vec<&'static str>>,
        fail_close: Cell<bool>,
        fail_commit: Cell<bool>,
        fail_rollback: Cell<bool>,
        fail_acquire: Cell<bool>,
    }

    impl Journal {
        fn record(&self, event: &'static str) {
            self.events.borrow_mut().push(event);
        }

        fn count(&self, event: &str) -> usize {
            self.events.borrow().iter().filter(|e| **e == event).count()
        }
    }

    struct MockProvider(Rc<Journal>);

    struct MockConnection {
        journal: Rc<Journal>,
        closed: bool,
        auto_commit: bool,
    }

    impl ConnectionProvider for MockProvider {
        type Connection = MockConnection;

        fn acquire(&self) -> Result<MockConnection, SqlFluentError> {
            if self.0.fail_acquire.get() {
                return Err(SqlFluentError::Other("pool exhausted".into()));
            }
            self.0.record("acquire");
            Ok(MockConnection {
                journal: Rc::clone(&self.0),
                closed: false,
                auto_commit: true,
            })
        }
    }

    impl DbConnection for MockConnection {
        fn dialect(&self) -> SqlDialect {
            SqlDialect::Sqlite
        }

        fn is_closed(&self) -> bool {
            self.closed
        }

        fn auto_commit(&self) -> Result<bool, SqlFluentError> {
            Ok(self.auto_commit)
        }

        fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), SqlFluentError> {
            self.journal
                .record(if auto_commit { "auto_commit_on" } else { "auto_commit_off" });
            self.auto_commit = auto_commit;
            Ok(())
        }

        fn commit(&mut self) -> Result<(), SqlFluentError> {
            if self.journal.fail_commit.get() {
                return Err(SqlFluentError::ExecutionError("disk full".into()));
            }
            self.journal.record("commit");
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), SqlFluentError> {
            if self.journal.fail_rollback.get() {
                return Err(SqlFluentError::ExecutionError("rollback refused".into()));
            }
            self.journal.record("rollback");
            Ok(())
        }

        fn close(&mut self) -> Result<(), SqlFluentError> {
            self.closed = true;
            if self.journal.fail_close.get() {
                return Err(SqlFluentError::Other("socket reset".into()));
            }
            self.journal.record("close");
            Ok(())
        }

        fn execute(&mut self, _sql: &str, _params: &[RowValues]) -> Result<bool, SqlFluentError> {
            Ok(false)
        }

        fn execute_update(
            &mut self,
            _sql: &str,
            _params: &[RowValues],
        ) -> Result<usize, SqlFluentError> {
            self.journal.record("update");
            Ok(1)
        }

        fn query(&mut self, _sql: &str, _params: &[RowValues]) -> Result<ResultSet, SqlFluentError> {
            Ok(ResultSet::with_columns(vec!["n".into()]))
        }

        fn execute_batch(&mut self, _sql: &str) -> Result<(), SqlFluentError> {
            Ok(())
        }
    }

    fn manager() -> (ScopeManager<MockProvider>, Rc<Journal>) {
        let journal = Rc::new(Journal::default());
        (ScopeManager::new(MockProvider(Rc::clone(&journal))), journal)
    }

    #[test]
    fn nested_execute_shares_one_connection() {
        let (manager, journal) = manager();
        manager
            .execute(|scope| {
                assert_eq!(scope.connection_depth(), 1);
                scope.execute(|scope| {
                    assert_eq!(scope.connection_depth(), 2);
                    scope.query()?.execute_update("update t set a = 1")
                })?;
                assert!(!scope.connection()?.is_closed());
                Ok(())
            })
            .unwrap();
        assert_eq!(journal.count("acquire"), 1);
        assert_eq!(journal.count("close"), 1);
    }

    #[test]
    fn connection_is_unavailable_outside_a_unit_of_work() {
        let (manager, _) = manager();
        let mut scope = manager.scope();
        assert!(matches!(
            scope.connection(),
            Err(SqlFluentError::ConnectionError(_))
        ));
    }

    #[test]
    fn nested_transactions_commit_once_and_restore_auto_commit() {
        let (manager, journal) = manager();
        manager
            .transaction(|scope| {
                scope.transaction(|scope| {
                    assert_eq!(scope.transaction_depth(), 2);
                    scope.query()?.execute_update("update t set a = 1")
                })?;
                assert_eq!(journal.count("commit"), 0);
                assert!(!scope.connection()?.auto_commit()?);
                Ok(())
            })
            .unwrap();
        assert_eq!(
            *journal.events.borrow(),
            vec!["acquire", "auto_commit_off", "update", "commit", "auto_commit_on", "close"]
        );
    }

    #[test]
    fn swallowed_inner_failure_still_prevents_commit() {
        let (manager, journal) = manager();
        let err = manager
            .transaction(|scope| {
                let inner: Result<(), _> = scope.transaction(|_| {
                    Err(SqlFluentError::ExecutionError("constraint".into()))
                });
                assert!(inner.is_err());
                assert!(scope.in_transaction());
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, SqlFluentError::UnitOfWorkFailed(_)));
        assert_eq!(journal.count("commit"), 0);
        assert_eq!(journal.count("rollback"), 2);
        assert_eq!(journal.count("auto_commit_on"), 1);
        assert_eq!(journal.count("close"), 1);
    }

    #[test]
    fn commit_failure_rolls_back() {
        let (manager, journal) = manager();
        journal.fail_commit.set(true);
        let err = manager.transaction(|_| Ok(())).unwrap_err();
        assert!(matches!(err.root_cause(), SqlFluentError::ExecutionError(m) if m == "disk full"));
        assert_eq!(journal.count("rollback"), 1);
        assert_eq!(journal.count("auto_commit_on"), 1);
    }

    #[test]
    fn panic_becomes_error_and_rolls_back() {
        let (manager, journal) = manager();
        let err = manager
            .transaction(|_| -> Result<(), SqlFluentError> { panic!("bad invariant") })
            .unwrap_err();
        assert!(matches!(err.root_cause(), SqlFluentError::Panicked(m) if m == "bad invariant"));
        assert_eq!(journal.count("rollback"), 1);
        assert_eq!(journal.count("close"), 1);
    }

    #[test]
    fn close_failure_is_reported_after_success() {
        let (manager, journal) = manager();
        journal.fail_close.set(true);
        let err = manager.execute(|_| Ok(())).unwrap_err();
        assert!(matches!(err, SqlFluentError::ConnectionError(_)));
    }

    #[test]
    fn close_failure_does_not_mask_earlier_failure() {
        let (manager, journal) = manager();
        journal.fail_close.set(true);
        let err = manager
            .execute(|_| -> Result<(), SqlFluentError> {
                Err(SqlFluentError::ParameterError("missing :id".into()))
            })
            .unwrap_err();
        assert!(matches!(err.root_cause(), SqlFluentError::ParameterError(_)));
    }

    #[test]
    fn acquire_failure_is_a_connection_error() {
        let (manager, journal) = manager();
        journal.fail_acquire.set(true);
        let err = manager.execute(|_| Ok(())).unwrap_err();
        assert!(matches!(err, SqlFluentError::ConnectionError(m) if m.contains("pool exhausted")));
    }

    #[test]
    fn closed_connection_is_reopened() {
        let (manager, journal) = manager();
        manager
            .execute(|scope| {
                scope.connection()?.close()?;
                scope.execute(|scope| scope.query()?.execute_update("update t set a = 1"))
            })
            .unwrap();
        assert_eq!(journal.count("acquire"), 2);
    }

    #[test]
    fn rollback_failure_does_not_mask_the_original_error() {
        let (manager, journal) = manager();
        journal.fail_rollback.set(true);
        let err = manager
            .transaction(|_| -> Result<(), SqlFluentError> {
                Err(SqlFluentError::ParameterError("missing :id".into()))
            })
            .unwrap_err();
        assert!(matches!(err.root_cause(), SqlFluentError::ParameterError(m) if m == "missing :id"));
        assert_eq!(journal.count("rollback"), 0);
        assert_eq!(journal.count("auto_commit_on"), 1);
        assert_eq!(journal.count("close"), 1);
    }

    #[test]
    fn connection_reopened_inside_a_transaction_stays_uncommitted() {
        let (manager, journal) = manager();
        let err = manager
            .transaction(|scope| {
                scope.connection()?.close()?;
                scope.execute(|scope| {
                    assert!(!scope.connection()?.auto_commit()?);
                    scope.query()?.execute_update("update t set a = 1")
                })?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err.root_cause(), SqlFluentError::ExecutionError(_)));
        assert_eq!(journal.count("acquire"), 2);
        assert_eq!(journal.count("auto_commit_off"), 2);
        assert_eq!(journal.count("commit"), 0);
        assert_eq!(journal.count("rollback"), 1);
    }
}
