use crate::connection::{ConnectionProvider, DbConnection};
use crate::error::SqlFluentError;

use super::Scope;

/// Book-keeping for the transaction open on a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TxState {
    /// Number of `transaction` calls currently running.
    pub(super) depth: usize,
    /// Auto-commit mode to restore once the outermost call finishes.
    pub(super) previous_auto_commit: bool,
    /// Set once any level failed; the outermost call must not commit.
    pub(super) rollback_only: bool,
}

impl<P: ConnectionProvider> Scope<'_, P> {
    /// Join the running transaction, or start one with auto-commit off.
    pub(super) fn begin_transaction(&mut self) -> Result<(), SqlFluentError> {
        if let Some(tx) = self.tx.as_mut() {
            tx.depth += 1;
            return Ok(());
        }

        let conn = self.connection()?;
        let previous_auto_commit = conn.auto_commit()?;
        conn.set_auto_commit(false)?;
        tracing::debug!(previous_auto_commit, "transaction started");
        self.tx = Some(TxState {
            depth: 1,
            previous_auto_commit,
            rollback_only: false,
        });
        Ok(())
    }

    /// Leave a transaction level whose unit of work succeeded.
    ///
    /// Only the outermost level commits. A rollback-only transaction is
    /// rolled back instead and reported as a failure.
    pub(super) fn finish_transaction(&mut self) -> Result<(), SqlFluentError> {
        let Some(tx) = self.tx.as_mut() else {
            return Ok(());
        };
        tx.depth = tx.depth.saturating_sub(1);
        if tx.depth > 0 {
            return Ok(());
        }
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        if tx.rollback_only {
            self.rollback_quietly();
            self.restore_auto_commit_quietly(tx.previous_auto_commit);
            return Err(SqlFluentError::ExecutionError(
                "transaction was rolled back after a nested unit of work failed".into(),
            ));
        }

        let committed = self.connection().and_then(DbConnection::commit);
        if let Err(err) = committed {
            self.rollback_quietly();
            self.restore_auto_commit_quietly(tx.previous_auto_commit);
            return Err(err);
        }
        tracing::debug!("transaction committed");

        self.connection()?.set_auto_commit(tx.previous_auto_commit)
    }

    /// Leave a transaction level whose unit of work failed.
    ///
    /// Rolls back right away and poisons the outer levels.
    pub(super) fn abort_transaction(&mut self) {
        self.rollback_quietly();
        let Some(tx) = self.tx.as_mut() else {
            return;
        };
        tx.rollback_only = true;
        tx.depth = tx.depth.saturating_sub(1);
        if tx.depth > 0 {
            return;
        }
        if let Some(tx) = self.tx.take() {
            self.restore_auto_commit_quietly(tx.previous_auto_commit);
        }
    }

    fn rollback_quietly(&mut self) {
        let Ok(conn) = self.connection() else {
            return;
        };
        match conn.rollback() {
            Ok(()) => tracing::debug!("transaction rolled back"),
            Err(err) => tracing::warn!(error = %err, "rollback failed"),
        }
    }

    fn restore_auto_commit_quietly(&mut self, auto_commit: bool) {
        let Ok(conn) = self.connection() else {
            return;
        };
        if let Err(err) = conn.set_auto_commit(auto_commit) {
            tracing::warn!(error = %err, "failed to restore auto-commit mode");
        }
    }
}
