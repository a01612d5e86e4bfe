use std::fmt;

use rusqlite::params_from_iter;

use crate::connection::DbConnection;
use crate::dialect::SqlDialect;
use crate::error::SqlFluentError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::params::Params;
use super::query::build_result_set;

/// `SQLite` connection with JDBC-style auto-commit handling.
///
/// With auto-commit off, a `BEGIN` is issued lazily before the next
/// statement, so every statement between two commits runs in one
/// transaction.
pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
    auto_commit: bool,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Some(conn),
            auto_commit: true,
        }
    }

    fn handle(&self) -> Result<&rusqlite::Connection, SqlFluentError> {
        self.conn
            .as_ref()
            .ok_or_else(|| SqlFluentError::ConnectionError("SQLite connection is closed".into()))
    }

    /// Handle for the next statement, opening a transaction if auto-commit is off.
    fn statement_handle(&self) -> Result<&rusqlite::Connection, SqlFluentError> {
        let conn = self.handle()?;
        if !self.auto_commit && conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        Ok(conn)
    }

    fn end_transaction(&self, verb: &str) -> Result<(), SqlFluentError> {
        let conn = self.handle()?;
        if !conn.is_autocommit() {
            conn.execute_batch(verb)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("open", &self.conn.is_some())
            .field("auto_commit", &self.auto_commit)
            .finish()
    }
}

impl DbConnection for SqliteConnection {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn auto_commit(&self) -> Result<bool, SqlFluentError> {
        self.handle()?;
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), SqlFluentError> {
        if auto_commit && !self.auto_commit {
            self.end_transaction("COMMIT")?;
        } else {
            self.handle()?;
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SqlFluentError> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), SqlFluentError> {
        self.end_transaction("ROLLBACK")
    }

    fn close(&mut self) -> Result<(), SqlFluentError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| {
                SqlFluentError::ConnectionError(format!("failed to close SQLite connection: {e}"))
            }),
            None => Ok(()),
        }
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<bool, SqlFluentError> {
        let conn = self.statement_handle()?;
        let mut stmt = match conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(rusqlite::Error::MultipleStatement) if params.is_empty() => {
                conn.execute_batch(sql)?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let converted = Params::convert(params);
        if stmt.column_count() > 0 {
            let mut rows = stmt.query(params_from_iter(converted.as_values().iter()))?;
            rows.next()?;
            Ok(true)
        } else {
            stmt.execute(params_from_iter(converted.as_values().iter()))?;
            Ok(false)
        }
    }

    fn execute_update(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, SqlFluentError> {
        let conn = self.statement_handle()?;
        let converted = Params::convert(params);
        Ok(conn.execute(sql, params_from_iter(converted.as_values().iter()))?)
    }

    fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFluentError> {
        let conn = self.statement_handle()?;
        let converted = Params::convert(params);
        let mut stmt = conn.prepare(sql)?;
        build_result_set(&mut stmt, converted.as_values())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), SqlFluentError> {
        let conn = self.statement_handle()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> SqliteConnection {
        SqliteConnection::new(rusqlite::Connection::open_in_memory().expect("open"))
    }

    #[test]
    fn auto_commit_off_begins_lazily_and_rolls_back() {
        let mut conn = memory();
        conn.execute_batch("create table t (id integer)").unwrap();
        conn.set_auto_commit(false).unwrap();
        assert!(!conn.auto_commit().unwrap());
        conn.execute_update("insert into t values (?1)", &[RowValues::Int(1)])
            .unwrap();
        conn.rollback().unwrap();
        let rs = conn.query("select count(*) from t", &[]).unwrap();
        assert_eq!(rs.results[0][0], RowValues::Int(0));
        conn.set_auto_commit(true).unwrap();
    }

    #[test]
    fn enabling_auto_commit_commits_open_work() {
        let mut conn = memory();
        conn.execute_batch("create table t (id integer)").unwrap();
        conn.set_auto_commit(false).unwrap();
        conn.execute_update("insert into t values (1)", &[]).unwrap();
        conn.set_auto_commit(true).unwrap();
        conn.rollback().unwrap();
        let rs = conn.query("select count(*) from t", &[]).unwrap();
        assert_eq!(rs.results[0][0], RowValues::Int(1));
    }

    #[test]
    fn execute_reports_result_sets_and_runs_batches() {
        let mut conn = memory();
        assert!(!conn
            .execute("create table t (id integer); insert into t values (1);", &[])
            .unwrap());
        assert!(conn.execute("select * from t", &[]).unwrap());
        assert!(!conn.execute("delete from t where id = ?1", &[RowValues::Int(1)]).unwrap());
    }

    #[test]
    fn closed_connection_rejects_work() {
        let mut conn = memory();
        conn.close().unwrap();
        assert!(conn.is_closed());
        conn.close().unwrap();
        assert!(matches!(
            conn.execute_batch("select 1"),
            Err(SqlFluentError::ConnectionError(_))
        ));
    }
}
