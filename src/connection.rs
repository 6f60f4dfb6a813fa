use anyhow::Result;
use log::{debug, warn};

use crate::data::Value;

/// What the loader needs from a live database session.
pub trait Connection {
    /// Runs a query and returns the first column of every row as text.
    fn query_column(&mut self, sql: &str) -> Result<Vec<String>>;

    /// Executes a statement with `?` placeholders bound positionally to `params`.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Releases server-side resources. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        (**self).query_column(sql)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        (**self).execute(sql, params)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Owns a connection for one run. Dropping it without [`Session::commit`]
/// rolls back and closes the connection.
pub struct Session<C: Connection> {
    conn: C,
    finished: bool,
}

impl<C: Connection> Session<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            finished: false,
        }
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Commits once and closes. The connection is closed either way; once the
    /// rows are committed a failed close is only logged.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        let committed = self.conn.commit();
        if let Err(err) = self.conn.close() {
            warn!("Closing connection failed: {err:#}");
        }
        committed
    }
}

impl<C: Connection> Drop for Session<C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!("Session ended without commit; rolling back");
        if let Err(err) = self.conn.rollback() {
            warn!("Rollback failed: {err:#}");
        }
        if let Err(err) = self.conn.close() {
            warn!("Closing connection failed: {err:#}");
        }
    }
}
