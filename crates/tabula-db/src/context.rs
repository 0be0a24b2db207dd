//! Scoped connection acquisition and command execution.
//!
//! A [`Context`] holds one pooled connection for the duration of an
//! operation. The connection goes back to the pool when the context is
//! dropped, whichever way the operation exits.
//!
//! The `_async` methods run the blocking SQLite call on tokio's blocking
//! thread pool so the calling task is never blocked on the database.

use rusqlite::Connection;
use tabula_common::{Error, Result, SqlValue};

use crate::command::{from_driver, Command};
use crate::pool::{get_conn, DbPool, PooledConnection};

/// Rows returned by a query, one `Vec` of cells per row.
pub type Rows = Vec<Vec<SqlValue>>;

/// One pooled connection, released on drop.
pub struct Context {
    conn: Option<PooledConnection>,
}

impl Context {
    /// Acquire a connection from the pool, blocking until one is available.
    pub fn open(pool: &DbPool) -> Result<Self> {
        Ok(Self {
            conn: Some(get_conn(pool)?),
        })
    }

    /// Acquire a connection without blocking the calling task.
    pub async fn open_async(pool: &DbPool) -> Result<Self> {
        let pool = pool.clone();
        let conn = tokio::task::spawn_blocking(move || get_conn(&pool))
            .await
            .map_err(|e| Error::database(format!("spawn_blocking join error: {e}")))??;
        Ok(Self { conn: Some(conn) })
    }

    /// Create a command bound to nothing yet.
    pub fn create_command<S: Into<std::sync::Arc<str>>>(&self, text: S) -> Command {
        Command::new(text)
    }

    /// The underlying connection.
    pub fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_deref()
            .ok_or_else(|| Error::internal("connection was lost by an interrupted operation"))
    }

    /// Execute a statement, returning the number of rows it changed.
    pub fn execute(&self, command: &Command) -> Result<usize> {
        execute_on(self.connection()?, command)
    }

    /// Run a query, returning every row.
    pub fn query(&self, command: &Command) -> Result<Rows> {
        query_on(self.connection()?, command)
    }

    /// Async form of [`execute`](Self::execute).
    pub async fn execute_async(&mut self, command: &Command) -> Result<usize> {
        let command = command.clone();
        self.with_connection_async(move |conn| execute_on(conn, &command))
            .await
    }

    /// Async form of [`query`](Self::query).
    pub async fn query_async(&mut self, command: &Command) -> Result<Rows> {
        let command = command.clone();
        self.with_connection_async(move |conn| query_on(conn, &command))
            .await
    }

    /// Run `f` against the connection on the blocking thread pool.
    pub async fn with_connection_async<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| Error::internal("connection was lost by an interrupted operation"))?;

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&conn);
            (conn, result)
        })
        .await
        .map_err(|e| Error::database(format!("spawn_blocking join error: {e}")))?;

        self.conn = Some(conn);
        result
    }
}

fn execute_on(conn: &Connection, command: &Command) -> Result<usize> {
    let mut stmt = conn
        .prepare_cached(command.text())
        .map_err(Error::execution)?;
    command.bind(&mut stmt)?;
    let affected = stmt.raw_execute().map_err(Error::execution)?;
    tracing::trace!(sql = command.text(), affected, "executed command");
    Ok(affected)
}

fn query_on(conn: &Connection, command: &Command) -> Result<Rows> {
    let mut stmt = conn
        .prepare_cached(command.text())
        .map_err(Error::execution)?;
    command.bind(&mut stmt)?;

    let columns = stmt.column_count();
    let mut rows = stmt.raw_query();
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(Error::execution)? {
        let mut cells = Vec::with_capacity(columns);
        for i in 0..columns {
            cells.push(from_driver(row.get_ref(i).map_err(Error::execution)?)?);
        }
        out.push(cells);
    }
    Ok(out)
}
