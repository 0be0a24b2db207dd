//! Database connection pool management.
//!
//! This module provides connection pooling for SQLite using r2d2.
//! It handles pool initialization, connection customization, and running
//! the migrations for the tables tabula itself owns.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tabula_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Per-connection settings applied when the pool opens a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Maximum number of pooled connections.
    pub max_size: u32,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Whether `PRAGMA foreign_keys` is enabled on each connection.
    pub foreign_keys: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 4,
            busy_timeout: Duration::from_millis(5000),
            foreign_keys: true,
        }
    }
}

fn build_pool(manager: SqliteConnectionManager, options: PoolOptions) -> Result<DbPool> {
    let manager = manager.with_init(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        if options.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        Ok(())
    });

    let pool = Pool::builder()
        .max_size(options.max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)?;

    Ok(pool)
}

/// Initialize a new database pool with the given file path.
///
/// This function will:
/// - Create the SQLite database file if it doesn't exist
/// - Apply the busy timeout and foreign key setting on every new connection
/// - Run pending migrations for tabula's own tables
///
/// # Example
///
/// ```no_run
/// use tabula_db::pool::{init_pool, PoolOptions};
///
/// let pool = init_pool("/var/lib/app/data.sqlite", PoolOptions::default()).unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str, options: PoolOptions) -> Result<DbPool> {
    tracing::info!(path = db_path, max_size = options.max_size, "opening database pool");
    build_pool(SqliteConnectionManager::file(db_path), options)
}

/// Initialize an in-memory database pool.
///
/// Each call creates a uniquely-named shared-cache in-memory database so
/// that parallel tests do not interfere with each other, while all
/// connections *within* a single pool still share state.
///
/// # Example
///
/// ```
/// use tabula_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    init_memory_pool_with(PoolOptions::default())
}

/// Initialize an in-memory database pool with explicit options.
pub fn init_memory_pool_with(options: PoolOptions) -> Result<DbPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:tabula_mem_{n}?mode=memory&cache=shared");

    build_pool(SqliteConnectionManager::file(uri), options)
}

/// Get a connection from the pool.
///
/// This is a convenience wrapper around `pool.get()` that converts the
/// r2d2 error into our common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}
