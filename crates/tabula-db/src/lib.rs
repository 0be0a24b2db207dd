//! Tabula-DB: SQLite connection layer for tabula.
//!
//! This crate provides the database collaborator the mapping engine runs
//! against: rusqlite connections pooled with r2d2, scoped connection
//! contexts, named-parameter commands, and the embedded migrations for the
//! tables tabula itself owns.
//!
//! # Modules
//!
//! - `pool` - Connection pool management
//! - `context` - Scoped connection acquisition and command execution
//! - `command` - SQL text with named parameters
//! - `migrations` - Schema migrations for tabula's own tables
//! - `queries` - Queries against those tables
//!
//! # Example
//!
//! ```
//! use tabula_common::SqlValue;
//! use tabula_db::context::Context;
//! use tabula_db::pool::init_memory_pool;
//!
//! let pool = init_memory_pool().unwrap();
//! let ctx = Context::open(&pool).unwrap();
//!
//! let mut command = ctx.create_command("SELECT :x + 1");
//! command.add("x", SqlValue::Integer(41));
//! let rows = ctx.query(&command).unwrap();
//! assert_eq!(rows[0][0], SqlValue::Integer(42));
//! ```

pub mod command;
pub mod context;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use command::{Command, Parameter};
pub use context::{Context, Rows};
pub use pool::{DbPool, PoolOptions, PooledConnection};
