//! The entry point for persisting entities.
//!
//! A [`Handler`] ties a connection pool to a [`TableRegistry`] and a
//! [`CommandObserver`]. It is cheap to clone and every clone shares the
//! same pool, registry and observer.

mod load;
pub mod observer;
mod save;

pub use observer::{CommandObserver, FailureContext, Operation, Subject, TracingObserver};

use std::sync::Arc;

use tabula_common::{Error, Result};
use tabula_db::pool::{init_memory_pool_with, init_pool};
use tabula_db::{Command, DbPool};

use crate::config::HandlerConfig;
use crate::table::{Entity, TableMetadata, TableRegistry};

/// Saves, loads and deletes entities through a connection pool.
#[derive(Clone)]
pub struct Handler {
    pool: DbPool,
    registry: Arc<TableRegistry>,
    observer: Arc<dyn CommandObserver>,
}

impl Handler {
    /// Handler over `pool` using the process-wide registry and the
    /// [`TracingObserver`].
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            registry: TableRegistry::global(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Open the database described by `config`.
    pub fn from_config(config: &HandlerConfig) -> Result<Self> {
        let options = config.database.pool_options();
        let pool = match &config.database.path {
            Some(path) => init_pool(&path.to_string_lossy(), options)?,
            None => init_memory_pool_with(options)?,
        };
        Ok(Self::new(pool))
    }

    /// Use `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<TableRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Send command reports to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn CommandObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    pub fn observer(&self) -> &Arc<dyn CommandObserver> {
        &self.observer
    }

    /// Metadata for `E`, built on first use.
    pub fn table<E: Entity>(&self) -> Result<Arc<TableMetadata<E>>> {
        self.registry.get_or_build::<E>()
    }

    fn report_failure(
        &self,
        error: &Error,
        attempt: &Attempt,
        operation: Operation,
        subject: Subject<'_>,
    ) {
        let context = FailureContext {
            table: attempt.table.as_deref(),
            operation,
            command: attempt.command.as_ref(),
        };
        self.observer.on_exception(error, &context, subject);
    }
}

/// How far an operation got before it failed.
#[derive(Default)]
struct Attempt {
    table: Option<String>,
    command: Option<Command>,
    /// Batch entry being processed.
    index: Option<usize>,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("connections", &self.pool.state().connections)
            .field("tables", &self.registry.len())
            .finish()
    }
}
