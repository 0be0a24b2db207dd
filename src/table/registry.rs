use std::any::{type_name, Any, TypeId};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::Mutex;
use tabula_common::{Error, Result};

use super::{Entity, TableMetadata};

type Cell = Arc<Mutex<Option<Arc<dyn Any + Send + Sync>>>>;

/// Cache of built [`TableMetadata`], keyed by entity type.
///
/// Entries are built on first request and kept for the registry's lifetime.
/// Each type has its own cell, so building one table never waits on another
/// and concurrent requests for the same type build it once.
#[derive(Default)]
pub struct TableRegistry {
    tables: DashMap<TypeId, Cell>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`Handler::new`](crate::Handler::new).
    pub fn global() -> Arc<TableRegistry> {
        static GLOBAL: OnceLock<Arc<TableRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TableRegistry::new())).clone()
    }

    /// Metadata for `E`, building it from [`Entity::describe`] on first use.
    ///
    /// A failed build is not cached; the next request tries again.
    pub fn get_or_build<E: Entity>(&self) -> Result<Arc<TableMetadata<E>>> {
        let cell = self.tables.entry(TypeId::of::<E>()).or_default().clone();

        let table = {
            let mut slot = cell.lock();
            match slot.as_ref() {
                Some(table) => table.clone(),
                None => {
                    let table: Arc<dyn Any + Send + Sync> = Arc::new(TableMetadata::<E>::build()?);
                    *slot = Some(table.clone());
                    table
                }
            }
        };

        table.downcast::<TableMetadata<E>>().map_err(|_| {
            Error::internal(format!("registry entry for {} has the wrong type", type_name::<E>()))
        })
    }

    /// Whether metadata for `E` has been built.
    pub fn contains<E: Entity>(&self) -> bool {
        self.tables
            .get(&TypeId::of::<E>())
            .is_some_and(|cell| cell.lock().is_some())
    }

    /// Number of built tables.
    pub fn len(&self) -> usize {
        self.tables.iter().filter(|cell| cell.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
