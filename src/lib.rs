//! Tabula - typed entity mapping for SQLite
//!
//! Entities describe their table once through [`Entity::describe`]; a
//! [`Handler`] then saves them with generated upsert statements, allocates
//! identifiers for auto-increment tables, routes non-native field types
//! through [`Serializer`]s, and loads or deletes them by key.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tabula::{Entity, Handler, MemorySequence, TableBuilder, TableRegistry};
//! use tabula_db::pool::init_memory_pool;
//!
//! #[derive(Debug, Default)]
//! struct Player {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Entity for Player {
//!     type Key = i64;
//!
//!     fn id(&self) -> &i64 {
//!         &self.id
//!     }
//!
//!     fn set_id(&mut self, id: i64) {
//!         self.id = id;
//!     }
//!
//!     fn describe(table: &mut TableBuilder<Self>) {
//!         table
//!             .name("Players")
//!             .field("Name", |p| &p.name, |p, v| p.name = v)
//!             .auto_increment(MemorySequence::starting_at(5));
//!     }
//! }
//!
//! let pool = init_memory_pool().unwrap();
//! pool.get()
//!     .unwrap()
//!     .execute_batch("CREATE TABLE Players (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)")
//!     .unwrap();
//!
//! let handler = Handler::new(pool).with_registry(Arc::new(TableRegistry::new()));
//! let mut players = vec![
//!     Player { name: "a".into(), ..Default::default() },
//!     Player { name: "b".into(), ..Default::default() },
//! ];
//! assert_eq!(handler.save_many(&mut players).unwrap(), 2);
//! assert_eq!(players[1].id, 6);
//!
//! let loaded: Player = handler.load_one(&6).unwrap().unwrap();
//! assert_eq!(loaded.name, "b");
//! ```

pub mod accessor;
pub mod config;
pub mod handler;
pub mod sequence;
pub mod serialization;
pub mod table;

pub use accessor::{Direct, MemberAccessor, Serialized, Slot};
pub use handler::{CommandObserver, FailureContext, Handler, Operation, Subject, TracingObserver};
pub use sequence::{AutoIncrementSource, MemorySequence, TableSequence};
pub use serialization::Serializer;
pub use table::{Entity, TableBuilder, TableMetadata, TableRegistry};
pub use tabula_common::{Error, Result, SqlType, SqlValue, ValueKind};
