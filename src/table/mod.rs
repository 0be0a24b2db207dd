//! Table metadata.
//!
//! Every entity type describes its table once through [`Entity::describe`].
//! The resulting [`TableMetadata`] holds the identifier and field accessors,
//! the optional auto-increment source, and the save statements generated
//! for each batch size seen so far.

mod builder;
pub mod query;
mod registry;

pub use builder::TableBuilder;
pub use registry::TableRegistry;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tabula_common::{Error, Result, SqlType};

use crate::accessor::MemberAccessor;
use crate::sequence::AutoIncrementSource;

/// A record type persisted as one row of one table.
///
/// # Example
///
/// ```
/// use tabula::{Entity, TableBuilder};
///
/// #[derive(Debug, Default)]
/// struct Player {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Player {
///     type Key = i64;
///
///     fn id(&self) -> &i64 {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: i64) {
///         self.id = id;
///     }
///
///     fn describe(table: &mut TableBuilder<Self>) {
///         table.name("Players").field("Name", |p| &p.name, |p, v| p.name = v);
///     }
/// }
/// ```
pub trait Entity: fmt::Debug + Send + Sync + Sized + 'static {
    /// Identifier type. Its `Default` value marks an entity that has not
    /// been assigned an identifier yet.
    type Key: SqlType + Clone + PartialEq + Default + fmt::Debug;

    fn id(&self) -> &Self::Key;

    fn set_id(&mut self, id: Self::Key);

    /// Declare the table name, identifier column and fields.
    fn describe(table: &mut TableBuilder<Self>);
}

/// Mapping between an entity type and its table.
pub struct TableMetadata<E: Entity> {
    name: String,
    identifier: Box<dyn MemberAccessor<E>>,
    fields: Vec<Box<dyn MemberAccessor<E>>>,
    auto_increment: Option<Arc<dyn AutoIncrementSource>>,
    save_queries: DashMap<usize, Arc<str>>,
}

impl<E: Entity> TableMetadata<E> {
    /// Evaluate `E`'s descriptor.
    pub fn build() -> Result<Self> {
        let mut builder = TableBuilder::new();
        E::describe(&mut builder);
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> &dyn MemberAccessor<E> {
        self.identifier.as_ref()
    }

    /// Ordinary fields in declaration order.
    pub fn fields(&self) -> &[Box<dyn MemberAccessor<E>>] {
        &self.fields
    }

    pub fn auto_increment(&self) -> Option<&Arc<dyn AutoIncrementSource>> {
        self.auto_increment.as_ref()
    }

    /// The identifier followed by every field.
    pub fn columns(&self) -> impl Iterator<Item = &dyn MemberAccessor<E>> {
        let identifier: &dyn MemberAccessor<E> = self.identifier.as_ref();
        std::iter::once(identifier).chain(
            self.fields
                .iter()
                .map(|f| -> &dyn MemberAccessor<E> { f.as_ref() }),
        )
    }

    /// Look up a column by name, ignoring ASCII case.
    pub fn column(&self, name: &str) -> Option<&dyn MemberAccessor<E>> {
        self.columns().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Single-row save statement.
    pub fn save_query(&self) -> Result<Arc<str>> {
        self.save_query_for(1)
    }

    /// Save statement binding `rows` rows.
    pub fn save_query_for(&self, rows: usize) -> Result<Arc<str>> {
        if let Some(cached) = self.save_queries.get(&rows) {
            return Ok(cached.clone());
        }

        let fields: Vec<&str> = self.fields.iter().map(|f| f.name()).collect();
        let text: Arc<str> =
            query::save_statement(&self.name, self.identifier.name(), &fields, rows)?.into();
        Ok(self.save_queries.entry(rows).or_insert(text).clone())
    }

    /// Statement selecting every column of rows whose `key` column equals `:key`.
    pub fn load_query(&self, key: &str) -> Result<String> {
        let key = self.key_column(key)?;
        let columns: Vec<&str> = self.columns().map(|c| c.name()).collect();
        Ok(query::select_statement(&self.name, &columns, key))
    }

    /// Statement deleting rows whose `key` column equals `:key`.
    pub fn delete_query(&self, key: &str) -> Result<String> {
        let key = self.key_column(key)?;
        Ok(query::delete_statement(&self.name, key))
    }

    fn key_column(&self, key: &str) -> Result<&str> {
        self.column(key).map(|c| c.name()).ok_or_else(|| {
            Error::invalid_input(format!("table {} has no column {key:?}", self.name))
        })
    }
}

impl<E: Entity> fmt::Debug for TableMetadata<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableMetadata")
            .field("name", &self.name)
            .field(
                "columns",
                &self.columns().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("auto_increment", &self.auto_increment.is_some())
            .finish()
    }
}
