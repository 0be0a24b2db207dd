use std::any::type_name;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tabula_common::{Error, Result, SqlType, ValueKind};

use super::query::is_parameter_name;
use super::{Entity, TableMetadata};
use crate::accessor::{Direct, MemberAccessor, Serialized, Slot};
use crate::sequence::AutoIncrementSource;
use crate::serialization::Serializer;

/// Declarative description of an entity's table.
///
/// Filled in by [`Entity::describe`]. Fields are stored in the order they are
/// declared, which is also the column and parameter order of every
/// generated statement.
pub struct TableBuilder<E: Entity> {
    name: String,
    identifier: String,
    fields: Vec<Box<dyn MemberAccessor<E>>>,
    auto_increment: Option<Arc<dyn AutoIncrementSource>>,
}

impl<E: Entity> TableBuilder<E> {
    pub(crate) fn new() -> Self {
        Self {
            name: default_table_name::<E>(),
            identifier: "Id".to_string(),
            fields: Vec::new(),
            auto_increment: None,
        }
    }

    /// Set the table name. Defaults to the entity's type name.
    pub fn name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Set the identifier column name. Defaults to `Id`.
    pub fn identifier<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.identifier = name.into();
        self
    }

    /// Map a field with a native column type.
    pub fn field<F: SqlType>(&mut self, name: &str, get: fn(&E) -> &F, set: fn(&mut E, F)) -> &mut Self {
        self.accessor(Direct::new(name, get, set))
    }

    /// Map a field through `serializer`.
    pub fn serialized<S: Serializer>(
        &mut self,
        name: &str,
        get: fn(&E) -> &S::Domain,
        set: fn(&mut E, S::Domain),
        serializer: S,
    ) -> &mut Self {
        self.accessor(Serialized::new(name, Slot::Required { get, set }, Arc::new(serializer)))
    }

    /// Map an optional field through `serializer`.
    ///
    /// Absent values rely on the serializer's null handling.
    pub fn serialized_optional<S: Serializer>(
        &mut self,
        name: &str,
        get: fn(&E) -> Option<&S::Domain>,
        set: fn(&mut E, Option<S::Domain>),
        serializer: S,
    ) -> &mut Self {
        self.accessor(Serialized::new(name, Slot::Optional { get, set }, Arc::new(serializer)))
    }

    /// Map a field with a hand-written accessor.
    pub fn accessor<A: MemberAccessor<E> + 'static>(&mut self, accessor: A) -> &mut Self {
        self.fields.push(Box::new(accessor));
        self
    }

    /// Allocate identifiers for new entities from `source`.
    pub fn auto_increment<S: AutoIncrementSource>(&mut self, source: S) -> &mut Self {
        self.auto_increment_shared(Arc::new(source))
    }

    /// Like [`auto_increment`](Self::auto_increment) for a source that is
    /// shared with other tables or kept by the caller.
    pub fn auto_increment_shared(&mut self, source: Arc<dyn AutoIncrementSource>) -> &mut Self {
        self.auto_increment = Some(source);
        self
    }

    pub(crate) fn build(self) -> Result<TableMetadata<E>> {
        if self.name.is_empty() {
            return Err(Error::invalid_input(format!(
                "table name for {} is empty",
                type_name::<E>()
            )));
        }

        let mut seen = HashSet::new();
        let columns = std::iter::once(self.identifier.as_str())
            .chain(self.fields.iter().map(|f| f.name()));
        for column in columns {
            if !is_parameter_name(column) {
                return Err(Error::invalid_input(format!(
                    "column {column:?} of table {} is not a plain identifier",
                    self.name
                )));
            }
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err(Error::invalid_input(format!(
                    "column {column} is declared twice in table {}",
                    self.name
                )));
            }
        }

        if self.auto_increment.is_some() && E::Key::kind() != ValueKind::Integer {
            return Err(Error::invalid_input(format!(
                "table {} uses auto-increment but its key is stored as {}",
                self.name,
                E::Key::kind()
            )));
        }

        let identifier: Box<dyn MemberAccessor<E>> =
            Box::new(Direct::<E, E::Key>::new(self.identifier, E::id, E::set_id));

        tracing::debug!(
            table = %self.name,
            fields = self.fields.len(),
            auto_increment = self.auto_increment.is_some(),
            "built table metadata"
        );

        Ok(TableMetadata {
            name: self.name,
            identifier,
            fields: self.fields,
            auto_increment: self.auto_increment,
            save_queries: DashMap::new(),
        })
    }
}

/// Last path segment of the type name, without generic arguments.
fn default_table_name<E>() -> String {
    let full = type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
