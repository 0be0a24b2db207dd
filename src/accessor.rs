//! Per-field read and write access.
//!
//! A [`MemberAccessor`] maps one entity field onto one column. [`Direct`]
//! handles fields whose type has a native storage representation;
//! [`Serialized`] routes the value through a [`Serializer`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tabula_common::{Error, Result, SqlType, SqlValue, ValueKind};
use tabula_db::Parameter;

use crate::serialization::{decode, decode_async, encode, encode_async, relabel, Serializer};
use crate::table::Entity;

/// Name of the placeholder for column `name` in row `row` of a save query.
///
/// Row 0 uses the bare name; later rows append their zero-based index.
pub fn parameter_name(name: &str, row: usize) -> String {
    if row == 0 {
        name.to_string()
    } else {
        format!("{name}{row}")
    }
}

/// Read and write access to one field of `E`.
#[async_trait]
pub trait MemberAccessor<E: Entity>: Send + Sync {
    /// Column name, also used as the parameter base name.
    fn name(&self) -> &str;

    /// Storage class written to the column.
    fn storage_kind(&self) -> ValueKind;

    /// Whether the value passes through a serializer.
    fn is_serialized(&self) -> bool {
        false
    }

    /// Read the field as a storage cell.
    fn get_value(&self, entity: &E) -> Result<SqlValue>;

    /// Assign a storage cell to the field.
    fn set_value(&self, entity: &mut E, value: SqlValue) -> Result<()>;

    async fn get_value_async(&self, entity: &E) -> Result<SqlValue> {
        self.get_value(entity)
    }

    async fn set_value_async(&self, entity: &mut E, value: SqlValue) -> Result<()> {
        self.set_value(entity, value)
    }

    /// The field's value bound to its column name.
    fn get_parameter(&self, entity: &E) -> Result<Parameter> {
        Ok(Parameter::new(self.name(), self.get_value(entity)?))
    }

    async fn get_parameter_async(&self, entity: &E) -> Result<Parameter> {
        Ok(Parameter::new(self.name(), self.get_value_async(entity).await?))
    }
}

/// Accessor for a field with a native column type.
pub struct Direct<E, F> {
    name: String,
    get: fn(&E) -> &F,
    set: fn(&mut E, F),
}

impl<E, F> Direct<E, F> {
    pub fn new<S: Into<String>>(name: S, get: fn(&E) -> &F, set: fn(&mut E, F)) -> Self {
        Self {
            name: name.into(),
            get,
            set,
        }
    }
}

impl<E: Entity, F: SqlType> MemberAccessor<E> for Direct<E, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_kind(&self) -> ValueKind {
        F::kind()
    }

    fn get_value(&self, entity: &E) -> Result<SqlValue> {
        Ok((self.get)(entity).to_sql())
    }

    fn set_value(&self, entity: &mut E, value: SqlValue) -> Result<()> {
        let value = F::from_sql(value).map_err(|e| relabel(e, &self.name, "assigning field"))?;
        (self.set)(entity, value);
        Ok(())
    }
}

/// Where a serialized field lives on the entity.
pub enum Slot<E, D> {
    /// The field always holds a value.
    Required {
        get: fn(&E) -> &D,
        set: fn(&mut E, D),
    },
    /// The field may be absent; absence goes through the serializer's null
    /// handling.
    Optional {
        get: fn(&E) -> Option<&D>,
        set: fn(&mut E, Option<D>),
    },
}

/// Accessor that converts the field through a [`Serializer`].
pub struct Serialized<E, S: Serializer> {
    name: String,
    slot: Slot<E, S::Domain>,
    serializer: Arc<S>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S: Serializer> Serialized<E, S> {
    pub fn new<N: Into<String>>(name: N, slot: Slot<E, S::Domain>, serializer: Arc<S>) -> Self {
        Self {
            name: name.into(),
            slot,
            serializer,
            _entity: PhantomData,
        }
    }

    /// The serializer shared by every entity of the table.
    pub fn serializer(&self) -> &Arc<S> {
        &self.serializer
    }

    fn read<'e>(&self, entity: &'e E) -> Option<&'e S::Domain> {
        match &self.slot {
            Slot::Required { get, .. } => Some(get(entity)),
            Slot::Optional { get, .. } => get(entity),
        }
    }

    fn assign(&self, entity: &mut E, value: Option<S::Domain>) -> Result<()> {
        match (&self.slot, value) {
            (Slot::Required { set, .. }, Some(value)) => {
                set(entity, value);
                Ok(())
            }
            (Slot::Required { .. }, None) => Err(Error::type_mismatch(
                self.name.clone(),
                std::any::type_name::<S::Domain>(),
                "absent value",
                "assigning field",
            )),
            (Slot::Optional { set, .. }, value) => {
                set(entity, value);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<E: Entity, S: Serializer> MemberAccessor<E> for Serialized<E, S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_kind(&self) -> ValueKind {
        <S::Storage as SqlType>::kind()
    }

    fn is_serialized(&self) -> bool {
        true
    }

    fn get_value(&self, entity: &E) -> Result<SqlValue> {
        encode(self.serializer.as_ref(), self.read(entity))
    }

    fn set_value(&self, entity: &mut E, value: SqlValue) -> Result<()> {
        let value = decode(self.serializer.as_ref(), value)?;
        self.assign(entity, value)
    }

    async fn get_value_async(&self, entity: &E) -> Result<SqlValue> {
        encode_async(self.serializer.as_ref(), self.read(entity)).await
    }

    async fn set_value_async(&self, entity: &mut E, value: SqlValue) -> Result<()> {
        let value = decode_async(self.serializer.as_ref(), value).await?;
        self.assign(entity, value)
    }
}
