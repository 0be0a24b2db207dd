//! Serializers convert between a domain type and a storage type.
//!
//! A [`Serializer`] is the escape hatch for storing values with no native
//! column representation (dates, enums, structured values) in primitive
//! columns. Implementations only deal with typed values; [`encode`] and
//! [`decode`] are the boundary where typed values meet untyped
//! [`SqlValue`] cells, and they perform the runtime checks:
//!
//! - an absent domain value is only accepted when the serializer declares
//!   [`can_serialize_null`](Serializer::can_serialize_null)
//! - the produced cell must have the storage class of
//!   [`Serializer::Storage`], or be null when null is allowed
//! - an incoming cell must have that storage class, or be null when the
//!   serializer declares [`can_deserialize_null`](Serializer::can_deserialize_null)
//!
//! Violations fail with [`Error::TypeMismatch`].

mod builtin;
mod convert;

pub use builtin::{
    BincodeSerializer, DateTimeSerializer, DisplaySerializer, JsonSerializer, NullAsDefault,
    UuidBytesSerializer,
};
pub use convert::{convert, Converting};

use async_trait::async_trait;
use tabula_common::{Error, Result, SqlType, SqlValue};

/// Bidirectional converter between [`Domain`](Serializer::Domain) values and
/// [`Storage`](Serializer::Storage) values.
///
/// Serializers hold no per-call state, so one instance is shared by every
/// entity of a table.
#[async_trait]
pub trait Serializer: Send + Sync + 'static {
    /// The type held by the entity field.
    type Domain: Send + Sync + 'static;
    /// The type written to the column.
    type Storage: SqlType;

    /// Convert a domain value into its storage form.
    fn serialize(&self, value: &Self::Domain) -> Result<Self::Storage>;

    /// Convert a storage value back into the domain form.
    fn deserialize(&self, value: Self::Storage) -> Result<Self::Domain>;

    /// Whether an absent domain value may be written.
    fn can_serialize_null(&self) -> bool {
        false
    }

    /// Whether a null cell may be read.
    fn can_deserialize_null(&self) -> bool {
        false
    }

    /// Storage form of an absent domain value; `None` writes null.
    fn serialize_null(&self) -> Option<Self::Storage> {
        None
    }

    /// Domain value produced from a null cell; `None` leaves the field absent.
    fn deserialize_null(&self) -> Option<Self::Domain> {
        None
    }

    async fn serialize_async(&self, value: &Self::Domain) -> Result<Self::Storage> {
        self.serialize(value)
    }

    async fn deserialize_async(&self, value: Self::Storage) -> Result<Self::Domain> {
        self.deserialize(value)
    }

    /// Name used in error messages.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Encode an optional domain value into a checked storage cell.
pub fn encode<S: Serializer>(serializer: &S, value: Option<&S::Domain>) -> Result<SqlValue> {
    let stored = match value {
        Some(value) => Some(serializer.serialize(value)?),
        None if serializer.can_serialize_null() => serializer.serialize_null(),
        None => return Err(absent_domain(serializer)),
    };
    verify_serialized(serializer, stored)
}

/// Async form of [`encode`].
pub async fn encode_async<S: Serializer>(
    serializer: &S,
    value: Option<&S::Domain>,
) -> Result<SqlValue> {
    let stored = match value {
        Some(value) => Some(serializer.serialize_async(value).await?),
        None if serializer.can_serialize_null() => serializer.serialize_null(),
        None => return Err(absent_domain(serializer)),
    };
    verify_serialized(serializer, stored)
}

/// Decode a storage cell into a domain value.
///
/// Returns `Ok(None)` only for an accepted null whose
/// [`deserialize_null`](Serializer::deserialize_null) is absent.
pub fn decode<S: Serializer>(serializer: &S, value: SqlValue) -> Result<Option<S::Domain>> {
    if value.is_null() && serializer.can_deserialize_null() {
        return Ok(serializer.deserialize_null());
    }
    let storage = read_storage(serializer, value)?;
    serializer.deserialize(storage).map(Some)
}

/// Async form of [`decode`].
pub async fn decode_async<S: Serializer>(
    serializer: &S,
    value: SqlValue,
) -> Result<Option<S::Domain>> {
    if value.is_null() && serializer.can_deserialize_null() {
        return Ok(serializer.deserialize_null());
    }
    let storage = read_storage(serializer, value)?;
    serializer.deserialize_async(storage).await.map(Some)
}

fn absent_domain<S: Serializer>(serializer: &S) -> Error {
    Error::type_mismatch(
        serializer.name(),
        std::any::type_name::<S::Domain>(),
        "absent value",
        "serializing",
    )
}

fn verify_serialized<S: Serializer>(serializer: &S, stored: Option<S::Storage>) -> Result<SqlValue> {
    let value = stored.map(|s| s.to_sql()).unwrap_or(SqlValue::Null);
    let expected = <S::Storage as SqlType>::kind();

    match value.kind() {
        Some(kind) if kind == expected => Ok(value),
        None if <S::Storage as SqlType>::nullable() || serializer.can_serialize_null() => Ok(value),
        _ => Err(Error::type_mismatch(
            serializer.name(),
            expected.to_string(),
            value.kind_name(),
            "returning value after serialization",
        )),
    }
}

fn read_storage<S: Serializer>(serializer: &S, value: SqlValue) -> Result<S::Storage> {
    <S::Storage as SqlType>::from_sql(value).map_err(|e| relabel(e, serializer.name(), "deserializing"))
}

/// Point a [`Error::TypeMismatch`] at a different context and stage.
///
/// Other errors pass through unchanged.
pub(crate) fn relabel(err: Error, context: &str, stage: &'static str) -> Error {
    match err {
        Error::TypeMismatch {
            expected, found, ..
        } => Error::TypeMismatch {
            context: context.to_string(),
            expected,
            found,
            stage,
        },
        other => other,
    }
}
