use std::any::type_name;
use std::marker::PhantomData;

use tabula_common::{Error, Result, SqlType};

use super::Serializer;

/// Generic conversion between two column types.
///
/// Goes through the storage cell of `value`, coerced to the storage class of
/// `U` (see [`SqlValue::coerce`](tabula_common::SqlValue::coerce)). Any
/// failure is reported as [`Error::ConversionFailed`].
pub fn convert<T: SqlType, U: SqlType>(value: &T) -> Result<U> {
    let failed = |reason: String| Error::conversion(type_name::<T>(), type_name::<U>(), reason);

    let cell = value
        .to_sql()
        .coerce(U::kind())
        .map_err(|e| failed(e.to_string()))?;
    U::from_sql(cell).map_err(|e| failed(e.to_string()))
}

/// Serializer that relies on [`convert`] in both directions.
///
/// Useful for storing a column type in a different storage class, such as
/// numbers in a text column.
pub struct Converting<D, S> {
    _types: PhantomData<fn() -> (D, S)>,
}

impl<D, S> Converting<D, S> {
    pub fn new() -> Self {
        Self {
            _types: PhantomData,
        }
    }
}

impl<D, S> Default for Converting<D, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SqlType, S: SqlType> Serializer for Converting<D, S> {
    type Domain = D;
    type Storage = S;

    fn serialize(&self, value: &D) -> Result<S> {
        convert(value)
    }

    fn deserialize(&self, value: S) -> Result<D> {
        convert(&value)
    }
}
