use std::any::type_name;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tabula_common::{Error, Result};
use uuid::Uuid;

use super::Serializer;

/// Stores any serde value as JSON text.
pub struct JsonSerializer<T> {
    _type: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self { _type: PhantomData }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Serializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Domain = T;
    type Storage = String;

    fn serialize(&self, value: &T) -> Result<String> {
        serde_json::to_string(value)
            .map_err(|e| Error::conversion(type_name::<T>(), "JSON text", e.to_string()))
    }

    fn deserialize(&self, value: String) -> Result<T> {
        serde_json::from_str(&value)
            .map_err(|e| Error::conversion("JSON text", type_name::<T>(), e.to_string()))
    }
}

/// Stores any serde value as a compact bincode blob.
pub struct BincodeSerializer<T> {
    _type: PhantomData<fn() -> T>,
}

impl<T> BincodeSerializer<T> {
    pub fn new() -> Self {
        Self { _type: PhantomData }
    }
}

impl<T> Default for BincodeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Serializer for BincodeSerializer<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Domain = T;
    type Storage = Vec<u8>;

    fn serialize(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| Error::conversion(type_name::<T>(), "bincode blob", e.to_string()))
    }

    fn deserialize(&self, value: Vec<u8>) -> Result<T> {
        bincode::deserialize(&value)
            .map_err(|e| Error::conversion("bincode blob", type_name::<T>(), e.to_string()))
    }
}

/// Stores UTC timestamps as RFC 3339 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeSerializer;

impl Serializer for DateTimeSerializer {
    type Domain = DateTime<Utc>;
    type Storage = String;

    fn serialize(&self, value: &DateTime<Utc>) -> Result<String> {
        Ok(value.to_rfc3339())
    }

    fn deserialize(&self, value: String) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::conversion("Text", "DateTime<Utc>", format!("{value}: {e}")))
    }
}

/// Stores UUIDs as their 16 raw bytes instead of hyphenated text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidBytesSerializer;

impl Serializer for UuidBytesSerializer {
    type Domain = Uuid;
    type Storage = Vec<u8>;

    fn serialize(&self, value: &Uuid) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn deserialize(&self, value: Vec<u8>) -> Result<Uuid> {
        Uuid::from_slice(&value).map_err(|e| Error::conversion("Blob", "Uuid", e.to_string()))
    }
}

/// Stores any `Display + FromStr` type (typically an enum) as text.
pub struct DisplaySerializer<T> {
    _type: PhantomData<fn() -> T>,
}

impl<T> DisplaySerializer<T> {
    pub fn new() -> Self {
        Self { _type: PhantomData }
    }
}

impl<T> Default for DisplaySerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Serializer for DisplaySerializer<T>
where
    T: Display + FromStr + Send + Sync + 'static,
    T::Err: Display,
{
    type Domain = T;
    type Storage = String;

    fn serialize(&self, value: &T) -> Result<String> {
        Ok(value.to_string())
    }

    fn deserialize(&self, value: String) -> Result<T> {
        value
            .parse()
            .map_err(|e: T::Err| Error::conversion("Text", type_name::<T>(), format!("{value}: {e}")))
    }
}

/// Wraps a serializer so absent values are written as null and null cells
/// read back as the domain type's default.
pub struct NullAsDefault<S> {
    inner: S,
}

impl<S> NullAsDefault<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> Serializer for NullAsDefault<S>
where
    S: Serializer,
    S::Domain: Default,
{
    type Domain = S::Domain;
    type Storage = S::Storage;

    fn serialize(&self, value: &S::Domain) -> Result<S::Storage> {
        self.inner.serialize(value)
    }

    fn deserialize(&self, value: S::Storage) -> Result<S::Domain> {
        self.inner.deserialize(value)
    }

    fn can_serialize_null(&self) -> bool {
        true
    }

    fn can_deserialize_null(&self) -> bool {
        true
    }

    fn deserialize_null(&self) -> Option<S::Domain> {
        Some(S::Domain::default())
    }

    async fn serialize_async(&self, value: &S::Domain) -> Result<S::Storage> {
        self.inner.serialize_async(value).await
    }

    async fn deserialize_async(&self, value: S::Storage) -> Result<S::Domain> {
        self.inner.deserialize_async(value).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
