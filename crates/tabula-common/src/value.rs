//! Storage values and the native column types that map onto them.
//!
//! [`SqlValue`] is the untyped cell that travels between the mapper and the
//! database. [`SqlType`] is implemented by Rust types that have a native
//! storage representation; it is the single place where an untyped cell is
//! checked against the type a field or serializer declared.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Storage class of a non-null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Signed 64-bit integer (also used for booleans).
    Integer,
    /// 64-bit floating point number.
    Real,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::Real => write!(f, "Real"),
            Self::Text => write!(f, "Text"),
            Self::Blob => write!(f, "Blob"),
        }
    }
}

/// A single untyped database cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// Absence of a value.
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Storage class of this value, `None` for [`SqlValue::Null`].
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(ValueKind::Integer),
            Self::Real(_) => Some(ValueKind::Real),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Blob(_) => Some(ValueKind::Blob),
        }
    }

    /// Returns `true` if this is [`SqlValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the storage class, `"Null"` for null.
    pub fn kind_name(&self) -> String {
        match self.kind() {
            Some(kind) => kind.to_string(),
            None => "Null".to_string(),
        }
    }

    /// Convert this value into the given storage class.
    ///
    /// Integers widen to reals, reals narrow to integers only when they have
    /// no fractional part, numbers format to text and text parses back to
    /// numbers. Null stays null.
    pub fn coerce(self, target: ValueKind) -> Result<SqlValue> {
        if self.kind() == Some(target) || self.is_null() {
            return Ok(self);
        }

        let from = self.kind_name();
        let fail = |reason: String| Error::conversion(from.clone(), target.to_string(), reason);

        match (self, target) {
            (Self::Integer(n), ValueKind::Real) => Ok(Self::Real(n as f64)),
            (Self::Real(r), ValueKind::Integer) => {
                if r.fract() != 0.0 || !r.is_finite() {
                    return Err(fail(format!("{r} is not integral")));
                }
                if r < i64::MIN as f64 || r > i64::MAX as f64 {
                    return Err(fail(format!("{r} is out of range")));
                }
                Ok(Self::Integer(r as i64))
            }
            (Self::Integer(n), ValueKind::Text) => Ok(Self::Text(n.to_string())),
            (Self::Real(r), ValueKind::Text) => Ok(Self::Text(r.to_string())),
            (Self::Text(s), ValueKind::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|e| fail(e.to_string())),
            (Self::Text(s), ValueKind::Real) => s
                .trim()
                .parse::<f64>()
                .map(Self::Real)
                .map_err(|e| fail(e.to_string())),
            (Self::Text(s), ValueKind::Blob) => Ok(Self::Blob(s.into_bytes())),
            (Self::Blob(b), ValueKind::Text) => String::from_utf8(b)
                .map(Self::Text)
                .map_err(|e| fail(e.to_string())),
            _ => Err(fail("no conversion between these storage classes".to_string())),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// A Rust type with a native storage representation.
///
/// `from_sql` must reject cells of any storage class other than [`kind`]
/// with [`Error::TypeMismatch`]; null is only accepted when [`nullable`]
/// returns `true`.
///
/// [`kind`]: SqlType::kind
/// [`nullable`]: SqlType::nullable
pub trait SqlType: Sized + Send + Sync + 'static {
    /// Storage class this type is written as.
    fn kind() -> ValueKind;

    /// Whether null is a valid representation of this type.
    fn nullable() -> bool {
        false
    }

    /// Convert to a storage cell.
    fn to_sql(&self) -> SqlValue;

    /// Convert from a storage cell.
    fn from_sql(value: SqlValue) -> Result<Self>;
}

fn mismatch<T: SqlType>(found: &SqlValue) -> Error {
    Error::type_mismatch(
        std::any::type_name::<T>(),
        T::kind().to_string(),
        found.kind_name(),
        "reading column",
    )
}

macro_rules! integer_sql_type {
    ($($ty:ty),*) => {
        $(
            impl SqlType for $ty {
                fn kind() -> ValueKind {
                    ValueKind::Integer
                }

                fn to_sql(&self) -> SqlValue {
                    SqlValue::Integer(i64::from(*self))
                }

                fn from_sql(value: SqlValue) -> Result<Self> {
                    match value {
                        SqlValue::Integer(n) => <$ty>::try_from(n).map_err(|e| {
                            Error::conversion("Integer", stringify!($ty), format!("{n}: {e}"))
                        }),
                        other => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

integer_sql_type!(i8, i16, i32, u8, u16, u32);

impl SqlType for i64 {
    fn kind() -> ValueKind {
        ValueKind::Integer
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(*self)
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Integer(n) => Ok(n),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl SqlType for bool {
    fn kind() -> ValueKind {
        ValueKind::Integer
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(i64::from(*self))
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Integer(n) => Ok(n != 0),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl SqlType for f64 {
    fn kind() -> ValueKind {
        ValueKind::Real
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Real(*self)
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Real(r) => Ok(r),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl SqlType for f32 {
    fn kind() -> ValueKind {
        ValueKind::Real
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Real(f64::from(*self))
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Real(r) => Ok(r as f32),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl SqlType for String {
    fn kind() -> ValueKind {
        ValueKind::Text
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl SqlType for Vec<u8> {
    fn kind() -> ValueKind {
        ValueKind::Blob
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Blob(self.clone())
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Blob(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// UUIDs are stored as hyphenated text; the nil UUID is the default key.
impl SqlType for Uuid {
    fn kind() -> ValueKind {
        ValueKind::Text
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(s) => {
                Uuid::parse_str(&s).map_err(|e| Error::conversion("Text", "Uuid", e.to_string()))
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: SqlType> SqlType for Option<T> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn nullable() -> bool {
        true
    }

    fn to_sql(&self) -> SqlValue {
        match self {
            Some(value) => value.to_sql(),
            None => SqlValue::Null,
        }
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql(other).map(Some),
        }
    }
}
