//! Tabula-Common: shared types used across the tabula workspace.
//!
//! - **Error Handling**: the common [`Error`] type and [`Result`] alias
//! - **Storage Values**: [`SqlValue`] cells, their [`ValueKind`], and the
//!   [`SqlType`] trait for Rust types with a native column representation
//!
//! # Examples
//!
//! ```
//! use tabula_common::{Error, SqlType, SqlValue, ValueKind};
//!
//! assert_eq!(42i64.to_sql(), SqlValue::Integer(42));
//! assert_eq!(<String as SqlType>::kind(), ValueKind::Text);
//!
//! let err = i64::from_sql(SqlValue::Text("42".into())).unwrap_err();
//! assert!(matches!(err, Error::TypeMismatch { .. }));
//! ```

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::{SqlType, SqlValue, ValueKind};
