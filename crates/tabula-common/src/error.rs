//! Common error types used throughout tabula.
//!
//! Every fallible operation in the workspace returns [`Result`]. The variants
//! separate mapping-configuration defects ([`Error::TypeMismatch`]), failed
//! value conversions ([`Error::ConversionFailed`]) and failures reported by
//! the database itself ([`Error::Execution`]), so callers can branch on the
//! kind of failure with a plain `match`.

/// Common error type for tabula.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value crossing the serialization boundary had the wrong shape.
    #[error("Type mismatch in {context} while {stage}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The serializer, accessor or column that rejected the value.
        context: String,
        /// The type or storage kind that was declared.
        expected: String,
        /// The type or storage kind that was observed.
        found: String,
        /// What was being done when the mismatch was detected.
        stage: &'static str,
    },

    /// A generic conversion between two types was not possible for a value.
    #[error("Cannot convert {from} to {to}: {reason}")]
    ConversionFailed {
        /// Source type or storage kind.
        from: String,
        /// Target type or storage kind.
        to: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// Executing a command against the database failed.
    #[error("Execution error: {source}")]
    Execution {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new TypeMismatch error.
    pub fn type_mismatch<C, E, F>(context: C, expected: E, found: F, stage: &'static str) -> Self
    where
        C: Into<String>,
        E: Into<String>,
        F: Into<String>,
    {
        Self::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found: found.into(),
            stage,
        }
    }

    /// Create a new ConversionFailed error.
    pub fn conversion<F, T, R>(from: F, to: T, reason: R) -> Self
    where
        F: Into<String>,
        T: Into<String>,
        R: Into<String>,
    {
        Self::ConversionFailed {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a database driver error as an Execution error.
    pub fn execution<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Execution {
            source: Box::new(source),
        }
    }

    /// Create an Execution error from a message (pool exhaustion, join errors).
    pub fn database<S: Into<String>>(msg: S) -> Self {
        let msg: String = msg.into();
        Self::Execution { source: msg.into() }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns `true` for errors raised by the database rather than the mapper.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
