//! Error types for the knowledge context.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Soft failures (an id nobody can resolve, a cast to an
//! incompatible type) are not errors at all; they surface as `None`.

use thiserror::Error;

use crate::primitive::PrimitiveKind;

/// Top-level error type for knowledge context operations.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// A primitive was read through a typed accessor of the wrong kind.
    #[error("Type mismatch: expected {expected} primitive, found {actual}")]
    TypeMismatch {
        expected: PrimitiveKind,
        actual: PrimitiveKind,
    },

    /// A byte stream or text payload could not be decoded.
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entity source failed while resolving an id.
    #[error("Entity source '{scheme}' failed to resolve {entity_id}: {message}")]
    Resolver {
        scheme: String,
        entity_id: String,
        message: String,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {message}")]
    Config {
        message: String,
    },
}

impl KnowledgeError {
    /// Creates an invalid-data error.
    #[must_use]
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Creates a resolver error.
    #[must_use]
    pub fn resolver(
        scheme: impl Into<String>,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolver {
            scheme: scheme.into(),
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a primitive type mismatch.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns true if this is an invalid-data error.
    #[must_use]
    pub const fn is_invalid_data(&self) -> bool {
        matches!(self, Self::InvalidData { .. })
    }

    /// Returns true if this error came from an entity source.
    #[must_use]
    pub const fn is_resolver(&self) -> bool {
        matches!(self, Self::Resolver { .. })
    }

    /// Returns true if this is an I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Result type alias for knowledge context operations.
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
