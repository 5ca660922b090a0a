//! Error types for schema building and row streaming.
//!
//! Provides [`FormatError`] for setup and resource failures plus a
//! convenience [`FormatResult`] alias. Per-field conversion failures use
//! [`ConversionError`](crate::convert::ConversionError) and only surface
//! here when the row-assembly policy promotes them.
//!
//! | Category | Variants | When |
//! |----------|----------|------|
//! | configuration | `MissingConfig`, `InvalidConfig` | before any native resource is opened |
//! | unsupported type | `UnsupportedType`, `MissingDecimalMetadata`, `SchemaMismatch`, `PathResolution` | schema build |
//! | field conversion | `Conversion`, `RequiredFieldMissing` | per row |
//! | resource | `Io`, `Arrow`, `Parquet`, `Native`, `Closed` | any time, always propagated |

use thiserror::Error;

use crate::convert::ConversionError;

/// Result alias for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while configuring, building or driving a read/write pass.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A required input (schema, file path, ...) was not supplied.
    #[error("missing config: {0}")]
    MissingConfig(String),

    /// A configuration value is invalid.
    #[error("invalid config key '{key}': {message}")]
    InvalidConfig {
        /// The configuration key (or field name).
        key: String,
        /// What was wrong with the value.
        message: String,
    },

    /// A native type has no host mapping, or cannot be built.
    #[error("unsupported type '{native}' for field '{field}'")]
    UnsupportedType {
        /// Field that carries the type.
        field: String,
        /// Native type category name.
        native: String,
    },

    /// A decimal field lacks precision or scale.
    #[error("decimal field '{field}' requires both precision and scale")]
    MissingDecimalMetadata {
        /// Field name.
        field: String,
    },

    /// Native and host schema shapes disagree.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A field path did not resolve to exactly one scalar leaf.
    #[error("cannot resolve path '{path}': {reason}")]
    PathResolution {
        /// The path expression.
        path: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A non-nullable field without default received an absent value.
    #[error("field '{field}' is not nullable and has no default")]
    RequiredFieldMissing {
        /// Field name.
        field: String,
    },

    /// A row was rejected because a field failed to convert.
    #[error("row rejected: {0}")]
    Conversion(#[from] ConversionError),

    /// The stream was already closed.
    #[error("stream is closed")]
    Closed,

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error raised while assembling or reading batches.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Parquet library error.
    #[cfg(feature = "parquet")]
    #[error("parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    /// Error reported by a native format library without a typed wrapper.
    #[error("{format} error: {message}")]
    Native {
        /// Format name (`"avro"`, `"orc"`).
        format: &'static str,
        /// Library error message.
        message: String,
    },
}

impl FormatError {
    /// Builds an [`InvalidConfig`](Self::InvalidConfig) error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Builds an [`UnsupportedType`](Self::UnsupportedType) error.
    pub fn unsupported(field: impl Into<String>, native: impl Into<String>) -> Self {
        Self::UnsupportedType {
            field: field.into(),
            native: native.into(),
        }
    }

    /// Builds a [`PathResolution`](Self::PathResolution) error.
    pub fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an untyped native library error.
    pub fn native(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Native {
            format,
            message: err.to_string(),
        }
    }

    /// Returns `true` for errors raised at setup time (configuration and
    /// unsupported-type categories).
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig(_)
                | Self::InvalidConfig { .. }
                | Self::UnsupportedType { .. }
                | Self::MissingDecimalMetadata { .. }
                | Self::SchemaMismatch(_)
                | Self::PathResolution { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionErrorKind;

    #[test]
    fn test_unsupported_names_field_and_type() {
        let err = FormatError::unsupported("tags", "array");
        let msg = err.to_string();
        assert!(msg.contains("tags"));
        assert!(msg.contains("array"));
        assert!(err.is_setup_error());
    }

    #[test]
    fn test_invalid_config_display() {
        let err = FormatError::invalid_config("schema", "field contains '|'");
        assert_eq!(
            err.to_string(),
            "invalid config key 'schema': field contains '|'"
        );
    }

    #[test]
    fn test_conversion_error_wraps() {
        let ce = ConversionError::new("age", ConversionErrorKind::Parse("abc".into()));
        let err: FormatError = ce.into();
        assert!(matches!(err, FormatError::Conversion(_)));
        assert!(err.to_string().contains("age"));
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_native_error_message() {
        let err = FormatError::native("orc", "bad stripe");
        assert_eq!(err.to_string(), "orc error: bad stripe");
    }

    #[test]
    fn test_io_error_is_resource() {
        let err: FormatError = std::io::Error::other("disk").into();
        assert!(matches!(err, FormatError::Io(_)));
        assert!(!err.is_setup_error());
    }
}
