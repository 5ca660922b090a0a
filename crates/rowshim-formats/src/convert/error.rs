//! Per-field conversion errors.

use thiserror::Error;

use crate::host::HostType;

/// Result alias for a single field conversion.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Why a single value could not be converted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionErrorKind {
    /// No rule converts this category to the declared type.
    #[error("no conversion from {native} to {host}")]
    Unsupported {
        /// Source category name.
        native: String,
        /// Declared host type.
        host: HostType,
    },

    /// Text could not be parsed.
    #[error("cannot parse '{0}'")]
    Parse(String),

    /// The value does not fit the target representation.
    #[error("value {0} is out of range")]
    Overflow(String),

    /// A decimal was requested without precision and scale.
    #[error("decimal precision and scale are required")]
    MissingDecimalMetadata,

    /// A decimal has more digits than the declared precision.
    #[error("value needs {digits} digits but precision is {precision}")]
    PrecisionExceeded {
        /// Declared precision.
        precision: u32,
        /// Digits required by the value.
        digits: u32,
    },

    /// Any other invalid value.
    #[error("{0}")]
    InvalidValue(String),
}

/// A field conversion failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("field '{field}': {kind}")]
pub struct ConversionError {
    /// Host field name.
    pub field: String,
    /// Failure kind.
    pub kind: ConversionErrorKind,
}

impl ConversionError {
    /// Creates an error for `field`.
    pub fn new(field: impl Into<String>, kind: ConversionErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}
