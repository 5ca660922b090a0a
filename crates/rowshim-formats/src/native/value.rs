//! Closed native value sum type.

use arrow_schema::TimeUnit;

/// A single decoded (or encodable) native value.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Absent value.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 8-bit integer.
    Int8(i8),
    /// 16-bit integer.
    Int16(i16),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 text.
    Utf8(String),
    /// Raw bytes (variable or fixed length).
    Binary(Vec<u8>),
    /// Decimal as an unscaled integer plus its annotation.
    Decimal {
        /// Unscaled value.
        unscaled: i128,
        /// Total digits.
        precision: u8,
        /// Digits after the point.
        scale: i8,
    },
    /// Days since 1970-01-01.
    Date32(i32),
    /// Instant since the epoch in `unit`.
    Timestamp {
        /// Resolution of `value`.
        unit: TimeUnit,
        /// Ticks since the epoch.
        value: i64,
    },
    /// Enumeration symbol.
    Enum(String),
}

impl NativeValue {
    /// Returns `true` for [`NativeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short category name used in error messages.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Utf8(_) => "utf8",
            Self::Binary(_) => "binary",
            Self::Decimal { .. } => "decimal",
            Self::Date32(_) => "date32",
            Self::Timestamp { .. } => "timestamp",
            Self::Enum(_) => "enum",
        }
    }

    /// Returns the value as `i64` for any integer category.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) | Self::Date32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(NativeValue::Null.category(), "null");
        assert_eq!(
            NativeValue::Decimal {
                unscaled: 1,
                precision: 3,
                scale: 1
            }
            .category(),
            "decimal"
        );
        assert_eq!(NativeValue::Enum("A".into()).category(), "enum");
    }

    #[test]
    fn test_as_i64_widens_integers() {
        assert_eq!(NativeValue::Int8(-3).as_i64(), Some(-3));
        assert_eq!(NativeValue::Int32(7).as_i64(), Some(7));
        assert_eq!(NativeValue::Int64(i64::MAX).as_i64(), Some(i64::MAX));
        assert_eq!(NativeValue::Float64(1.0).as_i64(), None);
        assert!(NativeValue::Null.is_null());
    }
}
