//! Parquet type catalog.

use crate::host::HostType;

native_catalog! {
    /// Parquet physical types and their logical refinements.
    pub enum ParquetType {
        /// `INT32`.
        Int32 = 1, "Int32", Some(HostType::Integer), true;
        /// `INT64`.
        Int64 = 2, "Int64", Some(HostType::Integer), true;
        /// `INT96` legacy timestamp.
        Int96 = 3, "Int96", Some(HostType::Timestamp), false;
        /// `FLOAT`.
        Float = 4, "Float", Some(HostType::Number), true;
        /// `DOUBLE`.
        Double = 5, "Double", Some(HostType::Number), true;
        /// `BYTE_ARRAY` without annotation.
        Binary = 6, "Binary", Some(HostType::Binary), true;
        /// `BOOLEAN`.
        Boolean = 7, "Boolean", Some(HostType::Boolean), true;
        /// `FIXED_LEN_BYTE_ARRAY` without annotation.
        FixedLenByteArray = 8, "Fixed length binary", Some(HostType::Binary), false;
        /// `BYTE_ARRAY` annotated `UTF8`.
        Utf8 = 9, "UTF8", Some(HostType::String), true;
        /// `BYTE_ARRAY` annotated `ENUM`.
        Enum = 10, "Enum", Some(HostType::String), false;
        /// `BYTE_ARRAY` annotated `JSON`.
        Json = 11, "JSON", Some(HostType::String), false;
        /// `BYTE_ARRAY` annotated `BSON`.
        Bson = 12, "BSON", Some(HostType::Binary), false;
        /// `DECIMAL` stored as `INT32` (precision up to 9).
        DecimalInt32 = 13, "Decimal (int32)", Some(HostType::BigNumber), true;
        /// `DECIMAL` stored as `INT64` (precision up to 18).
        DecimalInt64 = 14, "Decimal (int64)", Some(HostType::BigNumber), true;
        /// `DECIMAL` stored as `BYTE_ARRAY`.
        DecimalBinary = 15, "Decimal (binary)", Some(HostType::BigNumber), false;
        /// `DECIMAL` stored as `FIXED_LEN_BYTE_ARRAY`.
        DecimalFixed = 16, "Decimal (fixed)", Some(HostType::BigNumber), true;
        /// `INT32` annotated `DATE`.
        Date = 17, "Date", Some(HostType::Date), true;
        /// `INT32` annotated `TIME_MILLIS`.
        TimeMillis = 18, "Time (millis)", Some(HostType::Integer), false;
        /// `INT64` annotated `TIME_MICROS`.
        TimeMicros = 19, "Time (micros)", Some(HostType::Integer), false;
        /// `INT64` annotated `TIMESTAMP_MILLIS`.
        TimestampMillis = 20, "Timestamp (millis)", Some(HostType::Timestamp), true;
        /// `INT64` annotated `TIMESTAMP_MICROS`.
        TimestampMicros = 21, "Timestamp (micros)", Some(HostType::Timestamp), true;
        /// `INT32` annotated `INT_8`.
        Int8 = 22, "Int8", Some(HostType::Integer), true;
        /// `INT32` annotated `INT_16`.
        Int16 = 23, "Int16", Some(HostType::Integer), true;
        /// `INT32` annotated `UINT_8`.
        UInt8 = 24, "UInt8", Some(HostType::Integer), false;
        /// `INT32` annotated `UINT_16`.
        UInt16 = 25, "UInt16", Some(HostType::Integer), false;
        /// `INT32` annotated `UINT_32`.
        UInt32 = 26, "UInt32", Some(HostType::Integer), false;
        /// `INT64` annotated `UINT_64`.
        UInt64 = 27, "UInt64", Some(HostType::Integer), false;
    }
}

impl ParquetType {
    /// The decimal type a writer produces for `precision` digits.
    #[must_use]
    pub fn decimal_for_precision(precision: u32) -> Self {
        match precision {
            0..=9 => Self::DecimalInt32,
            10..=18 => Self::DecimalInt64,
            _ => Self::DecimalFixed,
        }
    }

    /// Whether this is one of the decimal encodings.
    #[must_use]
    pub fn is_decimal(self) -> bool {
        matches!(
            self,
            Self::DecimalInt32 | Self::DecimalInt64 | Self::DecimalBinary | Self::DecimalFixed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NativeTypeSpec;

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<u32> = ParquetType::all().iter().map(|t| t.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ParquetType::all().len());
    }

    #[test]
    fn test_displayable_excludes_legacy_and_unsigned() {
        let shown = ParquetType::displayable();
        for hidden in [
            ParquetType::Int96,
            ParquetType::Enum,
            ParquetType::Json,
            ParquetType::Bson,
            ParquetType::TimeMillis,
            ParquetType::UInt64,
        ] {
            assert!(!shown.contains(&hidden), "{hidden} should not be displayable");
        }
        assert!(shown.contains(&ParquetType::Int8));
        assert!(shown.contains(&ParquetType::DecimalFixed));
    }

    #[test]
    fn test_decimal_for_precision() {
        assert_eq!(ParquetType::decimal_for_precision(9), ParquetType::DecimalInt32);
        assert_eq!(ParquetType::decimal_for_precision(10), ParquetType::DecimalInt64);
        assert_eq!(ParquetType::decimal_for_precision(18), ParquetType::DecimalInt64);
        assert_eq!(ParquetType::decimal_for_precision(19), ParquetType::DecimalFixed);
        assert!(ParquetType::DecimalBinary.is_decimal());
        assert!(!ParquetType::Int64.is_decimal());
    }
}
