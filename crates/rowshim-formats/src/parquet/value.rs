//! Parquet value conversion.

use arrow_schema::TimeUnit;

use super::ParquetType;
use crate::config::HostZone;
use crate::convert::{
    decode_field, encode_field, ConversionError, ConversionErrorKind, ConversionResult,
    EncodeTarget, ValueConverter,
};
use crate::host::{HostType, HostValue};
use crate::native::NativeValue;
use crate::schema::{NativeTypeSpec, SchemaField};

/// Field-level converter for Parquet.
///
/// The Arrow reader already applies logical annotations (decimals carry
/// their precision and scale, dates arrive as epoch days), so decoding
/// goes straight through the shared matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetValueConverter {
    zone: HostZone,
}

impl ParquetValueConverter {
    /// Creates a converter for `zone`.
    #[must_use]
    pub fn new(zone: HostZone) -> Self {
        Self { zone }
    }
}

impl ValueConverter for ParquetValueConverter {
    type Native = ParquetType;

    fn decode(
        &self,
        value: &NativeValue,
        field: &SchemaField<ParquetType>,
    ) -> ConversionResult<Option<HostValue>> {
        decode_field(value, field, self.zone)
    }

    fn encode(
        &self,
        value: Option<&HostValue>,
        field: &SchemaField<ParquetType>,
    ) -> ConversionResult<NativeValue> {
        let target = encode_target(field)
            .map_err(|kind| ConversionError::new(field.host_name.clone(), kind))?;
        encode_field(value, field, target, self.zone)
    }
}

/// Native category written for `field`.
///
/// # Errors
///
/// Returns [`ConversionErrorKind::Unsupported`] for types a writer never
/// produces and [`ConversionErrorKind::MissingDecimalMetadata`] for
/// decimals without precision or scale.
pub fn encode_target(
    field: &SchemaField<ParquetType>,
) -> Result<EncodeTarget, ConversionErrorKind> {
    Ok(match field.native_type {
        ParquetType::Boolean => EncodeTarget::Boolean,
        ParquetType::Int8 => EncodeTarget::Int8,
        ParquetType::Int16 => EncodeTarget::Int16,
        ParquetType::Int32 => EncodeTarget::Int32,
        ParquetType::Int64 => EncodeTarget::Int64,
        ParquetType::Float => EncodeTarget::Float32,
        ParquetType::Double => EncodeTarget::Float64,
        ParquetType::Binary => EncodeTarget::Binary,
        ParquetType::Utf8 => EncodeTarget::Utf8,
        ParquetType::DecimalInt32
        | ParquetType::DecimalInt64
        | ParquetType::DecimalBinary
        | ParquetType::DecimalFixed => EncodeTarget::decimal(field.precision, field.scale)?,
        ParquetType::Date => EncodeTarget::Date32,
        ParquetType::TimestampMillis => EncodeTarget::Timestamp(TimeUnit::Millisecond),
        ParquetType::TimestampMicros => EncodeTarget::Timestamp(TimeUnit::Microsecond),
        other @ (ParquetType::Int96
        | ParquetType::FixedLenByteArray
        | ParquetType::Enum
        | ParquetType::Json
        | ParquetType::Bson
        | ParquetType::TimeMillis
        | ParquetType::TimeMicros
        | ParquetType::UInt8
        | ParquetType::UInt16
        | ParquetType::UInt32
        | ParquetType::UInt64) => {
            return Err(ConversionErrorKind::Unsupported {
                native: other.display_name().to_string(),
                host: field.host_type.unwrap_or(HostType::String),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn conv() -> ParquetValueConverter {
        ParquetValueConverter::new(HostZone::Utc)
    }

    #[test]
    fn test_decimal_decodes_with_annotation() {
        let field = SchemaField::new("price", ParquetType::DecimalInt64).with_decimal(12, 2);
        let native = NativeValue::Decimal {
            unscaled: 12_345,
            precision: 12,
            scale: 2,
        };
        assert_eq!(
            conv().decode(&native, &field).unwrap(),
            Some(HostValue::BigNumber(Decimal::new(12_345, 2)))
        );
    }

    #[test]
    fn test_decimal_encode_rounds_to_scale() {
        let field = SchemaField::new("price", ParquetType::DecimalInt32).with_decimal(6, 2);
        let encoded = conv()
            .encode(Some(&HostValue::BigNumber(Decimal::new(123_455, 3))), &field)
            .unwrap();
        assert_eq!(
            encoded,
            NativeValue::Decimal {
                unscaled: 12_346,
                precision: 6,
                scale: 2
            }
        );
    }

    #[test]
    fn test_epoch_day_date() {
        let field = SchemaField::new("born", ParquetType::Date);
        let Some(HostValue::Date(d)) = conv().decode(&NativeValue::Date32(0), &field).unwrap()
        else {
            panic!("expected date");
        };
        assert_eq!(d.date_naive(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }

    #[test]
    fn test_unsigned_is_read_only() {
        let field = SchemaField::new("u", ParquetType::UInt32);
        assert_eq!(
            conv().decode(&NativeValue::Int64(7), &field).unwrap(),
            Some(HostValue::Integer(7))
        );
        assert!(conv().encode(Some(&HostValue::Integer(7)), &field).is_err());
    }

    #[test]
    fn test_text_into_int8_overflows() {
        let field = SchemaField::new("small", ParquetType::Int8).with_host_type(HostType::String);
        assert_eq!(
            conv().encode(Some(&HostValue::String("12".into())), &field).unwrap(),
            NativeValue::Int8(12)
        );
        let err = conv()
            .encode(Some(&HostValue::String("300".into())), &field)
            .unwrap_err();
        assert!(matches!(err.kind, ConversionErrorKind::Overflow(_)));
    }
}
