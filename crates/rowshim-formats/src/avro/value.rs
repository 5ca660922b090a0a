//! Avro value conversion.

use arrow_schema::TimeUnit;

use super::AvroType;
use crate::config::HostZone;
use crate::convert::{
    decimal_from_unscaled, decode_field, encode_field, unscaled_from_be_bytes, ConversionError,
    ConversionErrorKind, ConversionResult, EncodeTarget, ValueConverter,
};
use crate::host::{HostType, HostValue};
use crate::native::NativeValue;
use crate::schema::{NativeTypeSpec, SchemaField};

/// Field-level converter for Avro.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvroValueConverter {
    zone: HostZone,
}

impl AvroValueConverter {
    /// Creates a converter for `zone`.
    #[must_use]
    pub fn new(zone: HostZone) -> Self {
        Self { zone }
    }
}

impl ValueConverter for AvroValueConverter {
    type Native = AvroType;

    fn decode(
        &self,
        value: &NativeValue,
        field: &SchemaField<AvroType>,
    ) -> ConversionResult<Option<HostValue>> {
        let fail = |kind| ConversionError::new(field.host_name.clone(), kind);
        // Readers that do not apply logical types hand back the physical value.
        let annotated = match (field.native_type, value) {
            (AvroType::Date, NativeValue::Int32(days)) => NativeValue::Date32(*days),
            (AvroType::TimestampMillis, NativeValue::Int64(v)) => NativeValue::Timestamp {
                unit: TimeUnit::Millisecond,
                value: *v,
            },
            (AvroType::TimestampMicros, NativeValue::Int64(v)) => NativeValue::Timestamp {
                unit: TimeUnit::Microsecond,
                value: *v,
            },
            (AvroType::Decimal | AvroType::DecimalFixed, NativeValue::Binary(bytes)) => {
                let unscaled = unscaled_from_be_bytes(bytes).map_err(fail)?;
                let d = decimal_from_unscaled(unscaled, field.precision, field.scale)
                    .map_err(fail)?;
                let target = field.host_type.unwrap_or(HostType::BigNumber);
                return field
                    .coercion(self.zone)
                    .coerce(&HostValue::BigNumber(d), target)
                    .map(Some)
                    .map_err(fail);
            }
            _ => return decode_field(value, field, self.zone),
        };
        decode_field(&annotated, field, self.zone)
    }

    fn encode(
        &self,
        value: Option<&HostValue>,
        field: &SchemaField<AvroType>,
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
/// Returns [`ConversionErrorKind::Unsupported`] for complex types and
/// [`ConversionErrorKind::MissingDecimalMetadata`] for decimals without
/// precision or scale.
pub fn encode_target(field: &SchemaField<AvroType>) -> Result<EncodeTarget, ConversionErrorKind> {
    Ok(match field.native_type {
        AvroType::Boolean => EncodeTarget::Boolean,
        AvroType::Int | AvroType::TimeMillis => EncodeTarget::Int32,
        AvroType::Long | AvroType::TimeMicros => EncodeTarget::Int64,
        AvroType::Float => EncodeTarget::Float32,
        AvroType::Double => EncodeTarget::Float64,
        AvroType::Bytes | AvroType::Fixed => EncodeTarget::Binary,
        AvroType::String | AvroType::Enum => EncodeTarget::Utf8,
        AvroType::Decimal | AvroType::DecimalFixed => {
            EncodeTarget::decimal(field.precision, field.scale)?
        }
        AvroType::Date => EncodeTarget::Date32,
        AvroType::TimestampMillis => EncodeTarget::Timestamp(TimeUnit::Millisecond),
        AvroType::TimestampMicros => EncodeTarget::Timestamp(TimeUnit::Microsecond),
        other @ (AvroType::Null
        | AvroType::Record
        | AvroType::Array
        | AvroType::Map
        | AvroType::Union) => {
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

    fn conv() -> AvroValueConverter {
        AvroValueConverter::new(HostZone::Utc)
    }

    #[test]
    fn test_physical_date_decodes_as_epoch_day() {
        let field = SchemaField::new("born", AvroType::Date);
        let v = conv().decode(&NativeValue::Int32(1), &field).unwrap().unwrap();
        let HostValue::Date(dt) = v else {
            panic!("expected date");
        };
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
    }

    #[test]
    fn test_decimal_bytes_need_field_metadata() {
        let bare = SchemaField::new("price", AvroType::Decimal);
        let err = conv()
            .decode(&NativeValue::Binary(vec![0x04, 0xd2]), &bare)
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::MissingDecimalMetadata);

        let annotated = bare.with_decimal(6, 2);
        assert_eq!(
            conv()
                .decode(&NativeValue::Binary(vec![0x04, 0xd2]), &annotated)
                .unwrap(),
            Some(HostValue::BigNumber(Decimal::new(1234, 2)))
        );
    }

    #[test]
    fn test_enum_symbol_decodes_to_string() {
        let field = SchemaField::new("color", AvroType::Enum);
        assert_eq!(
            conv().decode(&NativeValue::Enum("RED".into()), &field).unwrap(),
            Some(HostValue::String("RED".into()))
        );
    }

    #[test]
    fn test_encode_targets() {
        let int = SchemaField::new("n", AvroType::Int);
        assert_eq!(
            conv().encode(Some(&HostValue::String("12".into())), &int).unwrap(),
            NativeValue::Int32(12)
        );
        let flag = SchemaField::new("b", AvroType::Boolean).with_host_type(HostType::String);
        assert_eq!(
            conv().encode(Some(&HostValue::String("yes".into())), &flag).unwrap(),
            NativeValue::Boolean(true)
        );
        let record = SchemaField::new("r", AvroType::Record);
        assert!(matches!(
            conv().encode(Some(&HostValue::Integer(1)), &record),
            Err(ConversionError { kind: ConversionErrorKind::Unsupported { .. }, .. })
        ));
        let decimal = SchemaField::new("d", AvroType::Decimal);
        assert_eq!(
            conv().encode(Some(&HostValue::Integer(1)), &decimal).unwrap_err().kind,
            ConversionErrorKind::MissingDecimalMetadata
        );
    }

    #[test]
    fn test_double_to_long_truncates() {
        let field = SchemaField::new("n", AvroType::Double).with_host_type(HostType::Integer);
        assert_eq!(
            conv().decode(&NativeValue::Float64(41.99), &field).unwrap(),
            Some(HostValue::Integer(41))
        );
    }
}
