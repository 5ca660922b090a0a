//! ORC value conversion.

use arrow_schema::TimeUnit;

use super::OrcType;
use crate::config::HostZone;
use crate::convert::{
    decode_field, encode_field, ConversionError, ConversionErrorKind, ConversionResult,
    EncodeTarget, ValueConverter,
};
use crate::host::{HostType, HostValue};
use crate::native::NativeValue;
use crate::schema::{NativeTypeSpec, SchemaField};

/// Field-level converter for ORC.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrcValueConverter {
    zone: HostZone,
}

impl OrcValueConverter {
    /// Creates a converter for `zone`.
    #[must_use]
    pub fn new(zone: HostZone) -> Self {
        Self { zone }
    }
}

impl ValueConverter for OrcValueConverter {
    type Native = OrcType;

    fn decode(
        &self,
        value: &NativeValue,
        field: &SchemaField<OrcType>,
    ) -> ConversionResult<Option<HostValue>> {
        // char(n) values come back blank padded.
        if let (OrcType::Char, NativeValue::Utf8(text)) = (field.native_type, value) {
            let trimmed = NativeValue::Utf8(text.trim_end_matches(' ').to_string());
            return decode_field(&trimmed, field, self.zone);
        }
        decode_field(value, field, self.zone)
    }

    fn encode(
        &self,
        value: Option<&HostValue>,
        field: &SchemaField<OrcType>,
    ) -> ConversionResult<NativeValue> {
        let target = encode_target(field)
            .map_err(|kind| ConversionError::new(field.host_name.clone(), kind))?;
        encode_field(value, field, target, self.zone)
    }
}

/// Native category written for `field`. Timestamps are written with
/// nanosecond precision.
///
/// # Errors
///
/// Returns [`ConversionErrorKind::Unsupported`] for compound categories
/// and [`ConversionErrorKind::MissingDecimalMetadata`] for decimals
/// without precision or scale.
pub fn encode_target(field: &SchemaField<OrcType>) -> Result<EncodeTarget, ConversionErrorKind> {
    Ok(match field.native_type {
        OrcType::Boolean => EncodeTarget::Boolean,
        OrcType::TinyInt => EncodeTarget::Int8,
        OrcType::SmallInt => EncodeTarget::Int16,
        OrcType::Int => EncodeTarget::Int32,
        OrcType::BigInt => EncodeTarget::Int64,
        OrcType::Float => EncodeTarget::Float32,
        OrcType::Double => EncodeTarget::Float64,
        OrcType::Decimal => EncodeTarget::decimal(field.precision, field.scale)?,
        OrcType::String | OrcType::Char | OrcType::Varchar => EncodeTarget::Utf8,
        OrcType::Binary => EncodeTarget::Binary,
        OrcType::Date => EncodeTarget::Date32,
        OrcType::Timestamp => EncodeTarget::Timestamp(TimeUnit::Nanosecond),
        other @ (OrcType::Struct | OrcType::List | OrcType::Map | OrcType::Union) => {
            return Err(ConversionErrorKind::Unsupported {
                native: other.display_name().to_string(),
                host: field.host_type.unwrap_or(HostType::String),
            })
        }
    })
}
