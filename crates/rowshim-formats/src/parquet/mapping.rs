//! Schema description ↔ Parquet message type.

use std::sync::Arc;

use ::parquet::basic::{ConvertedType, LogicalType, Repetition, TimeUnit, Type as PhysicalType};
use ::parquet::schema::types::Type;

use super::ParquetType;
use crate::convert::EncodeTarget;
use crate::error::{FormatError, FormatResult};
use crate::schema::{NativeTypeSpec, SchemaDescription, SchemaField};

/// Message name used when none is configured.
pub const DEFAULT_MESSAGE_NAME: &str = "row";

/// Builds the Parquet message type for `schema`.
///
/// Nullable fields are `OPTIONAL`, the rest `REQUIRED`. Decimal fields
/// are stored in the narrowest physical type that holds their precision,
/// whichever decimal encoding the field names.
///
/// # Errors
///
/// - [`FormatError::UnsupportedType`] for non-displayable native types
/// - [`FormatError::MissingDecimalMetadata`] for decimals without
///   precision or scale
pub fn build_native_schema(
    schema: &SchemaDescription<ParquetType>,
    message_name: &str,
) -> FormatResult<Type> {
    schema.require_fields()?;
    let fields = schema
        .iter()
        .map(|f| build_field(f).map(Arc::new))
        .collect::<FormatResult<Vec<_>>>()?;
    Ok(Type::group_type_builder(message_name)
        .with_fields(fields)
        .build()?)
}

fn build_field(field: &SchemaField<ParquetType>) -> FormatResult<Type> {
    let t = field.native_type;
    if !t.is_displayable() {
        return Err(FormatError::unsupported(&field.native_name, t.display_name()));
    }
    let repetition = if field.nullable {
        Repetition::OPTIONAL
    } else {
        Repetition::REQUIRED
    };

    if t.is_decimal() {
        let EncodeTarget::Decimal { precision, scale } = field.decimal_target()? else {
            return Err(FormatError::MissingDecimalMetadata {
                field: field.native_name.clone(),
            });
        };
        let physical = match ParquetType::decimal_for_precision(u32::from(precision)) {
            ParquetType::DecimalInt32 => PhysicalType::INT32,
            ParquetType::DecimalInt64 => PhysicalType::INT64,
            _ => PhysicalType::FIXED_LEN_BYTE_ARRAY,
        };
        let mut builder = Type::primitive_type_builder(&field.native_name, physical)
            .with_repetition(repetition)
            .with_converted_type(ConvertedType::DECIMAL)
            .with_precision(i32::from(precision))
            .with_scale(i32::from(scale));
        if physical == PhysicalType::FIXED_LEN_BYTE_ARRAY {
            builder = builder.with_length(decimal_length(precision));
        }
        return Ok(builder.build()?);
    }

    let (physical, converted) = match t {
        ParquetType::Boolean => (PhysicalType::BOOLEAN, ConvertedType::NONE),
        ParquetType::Int8 => (PhysicalType::INT32, ConvertedType::INT_8),
        ParquetType::Int16 => (PhysicalType::INT32, ConvertedType::INT_16),
        ParquetType::Int32 => (PhysicalType::INT32, ConvertedType::NONE),
        ParquetType::Int64 => (PhysicalType::INT64, ConvertedType::NONE),
        ParquetType::Float => (PhysicalType::FLOAT, ConvertedType::NONE),
        ParquetType::Double => (PhysicalType::DOUBLE, ConvertedType::NONE),
        ParquetType::Binary => (PhysicalType::BYTE_ARRAY, ConvertedType::NONE),
        ParquetType::Utf8 => (PhysicalType::BYTE_ARRAY, ConvertedType::UTF8),
        ParquetType::Date => (PhysicalType::INT32, ConvertedType::DATE),
        ParquetType::TimestampMillis => (PhysicalType::INT64, ConvertedType::TIMESTAMP_MILLIS),
        ParquetType::TimestampMicros => (PhysicalType::INT64, ConvertedType::TIMESTAMP_MICROS),
        other => return Err(FormatError::unsupported(&field.native_name, other.display_name())),
    };
    Ok(Type::primitive_type_builder(&field.native_name, physical)
        .with_repetition(repetition)
        .with_converted_type(converted)
        .build()?)
}

/// Smallest byte width whose signed range holds every `precision`-digit
/// unscaled value.
fn decimal_length(precision: u8) -> i32 {
    let max = 10_i128.pow(u32::from(precision)) - 1;
    (1..=16)
        .find(|bytes| max <= i128::MAX >> (128 - 8 * bytes))
        .unwrap_or(16)
}

/// Recovers a schema description from a Parquet message type.
///
/// Host names equal native names and host types come from the catalog;
/// [`read_metadata`](crate::metadata::read_metadata) refines them when
/// the file carries host metadata.
///
/// # Errors
///
/// - [`FormatError::SchemaMismatch`] if `root` is not a group
/// - [`FormatError::UnsupportedType`] for nested groups and repeated
///   fields
pub fn build_schema_description(root: &Type) -> FormatResult<SchemaDescription<ParquetType>> {
    if !root.is_group() {
        return Err(FormatError::SchemaMismatch(
            "parquet schema root must be a group".into(),
        ));
    }
    let fields = root
        .get_fields()
        .iter()
        .map(|f| describe_field(f))
        .collect::<FormatResult<Vec<_>>>()?;
    SchemaDescription::from_fields(fields)
}

fn describe_field(field: &Type) -> FormatResult<SchemaField<ParquetType>> {
    let info = field.get_basic_info();
    let name = info.name();
    let Type::PrimitiveType {
        physical_type,
        precision,
        scale,
        ..
    } = field
    else {
        return Err(FormatError::unsupported(name, "group"));
    };
    let repetition = info.has_repetition().then(|| info.repetition());
    if repetition == Some(Repetition::REPEATED) {
        return Err(FormatError::unsupported(name, "repeated"));
    }

    let native_type = classify(*physical_type, info.converted_type(), info.logical_type());
    let host_type = native_type
        .host_type()
        .ok_or_else(|| FormatError::unsupported(name, native_type.display_name()))?;
    let mut described = SchemaField::new(name, native_type)
        .with_host_type(host_type)
        .with_nullable(repetition == Some(Repetition::OPTIONAL));
    if native_type.is_decimal() {
        let bad = || FormatError::SchemaMismatch(format!("field '{name}' has a negative decimal attribute"));
        described = described.with_native_decimal(
            u32::try_from(*precision).map_err(|_| bad())?,
            u32::try_from(*scale).map_err(|_| bad())?,
        );
    }
    Ok(described)
}

fn classify(
    physical: PhysicalType,
    converted: ConvertedType,
    logical: Option<LogicalType>,
) -> ParquetType {
    match (physical, converted) {
        (PhysicalType::BOOLEAN, _) => ParquetType::Boolean,
        (PhysicalType::INT96, _) => ParquetType::Int96,
        (PhysicalType::FLOAT, _) => ParquetType::Float,
        (PhysicalType::DOUBLE, _) => ParquetType::Double,
        (PhysicalType::INT32, ConvertedType::DECIMAL) => ParquetType::DecimalInt32,
        (PhysicalType::INT64, ConvertedType::DECIMAL) => ParquetType::DecimalInt64,
        (PhysicalType::BYTE_ARRAY, ConvertedType::DECIMAL) => ParquetType::DecimalBinary,
        (PhysicalType::FIXED_LEN_BYTE_ARRAY, ConvertedType::DECIMAL) => ParquetType::DecimalFixed,
        (PhysicalType::INT32, ConvertedType::INT_8) => ParquetType::Int8,
        (PhysicalType::INT32, ConvertedType::INT_16) => ParquetType::Int16,
        (PhysicalType::INT32, ConvertedType::UINT_8) => ParquetType::UInt8,
        (PhysicalType::INT32, ConvertedType::UINT_16) => ParquetType::UInt16,
        (PhysicalType::INT32, ConvertedType::UINT_32) => ParquetType::UInt32,
        (PhysicalType::INT64, ConvertedType::UINT_64) => ParquetType::UInt64,
        (PhysicalType::INT32, ConvertedType::DATE) => ParquetType::Date,
        (PhysicalType::INT32, ConvertedType::TIME_MILLIS) => ParquetType::TimeMillis,
        (PhysicalType::INT64, ConvertedType::TIME_MICROS) => ParquetType::TimeMicros,
        (PhysicalType::INT64, ConvertedType::TIMESTAMP_MILLIS) => ParquetType::TimestampMillis,
        (PhysicalType::INT64, ConvertedType::TIMESTAMP_MICROS) => ParquetType::TimestampMicros,
        // Local-time timestamps carry only the logical annotation.
        (PhysicalType::INT64, _) => match logical {
            Some(LogicalType::Timestamp {
                unit: TimeUnit::MILLIS,
                ..
            }) => ParquetType::TimestampMillis,
            Some(LogicalType::Timestamp {
                unit: TimeUnit::MICROS,
                ..
            }) => ParquetType::TimestampMicros,
            _ => ParquetType::Int64,
        },
        (PhysicalType::INT32, _) => ParquetType::Int32,
        (PhysicalType::BYTE_ARRAY, ConvertedType::UTF8) => ParquetType::Utf8,
        (PhysicalType::BYTE_ARRAY, ConvertedType::ENUM) => ParquetType::Enum,
        (PhysicalType::BYTE_ARRAY, ConvertedType::JSON) => ParquetType::Json,
        (PhysicalType::BYTE_ARRAY, ConvertedType::BSON) => ParquetType::Bson,
        (PhysicalType::BYTE_ARRAY, _) => match logical {
            Some(LogicalType::String) => ParquetType::Utf8,
            _ => ParquetType::Binary,
        },
        (PhysicalType::FIXED_LEN_BYTE_ARRAY, _) => ParquetType::FixedLenByteArray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostType;

    fn sample() -> SchemaDescription<ParquetType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", ParquetType::Utf8).with_nullable(true),
            SchemaField::new("age", ParquetType::Int64),
            SchemaField::new("price", ParquetType::DecimalInt64).with_decimal(12, 2),
            SchemaField::new("born", ParquetType::Date).with_nullable(true),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_message() {
        let message = build_native_schema(&sample(), "people").unwrap();
        assert_eq!(message.name(), "people");
        let fields = message.get_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].get_physical_type(), PhysicalType::BYTE_ARRAY);
        assert_eq!(fields[0].get_basic_info().converted_type(), ConvertedType::UTF8);
        assert_eq!(fields[0].get_basic_info().repetition(), Repetition::OPTIONAL);
        assert_eq!(fields[1].get_basic_info().repetition(), Repetition::REQUIRED);
        assert_eq!(fields[2].get_physical_type(), PhysicalType::INT64);
        assert_eq!(fields[2].get_precision(), 12);
        assert_eq!(fields[2].get_scale(), 2);
    }

    #[test]
    fn test_decimal_physical_type_follows_precision() {
        let schema = SchemaDescription::from_fields(vec![
            SchemaField::new("small", ParquetType::DecimalFixed).with_decimal(5, 1),
            SchemaField::new("wide", ParquetType::DecimalInt32).with_decimal(28, 4),
        ])
        .unwrap();
        let message = build_native_schema(&schema, "m").unwrap();
        let fields = message.get_fields();
        assert_eq!(fields[0].get_physical_type(), PhysicalType::INT32);
        assert_eq!(fields[1].get_physical_type(), PhysicalType::FIXED_LEN_BYTE_ARRAY);

        let back = build_schema_description(&message).unwrap();
        assert_eq!(back.fields()[0].native_type, ParquetType::DecimalInt32);
        assert_eq!(back.fields()[1].native_type, ParquetType::DecimalFixed);
        assert_eq!(back.fields()[1].precision, Some(28));
    }

    #[test]
    fn test_wide_decimal_is_read_only() {
        let schema = SchemaDescription::from_fields(vec![
            SchemaField::new("wide", ParquetType::DecimalFixed).with_decimal(38, 4),
        ])
        .unwrap();
        assert!(matches!(
            build_native_schema(&schema, "m"),
            Err(FormatError::InvalidConfig { .. })
        ));

        let message = Type::group_type_builder("m")
            .with_fields(vec![Arc::new(
                Type::primitive_type_builder("wide", PhysicalType::FIXED_LEN_BYTE_ARRAY)
                    .with_length(16)
                    .with_converted_type(ConvertedType::DECIMAL)
                    .with_precision(38)
                    .with_scale(4)
                    .build()
                    .unwrap(),
            )])
            .build()
            .unwrap();
        let back = build_schema_description(&message).unwrap();
        assert_eq!(back.fields()[0].precision, Some(38));
        assert_eq!(back.fields()[0].host_type, Some(HostType::String));
    }

    #[test]
    fn test_decimal_length() {
        assert_eq!(decimal_length(1), 1);
        assert_eq!(decimal_length(2), 1);
        assert_eq!(decimal_length(3), 2);
        assert_eq!(decimal_length(19), 9);
        assert_eq!(decimal_length(38), 16);
    }

    #[test]
    fn test_roundtrip_displayable_types() {
        let mut fields = Vec::new();
        for (i, t) in ParquetType::displayable().into_iter().enumerate() {
            let mut f = SchemaField::new(format!("c{i}"), t).with_nullable(i % 2 == 1);
            f = match t {
                ParquetType::DecimalInt32 => f.with_decimal(9, 2),
                ParquetType::DecimalInt64 => f.with_decimal(18, 0),
                ParquetType::DecimalFixed => f.with_decimal(28, 10),
                _ => f,
            };
            fields.push(f);
        }
        let schema = SchemaDescription::from_fields(fields).unwrap();
        let message = build_native_schema(&schema, "m").unwrap();
        assert_eq!(build_schema_description(&message).unwrap(), schema);
    }

    #[test]
    fn test_build_rejects_unsupported() {
        let int96 =
            SchemaDescription::from_fields(vec![SchemaField::new("t", ParquetType::Int96)]).unwrap();
        let err = build_native_schema(&int96, "m").unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedType { ref field, .. } if field == "t"));

        let decimal =
            SchemaDescription::from_fields(vec![SchemaField::new("d", ParquetType::DecimalInt64)])
                .unwrap();
        assert!(matches!(
            build_native_schema(&decimal, "m"),
            Err(FormatError::MissingDecimalMetadata { .. })
        ));
    }

    #[test]
    fn test_describe_reads_unsigned_and_rejects_groups() {
        let unsigned = Type::primitive_type_builder("u", PhysicalType::INT32)
            .with_repetition(Repetition::REQUIRED)
            .with_converted_type(ConvertedType::UINT_16)
            .build()
            .unwrap();
        let message = Type::group_type_builder("m")
            .with_fields(vec![Arc::new(unsigned)])
            .build()
            .unwrap();
        let desc = build_schema_description(&message).unwrap();
        assert_eq!(desc.fields()[0].native_type, ParquetType::UInt16);
        assert_eq!(desc.fields()[0].host_type, Some(HostType::Integer));

        let leaf = Type::primitive_type_builder("x", PhysicalType::INT32)
            .with_repetition(Repetition::OPTIONAL)
            .build()
            .unwrap();
        let group = Type::group_type_builder("g")
            .with_repetition(Repetition::OPTIONAL)
            .with_fields(vec![Arc::new(leaf)])
            .build()
            .unwrap();
        let nested = Type::group_type_builder("m")
            .with_fields(vec![Arc::new(group)])
            .build()
            .unwrap();
        let err = build_schema_description(&nested).unwrap_err();
        assert!(err.to_string().contains("'g'"));
    }
}
