//! Schema description ↔ Avro schema.

use serde_json::{Number, Value};

use super::{AvroField, AvroRecord, AvroSchema, AvroType};
use crate::config::ConversionConfig;
use crate::error::{FormatError, FormatResult};
use crate::schema::legacy::{self, LegacyFieldName};
use crate::schema::{NativeTypeSpec, SchemaDescription, SchemaField};

/// Record name used when none is configured.
pub const DEFAULT_RECORD_NAME: &str = "row";

/// Builds the Avro record schema for `schema`.
///
/// Nullable fields become a union with `null`. When the field has a
/// default the non-null branch comes first and the default is written to
/// the field's `default` attribute.
///
/// # Errors
///
/// - [`FormatError::UnsupportedType`] for non-displayable native types
/// - [`FormatError::MissingDecimalMetadata`] for decimals without
///   precision or scale
/// - [`FormatError::InvalidConfig`] for path-style names and defaults that
///   do not fit the field type
pub fn build_native_schema(
    schema: &SchemaDescription<AvroType>,
    record_name: &str,
    namespace: Option<&str>,
) -> FormatResult<AvroSchema> {
    schema.require_fields()?;
    let fields = schema
        .iter()
        .map(build_field)
        .collect::<FormatResult<Vec<_>>>()?;
    Ok(AvroSchema::Record(AvroRecord {
        name: record_name.to_string(),
        namespace: namespace.map(str::to_string),
        fields,
    }))
}

fn build_field(field: &SchemaField<AvroType>) -> FormatResult<AvroField> {
    if field.native_name.starts_with('$') {
        return Err(FormatError::invalid_config(
            &field.native_name,
            "path expressions cannot be written",
        ));
    }
    let leaf = build_leaf(field)?;
    let default = field
        .default_value
        .as_deref()
        .map(|text| default_to_json(field, &leaf, text))
        .transpose()?;
    let schema = match (field.nullable, default.is_some()) {
        (false, _) => leaf,
        (true, true) => AvroSchema::Union(vec![leaf, AvroSchema::Null]),
        (true, false) => AvroSchema::Union(vec![AvroSchema::Null, leaf]),
    };
    Ok(AvroField {
        name: field.native_name.clone(),
        schema,
        default,
    })
}

fn build_leaf(field: &SchemaField<AvroType>) -> FormatResult<AvroSchema> {
    let t = field.native_type;
    if !t.is_displayable() {
        return Err(FormatError::unsupported(&field.native_name, t.display_name()));
    }
    Ok(match t {
        AvroType::Boolean => AvroSchema::Boolean,
        AvroType::Int => AvroSchema::Int,
        AvroType::Long => AvroSchema::Long,
        AvroType::Float => AvroSchema::Float,
        AvroType::Double => AvroSchema::Double,
        AvroType::Bytes => AvroSchema::Bytes,
        AvroType::String => AvroSchema::String,
        AvroType::Decimal => {
            field.decimal_target()?;
            AvroSchema::Decimal {
                precision: field.precision.unwrap_or_default(),
                scale: field.scale.unwrap_or_default(),
                fixed_size: None,
            }
        }
        AvroType::Date => AvroSchema::Date,
        AvroType::TimestampMillis => AvroSchema::TimestampMillis,
        AvroType::TimestampMicros => AvroSchema::TimestampMicros,
        other => return Err(FormatError::unsupported(&field.native_name, other.display_name())),
    })
}

fn default_to_json(field: &SchemaField<AvroType>, leaf: &AvroSchema, text: &str) -> FormatResult<Value> {
    let bad = || {
        FormatError::invalid_config(
            &field.native_name,
            format!("default '{text}' does not fit {}", leaf.avro_type()),
        )
    };
    Ok(match leaf {
        AvroSchema::Boolean => Value::Bool(text.trim().parse::<bool>().map_err(|_| bad())?),
        AvroSchema::Int | AvroSchema::Long => {
            Value::Number(text.trim().parse::<i64>().map_err(|_| bad())?.into())
        }
        AvroSchema::Float | AvroSchema::Double => {
            let v: f64 = text.trim().parse().map_err(|_| bad())?;
            Value::Number(Number::from_f64(v).ok_or_else(bad)?)
        }
        _ => Value::String(text.to_string()),
    })
}

fn default_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Describes an Avro record schema.
///
/// Nested records are flattened into `$.parent.child` path fields. With
/// legacy decoding enabled and a compound first field name, host names,
/// types and nullability come from the compound names.
///
/// # Errors
///
/// - [`FormatError::SchemaMismatch`] if the top level is not a record or a
///   compound name is malformed
/// - [`FormatError::UnsupportedType`] for fields without a host mapping
///   (arrays, maps, multi-branch unions)
pub fn build_schema_description(
    schema: &AvroSchema,
    config: &ConversionConfig,
) -> FormatResult<SchemaDescription<AvroType>> {
    let record = schema
        .as_record()
        .ok_or_else(|| FormatError::SchemaMismatch("top-level Avro schema must be a record".into()))?;
    let legacy = config.legacy_field_names
        && legacy::is_legacy(record.fields.iter().map(|f| f.name.as_str()));
    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        describe_field(None, field, legacy, &mut fields)?;
    }
    SchemaDescription::from_fields(fields)
}

fn describe_field(
    prefix: Option<&str>,
    field: &AvroField,
    legacy: bool,
    out: &mut Vec<SchemaField<AvroType>>,
) -> FormatResult<()> {
    let native_name = match prefix {
        None => field.name.clone(),
        Some(p) => format!("{p}.{}", field.name),
    };
    let (leaf, nullable) = field
        .schema
        .non_null()
        .ok_or_else(|| FormatError::unsupported(&native_name, AvroType::Union.display_name()))?;

    if let AvroSchema::Record(child) = leaf {
        let nested_prefix = match prefix {
            None => format!("$.{}", field.name),
            Some(_) => native_name,
        };
        for c in &child.fields {
            describe_field(Some(&nested_prefix), c, legacy, out)?;
        }
        return Ok(());
    }

    let avro_type = leaf.avro_type();
    let host_type = avro_type
        .host_type()
        .ok_or_else(|| FormatError::unsupported(&native_name, avro_type.display_name()))?;
    let host_name = native_name.strip_prefix("$.").unwrap_or(&native_name).to_string();

    let mut described = SchemaField::new(native_name, avro_type)
        .with_host_name(host_name)
        .with_host_type(host_type)
        .with_nullable(nullable);
    if let AvroSchema::Decimal {
        precision, scale, ..
    } = leaf
    {
        described = described.with_native_decimal(*precision, *scale);
    }
    described.default_value = field.default.as_ref().and_then(default_to_text);

    if legacy {
        let parsed = LegacyFieldName::parse(&field.name)?;
        described.host_name = match prefix {
            None => parsed.name,
            Some(p) => format!("{}.{}", p.trim_start_matches("$."), parsed.name),
        };
        described.host_type = parsed.host_type.or(described.host_type);
        described.nullable = parsed.nullable;
    }
    out.push(described);
    Ok(())
}
