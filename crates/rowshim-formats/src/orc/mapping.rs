//! Schema description ↔ ORC struct type.

use super::schema::{OrcSchema, OrcStruct, DEFAULT_MAX_LENGTH};
use super::OrcType;
use crate::convert::EncodeTarget;
use crate::error::{FormatError, FormatResult};
use crate::schema::{NativeTypeSpec, SchemaDescription, SchemaField};

/// Builds the root struct type for `schema`.
///
/// ORC has no per-column nullability; `nullable` and default values are
/// left to the host metadata.
///
/// # Errors
///
/// - [`FormatError::UnsupportedType`] for compound categories
/// - [`FormatError::MissingDecimalMetadata`] for decimals without
///   precision or scale
pub fn build_native_schema(schema: &SchemaDescription<OrcType>) -> FormatResult<OrcSchema> {
    schema.require_fields()?;
    let names = schema.iter().map(|f| f.native_name.clone()).collect();
    let children = schema
        .iter()
        .map(build_field)
        .collect::<FormatResult<Vec<_>>>()?;
    Ok(OrcSchema::Struct(OrcStruct::new(names, children)?))
}

fn build_field(field: &SchemaField<OrcType>) -> FormatResult<OrcSchema> {
    Ok(match field.native_type {
        OrcType::Boolean => OrcSchema::Boolean,
        OrcType::TinyInt => OrcSchema::TinyInt,
        OrcType::SmallInt => OrcSchema::SmallInt,
        OrcType::Int => OrcSchema::Int,
        OrcType::BigInt => OrcSchema::BigInt,
        OrcType::Float => OrcSchema::Float,
        OrcType::Double => OrcSchema::Double,
        OrcType::Decimal => {
            let EncodeTarget::Decimal { precision, scale } = field.decimal_target()? else {
                return Err(FormatError::MissingDecimalMetadata {
                    field: field.native_name.clone(),
                });
            };
            OrcSchema::Decimal {
                precision: u32::from(precision),
                scale: u32::try_from(scale).unwrap_or_default(),
            }
        }
        OrcType::String => OrcSchema::String,
        OrcType::Char => OrcSchema::Char(DEFAULT_MAX_LENGTH),
        OrcType::Varchar => OrcSchema::Varchar(DEFAULT_MAX_LENGTH),
        OrcType::Binary => OrcSchema::Binary,
        OrcType::Date => OrcSchema::Date,
        OrcType::Timestamp => OrcSchema::Timestamp,
        other @ (OrcType::Struct | OrcType::List | OrcType::Map | OrcType::Union) => {
            return Err(FormatError::unsupported(&field.native_name, other.display_name()))
        }
    })
}

/// Recovers a schema description from the root struct of a file.
///
/// Fields come back non-nullable and without defaults; host types come
/// from the catalog until [`read_metadata`](crate::metadata::read_metadata)
/// refines them.
///
/// # Errors
///
/// - [`FormatError::SchemaMismatch`] if `root` is not a struct
/// - [`FormatError::UnsupportedType`] for compound columns
pub fn build_schema_description(root: &OrcSchema) -> FormatResult<SchemaDescription<OrcType>> {
    let OrcSchema::Struct(st) = root else {
        return Err(FormatError::SchemaMismatch(format!(
            "orc root must be a struct, found {root}"
        )));
    };
    let fields = st
        .fields()
        .map(|(name, child)| {
            let category = child.category();
            if !category.is_displayable() {
                return Err(FormatError::unsupported(name, category.display_name()));
            }
            let field = SchemaField::new(name, category);
            Ok(match child {
                OrcSchema::Decimal { precision, scale } => {
                    field.with_native_decimal(*precision, *scale)
                }
                _ => field,
            })
        })
        .collect::<FormatResult<Vec<_>>>()?;
    SchemaDescription::from_fields(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostType;

    fn sample() -> SchemaDescription<OrcType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", OrcType::String),
            SchemaField::new("age", OrcType::BigInt),
            SchemaField::new("price", OrcType::Decimal).with_decimal(10, 2),
            SchemaField::new("code", OrcType::Char),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_struct() {
        assert_eq!(
            build_native_schema(&sample()).unwrap().to_string(),
            "struct<name:string,age:bigint,price:decimal(10,2),code:char(256)>"
        );
    }

    #[test]
    fn test_build_then_describe() {
        let native = build_native_schema(&sample()).unwrap();
        assert_eq!(build_schema_description(&native).unwrap(), sample());
    }

    #[test]
    fn test_decimal_requires_metadata() {
        let schema =
            SchemaDescription::from_fields(vec![SchemaField::new("p", OrcType::Decimal)]).unwrap();
        assert!(matches!(
            build_native_schema(&schema),
            Err(FormatError::MissingDecimalMetadata { .. })
        ));
    }

    #[test]
    fn test_compound_columns_are_unsupported() {
        let schema =
            SchemaDescription::from_fields(vec![SchemaField::new("tags", OrcType::List)]).unwrap();
        assert!(matches!(
            build_native_schema(&schema),
            Err(FormatError::UnsupportedType { .. })
        ));

        let native = OrcSchema::parse("struct<id:int,tags:array<string>>").unwrap();
        let err = build_schema_description(&native).unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_describe_uses_catalog_defaults() {
        let native = OrcSchema::parse("struct<flag:boolean,at:timestamp,small:tinyint>").unwrap();
        let schema = build_schema_description(&native).unwrap();
        let types: Vec<_> = schema.iter().map(|f| f.host_type).collect();
        assert_eq!(
            types,
            [
                Some(HostType::Boolean),
                Some(HostType::Timestamp),
                Some(HostType::Integer)
            ]
        );
        assert!(schema.iter().all(|f| !f.nullable && f.default_value.is_none()));
    }

    #[test]
    fn test_root_must_be_struct() {
        assert!(build_schema_description(&OrcSchema::Int).is_err());
    }
}
