//! Avro schema tree and its JSON form.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::AvroType;
use crate::error::{FormatError, FormatResult};

/// An Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    /// `null`.
    Null,
    /// `boolean`.
    Boolean,
    /// `int`.
    Int,
    /// `long`.
    Long,
    /// `float`.
    Float,
    /// `double`.
    Double,
    /// `bytes`.
    Bytes,
    /// `string`.
    String,
    /// Named record.
    Record(AvroRecord),
    /// Named enumeration.
    Enum {
        /// Type name.
        name: String,
        /// Symbols in ordinal order.
        symbols: Vec<String>,
    },
    /// Array of items.
    Array(Box<AvroSchema>),
    /// String-keyed map.
    Map(Box<AvroSchema>),
    /// Named fixed-size bytes.
    Fixed {
        /// Type name.
        name: String,
        /// Width in bytes.
        size: usize,
    },
    /// Union of branches.
    Union(Vec<AvroSchema>),
    /// `decimal` logical type over `bytes`, or over `fixed` when
    /// `fixed_size` is set.
    Decimal {
        /// Total digits.
        precision: u32,
        /// Digits after the point.
        scale: u32,
        /// Width of the underlying fixed type.
        fixed_size: Option<usize>,
    },
    /// `date`.
    Date,
    /// `time-millis`.
    TimeMillis,
    /// `time-micros`.
    TimeMicros,
    /// `timestamp-millis`.
    TimestampMillis,
    /// `timestamp-micros`.
    TimestampMicros,
}

/// A named record.
#[derive(Debug, Clone, PartialEq)]
pub struct AvroRecord {
    /// Record name.
    pub name: String,
    /// Optional namespace.
    pub namespace: Option<String>,
    /// Fields in order.
    pub fields: Vec<AvroField>,
}

/// A record field.
#[derive(Debug, Clone, PartialEq)]
pub struct AvroField {
    /// Field name.
    pub name: String,
    /// Field schema.
    pub schema: AvroSchema,
    /// JSON default value.
    pub default: Option<Value>,
}

impl AvroSchema {
    /// Parses an Avro JSON schema document.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SchemaMismatch`] for invalid JSON or schema
    /// shapes, including references to undefined named types.
    pub fn parse(text: &str) -> FormatResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FormatError::SchemaMismatch(format!("invalid Avro schema JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Builds a schema from parsed JSON.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn from_json(value: &Value) -> FormatResult<Self> {
        Parser::default().parse(value)
    }

    /// Renders the schema as JSON. Named types are written inline at
    /// every use.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => json!("null"),
            Self::Boolean => json!("boolean"),
            Self::Int => json!("int"),
            Self::Long => json!("long"),
            Self::Float => json!("float"),
            Self::Double => json!("double"),
            Self::Bytes => json!("bytes"),
            Self::String => json!("string"),
            Self::Record(record) => {
                let fields: Vec<Value> = record
                    .fields
                    .iter()
                    .map(|f| {
                        let mut obj = Map::new();
                        obj.insert("name".into(), json!(f.name));
                        obj.insert("type".into(), f.schema.to_json());
                        if let Some(default) = &f.default {
                            obj.insert("default".into(), default.clone());
                        }
                        Value::Object(obj)
                    })
                    .collect();
                let mut obj = Map::new();
                obj.insert("type".into(), json!("record"));
                obj.insert("name".into(), json!(record.name));
                if let Some(ns) = &record.namespace {
                    obj.insert("namespace".into(), json!(ns));
                }
                obj.insert("fields".into(), Value::Array(fields));
                Value::Object(obj)
            }
            Self::Enum { name, symbols } => {
                json!({"type": "enum", "name": name, "symbols": symbols})
            }
            Self::Array(items) => json!({"type": "array", "items": items.to_json()}),
            Self::Map(values) => json!({"type": "map", "values": values.to_json()}),
            Self::Fixed { name, size } => json!({"type": "fixed", "name": name, "size": size}),
            Self::Union(branches) => Value::Array(branches.iter().map(Self::to_json).collect()),
            Self::Decimal {
                precision,
                scale,
                fixed_size: None,
            } => json!({"type": "bytes", "logicalType": "decimal", "precision": precision, "scale": scale}),
            Self::Decimal {
                precision,
                scale,
                fixed_size: Some(size),
            } => json!({
                "type": "fixed", "name": format!("decimal_{precision}_{scale}"), "size": size,
                "logicalType": "decimal", "precision": precision, "scale": scale
            }),
            Self::Date => json!({"type": "int", "logicalType": "date"}),
            Self::TimeMillis => json!({"type": "int", "logicalType": "time-millis"}),
            Self::TimeMicros => json!({"type": "long", "logicalType": "time-micros"}),
            Self::TimestampMillis => json!({"type": "long", "logicalType": "timestamp-millis"}),
            Self::TimestampMicros => json!({"type": "long", "logicalType": "timestamp-micros"}),
        }
    }

    /// Renders the schema as a compact JSON string.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Catalog entry for this schema node.
    #[must_use]
    pub fn avro_type(&self) -> AvroType {
        match self {
            Self::Null => AvroType::Null,
            Self::Boolean => AvroType::Boolean,
            Self::Int => AvroType::Int,
            Self::Long => AvroType::Long,
            Self::Float => AvroType::Float,
            Self::Double => AvroType::Double,
            Self::Bytes => AvroType::Bytes,
            Self::String => AvroType::String,
            Self::Record(_) => AvroType::Record,
            Self::Enum { .. } => AvroType::Enum,
            Self::Array(_) => AvroType::Array,
            Self::Map(_) => AvroType::Map,
            Self::Fixed { .. } => AvroType::Fixed,
            Self::Union(_) => AvroType::Union,
            Self::Decimal {
                fixed_size: None, ..
            } => AvroType::Decimal,
            Self::Decimal { .. } => AvroType::DecimalFixed,
            Self::Date => AvroType::Date,
            Self::TimeMillis => AvroType::TimeMillis,
            Self::TimeMicros => AvroType::TimeMicros,
            Self::TimestampMillis => AvroType::TimestampMillis,
            Self::TimestampMicros => AvroType::TimestampMicros,
        }
    }

    /// Splits a nullable union into its single non-null branch.
    ///
    /// Returns `(self, false)` for non-unions, `(branch, true)` for a union
    /// of `null` and one other branch, and `None` for unions with more than
    /// one non-null branch.
    #[must_use]
    pub fn non_null(&self) -> Option<(&AvroSchema, bool)> {
        let Self::Union(branches) = self else {
            return Some((self, false));
        };
        let mut non_null = branches.iter().filter(|b| **b != Self::Null);
        let first = non_null.next()?;
        if non_null.next().is_some() {
            return None;
        }
        Some((first, branches.len() > 1))
    }

    /// Returns `true` for nodes a host value can be read from.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::Null | Self::Record(_) | Self::Array(_) | Self::Map(_) | Self::Union(_)
        )
    }

    /// Returns the record if this is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&AvroRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Parser {
    named: HashMap<String, AvroSchema>,
}

impl Parser {
    fn parse(&mut self, value: &Value) -> FormatResult<AvroSchema> {
        match value {
            Value::String(name) => self.parse_name(name),
            Value::Array(branches) => Ok(AvroSchema::Union(
                branches
                    .iter()
                    .map(|b| self.parse(b))
                    .collect::<FormatResult<_>>()?,
            )),
            Value::Object(obj) => self.parse_object(obj),
            other => Err(invalid(format!("unexpected schema node {other}"))),
        }
    }

    fn parse_name(&self, name: &str) -> FormatResult<AvroSchema> {
        Ok(match name {
            "null" => AvroSchema::Null,
            "boolean" => AvroSchema::Boolean,
            "int" => AvroSchema::Int,
            "long" => AvroSchema::Long,
            "float" => AvroSchema::Float,
            "double" => AvroSchema::Double,
            "bytes" => AvroSchema::Bytes,
            "string" => AvroSchema::String,
            other => self
                .named
                .get(other)
                .or_else(|| {
                    let short = other.rsplit('.').next().unwrap_or(other);
                    self.named.get(short)
                })
                .cloned()
                .ok_or_else(|| invalid(format!("unknown type '{other}'")))?,
        })
    }

    fn parse_object(&mut self, obj: &Map<String, Value>) -> FormatResult<AvroSchema> {
        let type_node = obj
            .get("type")
            .ok_or_else(|| invalid("schema object missing 'type'".into()))?;
        let Some(type_name) = type_node.as_str() else {
            // {"type": {...}} or {"type": [...]} wraps another schema.
            return self.parse(type_node);
        };
        if let Some(logical) = obj.get("logicalType").and_then(Value::as_str) {
            if let Some(schema) = parse_logical(logical, type_name, obj)? {
                if let AvroSchema::Decimal { fixed_size: Some(_), .. } = &schema {
                    self.register(obj, &schema);
                }
                return Ok(schema);
            }
        }
        match type_name {
            "record" | "error" => {
                let name = str_attr(obj, "name")?;
                let fields_node = obj
                    .get("fields")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid(format!("record '{name}' missing 'fields'")))?;
                // Register a placeholder so recursive references resolve.
                let mut record = AvroRecord {
                    name: name.clone(),
                    namespace: obj.get("namespace").and_then(Value::as_str).map(str::to_string),
                    fields: Vec::new(),
                };
                self.named.insert(name.clone(), AvroSchema::Record(record.clone()));
                for f in fields_node {
                    let f = f
                        .as_object()
                        .ok_or_else(|| invalid(format!("record '{name}' has a non-object field")))?;
                    let field_name = str_attr(f, "name")?;
                    let field_type = f
                        .get("type")
                        .ok_or_else(|| invalid(format!("field '{field_name}' missing 'type'")))?;
                    record.fields.push(AvroField {
                        name: field_name,
                        schema: self.parse(field_type)?,
                        default: f.get("default").cloned(),
                    });
                }
                let schema = AvroSchema::Record(record);
                self.named.insert(name, schema.clone());
                Ok(schema)
            }
            "enum" => {
                let name = str_attr(obj, "name")?;
                let symbols = obj
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid(format!("enum '{name}' missing 'symbols'")))?
                    .iter()
                    .map(|s| {
                        s.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid(format!("enum '{name}' has a non-string symbol")))
                    })
                    .collect::<FormatResult<Vec<_>>>()?;
                let schema = AvroSchema::Enum {
                    name: name.clone(),
                    symbols,
                };
                self.named.insert(name, schema.clone());
                Ok(schema)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| invalid("array missing 'items'".into()))?;
                Ok(AvroSchema::Array(Box::new(self.parse(items)?)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| invalid("map missing 'values'".into()))?;
                Ok(AvroSchema::Map(Box::new(self.parse(values)?)))
            }
            "fixed" => {
                let name = str_attr(obj, "name")?;
                let size = fixed_size(obj)?;
                let schema = AvroSchema::Fixed {
                    name: name.clone(),
                    size,
                };
                self.named.insert(name, schema.clone());
                Ok(schema)
            }
            primitive => self.parse_name(primitive),
        }
    }

    fn register(&mut self, obj: &Map<String, Value>, schema: &AvroSchema) {
        if let Some(name) = obj.get("name").and_then(Value::as_str) {
            self.named.insert(name.to_string(), schema.clone());
        }
    }
}

fn parse_logical(
    logical: &str,
    base: &str,
    obj: &Map<String, Value>,
) -> FormatResult<Option<AvroSchema>> {
    Ok(match (logical, base) {
        ("decimal", "bytes" | "fixed") => {
            let precision = u32_attr(obj, "precision")?
                .ok_or_else(|| invalid("decimal missing 'precision'".into()))?;
            let scale = u32_attr(obj, "scale")?.unwrap_or(0);
            let fixed_size = if base == "fixed" {
                Some(fixed_size(obj)?)
            } else {
                None
            };
            Some(AvroSchema::Decimal {
                precision,
                scale,
                fixed_size,
            })
        }
        ("date", "int") => Some(AvroSchema::Date),
        ("time-millis", "int") => Some(AvroSchema::TimeMillis),
        ("time-micros", "long") => Some(AvroSchema::TimeMicros),
        ("timestamp-millis", "long") => Some(AvroSchema::TimestampMillis),
        ("timestamp-micros", "long") => Some(AvroSchema::TimestampMicros),
        // Unknown logical types fall back to their underlying type.
        _ => None,
    })
}

fn str_attr(obj: &Map<String, Value>, key: &str) -> FormatResult<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("missing string attribute '{key}'")))
}

fn u32_attr(obj: &Map<String, Value>, key: &str) -> FormatResult<Option<u32>> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(format!("attribute '{key}' is not a small integer"))),
    }
}

fn fixed_size(obj: &Map<String, Value>) -> FormatResult<usize> {
    obj.get("size")
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid("fixed missing 'size'".into()))
}

fn invalid(message: String) -> FormatError {
    FormatError::SchemaMismatch(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = r#"{
        "type": "record",
        "name": "people",
        "namespace": "org.example",
        "fields": [
            {"name": "name", "type": ["null", "string"]},
            {"name": "age", "type": "long", "default": 0},
            {"name": "price", "type": {"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}},
            {"name": "born", "type": {"type": "int", "logicalType": "date"}},
            {"name": "color", "type": {"type": "enum", "name": "Color", "symbols": ["RED", "GREEN"]}},
            {"name": "shade", "type": "Color"},
            {"name": "address", "type": {"type": "record", "name": "addr", "fields": [
                {"name": "city", "type": "string"}
            ]}}
        ]
    }"#;

    #[test]
    fn test_parse_record() {
        let schema = AvroSchema::parse(PEOPLE).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.name, "people");
        assert_eq!(record.namespace.as_deref(), Some("org.example"));
        assert_eq!(record.fields.len(), 7);
        assert_eq!(
            record.fields[0].schema,
            AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::String])
        );
        assert_eq!(record.fields[1].default, Some(json!(0)));
        assert_eq!(
            record.fields[2].schema,
            AvroSchema::Decimal {
                precision: 10,
                scale: 2,
                fixed_size: None
            }
        );
        assert_eq!(record.fields[3].schema, AvroSchema::Date);
        assert_eq!(record.fields[5].schema.avro_type(), AvroType::Enum);
        assert_eq!(record.fields[6].schema.avro_type(), AvroType::Record);
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = AvroSchema::parse(PEOPLE).unwrap();
        let again = AvroSchema::parse(&schema.to_json_string()).unwrap();
        assert_eq!(schema, again);
    }

    #[test]
    fn test_fixed_decimal() {
        let schema = AvroSchema::parse(
            r#"{"type": "fixed", "name": "d", "size": 16, "logicalType": "decimal", "precision": 30, "scale": 4}"#,
        )
        .unwrap();
        assert_eq!(schema.avro_type(), AvroType::DecimalFixed);
        assert_eq!(AvroSchema::parse(&schema.to_json_string()).unwrap(), schema);
    }

    #[test]
    fn test_non_null_branch() {
        let nullable = AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::Int]);
        assert_eq!(nullable.non_null(), Some((&AvroSchema::Int, true)));
        let reversed = AvroSchema::Union(vec![AvroSchema::Int, AvroSchema::Null]);
        assert_eq!(reversed.non_null(), Some((&AvroSchema::Int, true)));
        assert_eq!(AvroSchema::Long.non_null(), Some((&AvroSchema::Long, false)));
        let ambiguous = AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::Int, AvroSchema::String]);
        assert_eq!(ambiguous.non_null(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(AvroSchema::parse("{").is_err());
        assert!(AvroSchema::parse(r#"{"type": "record", "name": "r"}"#).is_err());
        assert!(AvroSchema::parse(r#""Unknown""#).is_err());
        assert!(AvroSchema::parse(r#"{"type": "bytes", "logicalType": "decimal"}"#).is_err());
    }

    #[test]
    fn test_unknown_logical_type_falls_back() {
        let schema = AvroSchema::parse(r#"{"type": "string", "logicalType": "uuid"}"#).unwrap();
        assert_eq!(schema, AvroSchema::String);
    }
}
