//! Text form of a schema description.
//!
//! One record per line, columns separated by `|`:
//!
//! ```text
//! nativeFieldName|hostFieldName|nativeTypeId|hostTypeId|precision|scale|stringFormat|nullable|defaultValue
//! ```
//!
//! Empty columns are absent values and host type id `0` is "no type".
//! Records with only the first seven columns are accepted (not nullable,
//! no default).

use super::{NativeTypeSpec, SchemaDescription, SchemaField};
use crate::error::{FormatError, FormatResult};
use crate::host::HostType;

/// Column separator.
pub const FIELD_DELIMITER: char = '|';

/// Record separator.
pub const RECORD_DELIMITER: char = '\n';

const FULL_COLUMNS: usize = 9;
const BASE_COLUMNS: usize = 7;

/// Renders `schema` as text.
///
/// # Errors
///
/// Returns [`FormatError::InvalidConfig`] if any value contains a
/// delimiter.
pub fn marshal<T: NativeTypeSpec>(schema: &SchemaDescription<T>) -> FormatResult<String> {
    let mut out = String::new();
    for field in schema {
        let columns = [
            field.native_name.clone(),
            field.host_name.clone(),
            field.native_type.id().to_string(),
            field.host_type.map_or(0, HostType::id).to_string(),
            opt_to_text(field.precision),
            opt_to_text(field.scale),
            field.string_format.clone().unwrap_or_default(),
            field.nullable.to_string(),
            field.default_value.clone().unwrap_or_default(),
        ];
        if let Some(bad) = columns
            .iter()
            .find(|c| c.contains([FIELD_DELIMITER, RECORD_DELIMITER, '\r']))
        {
            return Err(FormatError::invalid_config(
                "schema",
                format!(
                    "field '{}' has a value containing a delimiter: {bad:?}",
                    field.native_name
                ),
            ));
        }
        out.push_str(&columns.join("|"));
        out.push(RECORD_DELIMITER);
    }
    Ok(out)
}

/// Parses text produced by [`marshal`].
///
/// # Errors
///
/// Returns [`FormatError::InvalidConfig`] for malformed records, unknown
/// type ids or duplicate names.
pub fn unmarshal<T: NativeTypeSpec>(text: &str) -> FormatResult<SchemaDescription<T>> {
    let mut fields = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let bad = |message: String| {
            FormatError::invalid_config("schema", format!("record {}: {message}", line_no + 1))
        };
        let cols: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if cols.len() != FULL_COLUMNS && cols.len() != BASE_COLUMNS {
            return Err(bad(format!(
                "expected {BASE_COLUMNS} or {FULL_COLUMNS} columns, found {}",
                cols.len()
            )));
        }
        let native_id: u32 = cols[2]
            .parse()
            .map_err(|_| bad(format!("invalid native type id '{}'", cols[2])))?;
        let native_type = T::from_id(native_id)
            .ok_or_else(|| bad(format!("unknown native type id {native_id}")))?;
        let host_id: u32 = cols[3]
            .parse()
            .map_err(|_| bad(format!("invalid host type id '{}'", cols[3])))?;
        let host_type = match host_id {
            0 => None,
            id => Some(
                HostType::from_id(id).ok_or_else(|| bad(format!("unknown host type id {id}")))?,
            ),
        };
        let (nullable, default_value) = if cols.len() == FULL_COLUMNS {
            let nullable = cols[7]
                .parse::<bool>()
                .map_err(|_| bad(format!("invalid nullable flag '{}'", cols[7])))?;
            (nullable, text_to_opt(cols[8]))
        } else {
            (false, None)
        };
        fields.push(SchemaField {
            native_name: cols[0].to_string(),
            host_name: cols[1].to_string(),
            native_type,
            host_type,
            precision: parse_opt(cols[4]).map_err(|()| bad(format!("invalid precision '{}'", cols[4])))?,
            scale: parse_opt(cols[5]).map_err(|()| bad(format!("invalid scale '{}'", cols[5])))?,
            string_format: text_to_opt(cols[6]),
            nullable,
            default_value,
        });
    }
    SchemaDescription::from_fields(fields)
}

fn opt_to_text(v: Option<u32>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn text_to_opt(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_opt(s: &str) -> Result<Option<u32>, ()> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse().map(Some).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::test_catalog::TestType;

    fn sample() -> SchemaDescription<TestType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", TestType::Text).with_nullable(true),
            SchemaField::new("age", TestType::Long)
                .with_host_name("Age")
                .with_default("0"),
            SchemaField::new("price", TestType::Decimal).with_decimal(10, 2),
            SchemaField::new("born", TestType::Text)
                .with_host_type(HostType::Date)
                .with_string_format("%Y-%m-%d"),
        ])
        .unwrap()
    }

    #[test]
    fn test_marshal_format() {
        let text = marshal(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name|name|1|2||||true|");
        assert_eq!(lines[1], "age|Age|2|5||||false|0");
        assert_eq!(lines[2], "price|price|3|6|10|2||false|");
        assert_eq!(lines[3], "born|born|1|3|||%Y-%m-%d|false|");
    }

    #[test]
    fn test_unmarshal_inverts_marshal() {
        let schema = sample();
        let back: SchemaDescription<TestType> = unmarshal(&marshal(&schema).unwrap()).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_seven_column_records() {
        let back: SchemaDescription<TestType> = unmarshal("age|age|2|5|||\nnote|note|4|0|||\n").unwrap();
        assert_eq!(back.len(), 2);
        assert!(!back.fields()[0].nullable);
        assert_eq!(back.fields()[1].native_type, TestType::Blob);
        assert_eq!(back.fields()[1].host_type, None);
    }

    #[test]
    fn test_delimiter_in_value_is_config_error() {
        let schema =
            SchemaDescription::from_fields(vec![SchemaField::new("a|b", TestType::Text)]).unwrap();
        assert!(matches!(marshal(&schema), Err(FormatError::InvalidConfig { .. })));
        let schema = SchemaDescription::from_fields(vec![
            SchemaField::new("a", TestType::Text).with_default("x\ny"),
        ])
        .unwrap();
        assert!(marshal(&schema).is_err());
    }

    #[test]
    fn test_unmarshal_errors() {
        assert!(unmarshal::<TestType>("a|a|1\n").is_err());
        assert!(unmarshal::<TestType>("a|a|99|2|||\n").is_err());
        assert!(unmarshal::<TestType>("a|a|1|7|||\n").is_err());
        assert!(unmarshal::<TestType>("a|a|1|2|x||\n").is_err());
        assert!(unmarshal::<TestType>("a|a|1|2||||maybe|\n").is_err());
        assert!(unmarshal::<TestType>("a|a|1|2|||\na|b|1|2|||\n").is_err());
    }
}
