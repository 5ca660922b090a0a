//! Host-attribute metadata codec.
//!
//! Columnar formats cannot express a field's declared host type or its
//! default value, and ORC cannot express nullability. These attributes are
//! stored as file-level key/value pairs named
//! `rowshim.<field>.<TYPE|NULLABLE|DEFAULT>`.
//!
//! Writing is exhaustive: all three keys are emitted for every field.
//! Reading is tolerant: each key is looked up on its own and a missing or
//! malformed value leaves the property as the schema converter produced
//! it, so files written without host metadata stay readable.

use std::collections::BTreeMap;

use tracing::debug;

use crate::host::HostType;
use crate::schema::{NativeTypeSpec, SchemaDescription};

/// Key prefix distinguishing host-authored entries from other metadata.
pub const METADATA_NAMESPACE: &str = "rowshim";

/// File-level user metadata.
pub type UserMetadata = BTreeMap<String, Vec<u8>>;

/// Destination for encoded metadata entries.
pub trait MetadataSink {
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&mut self, key: String, value: Vec<u8>);
}

/// Lookup over recovered metadata entries.
pub trait MetadataSource {
    /// Returns the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<&[u8]>;
}

impl MetadataSink for UserMetadata {
    fn put(&mut self, key: String, value: Vec<u8>) {
        self.insert(key, value);
    }
}

impl MetadataSource for UserMetadata {
    fn get(&self, key: &str) -> Option<&[u8]> {
        BTreeMap::get(self, key).map(Vec::as_slice)
    }
}

/// One host attribute carried per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataProperty {
    /// Declared host type id.
    Type,
    /// `true` / `false`.
    Nullable,
    /// Default value text; empty when absent.
    Default,
}

impl MetadataProperty {
    /// Key suffix.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Nullable => "NULLABLE",
            Self::Default => "DEFAULT",
        }
    }
}

/// Returns the metadata key for `property` of `field`.
#[must_use]
pub fn metadata_key(field: &str, property: MetadataProperty) -> String {
    format!("{METADATA_NAMESPACE}.{field}.{}", property.suffix())
}

/// Writes the host attributes of every field in `schema` into `sink`.
pub fn write_metadata<T: NativeTypeSpec>(
    schema: &SchemaDescription<T>,
    sink: &mut impl MetadataSink,
) {
    for field in schema {
        let name = &field.native_name;
        let type_id = field.host_type.map_or(0, HostType::id);
        sink.put(
            metadata_key(name, MetadataProperty::Type),
            type_id.to_string().into_bytes(),
        );
        sink.put(
            metadata_key(name, MetadataProperty::Nullable),
            field.nullable.to_string().into_bytes(),
        );
        sink.put(
            metadata_key(name, MetadataProperty::Default),
            field.default_value.clone().unwrap_or_default().into_bytes(),
        );
    }
}

/// Applies recovered host attributes to `schema` and returns how many
/// properties were found.
pub fn read_metadata<T: NativeTypeSpec>(
    schema: &mut SchemaDescription<T>,
    source: &impl MetadataSource,
) -> usize {
    let mut recovered = 0;
    for field in schema.fields_mut() {
        let text = |property| {
            source
                .get(&metadata_key(&field.native_name, property))
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .map(str::to_string)
        };
        let type_text = text(MetadataProperty::Type);
        let nullable_text = text(MetadataProperty::Nullable);
        let default_text = text(MetadataProperty::Default);

        if let Some(raw) = type_text {
            match raw.trim().parse::<u32>() {
                Ok(0) => {
                    field.host_type = None;
                    recovered += 1;
                }
                Ok(id) if HostType::from_id(id).is_some() => {
                    field.host_type = HostType::from_id(id);
                    recovered += 1;
                }
                _ => debug!(field = %field.native_name, value = %raw, "ignoring host type metadata"),
            }
        }
        if let Some(raw) = nullable_text {
            match raw.trim() {
                "true" => field.nullable = true,
                "false" => field.nullable = false,
                other => {
                    debug!(field = %field.native_name, value = %other, "ignoring nullable metadata");
                    continue;
                }
            }
            recovered += 1;
        }
        if let Some(raw) = default_text {
            field.default_value = (!raw.is_empty()).then_some(raw);
            recovered += 1;
        }
    }
    recovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::test_catalog::TestType;
    use crate::schema::SchemaField;

    fn schema() -> SchemaDescription<TestType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", TestType::Text).with_nullable(true),
            SchemaField::new("age", TestType::Long)
                .with_host_type(HostType::Number)
                .with_default("18"),
        ])
        .unwrap()
    }

    fn bare() -> SchemaDescription<TestType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", TestType::Text),
            SchemaField::new("age", TestType::Long),
        ])
        .unwrap()
    }

    #[test]
    fn test_write_emits_three_keys_per_field() {
        let mut meta = UserMetadata::new();
        write_metadata(&schema(), &mut meta);
        assert_eq!(meta.len(), 6);
        assert_eq!(meta["rowshim.name.TYPE"], b"2");
        assert_eq!(meta["rowshim.name.NULLABLE"], b"true");
        assert_eq!(meta["rowshim.name.DEFAULT"], b"");
        assert_eq!(meta["rowshim.age.TYPE"], b"1");
        assert_eq!(meta["rowshim.age.DEFAULT"], b"18");
    }

    #[test]
    fn test_read_restores_written_attributes() {
        let mut meta = UserMetadata::new();
        write_metadata(&schema(), &mut meta);
        let mut recovered = bare();
        assert_eq!(read_metadata(&mut recovered, &meta), 6);
        assert_eq!(recovered, schema());
    }

    #[test]
    fn test_missing_metadata_keeps_structural_defaults() {
        let mut recovered = bare();
        assert_eq!(read_metadata(&mut recovered, &UserMetadata::new()), 0);
        assert_eq!(recovered, bare());
        assert!(recovered.iter().all(|f| !f.nullable && f.default_value.is_none()));
    }

    #[test]
    fn test_partial_and_malformed_entries() {
        let mut meta = UserMetadata::new();
        meta.put("rowshim.age.NULLABLE".into(), b"true".to_vec());
        meta.put("rowshim.age.TYPE".into(), b"seven".to_vec());
        meta.put("rowshim.name.TYPE".into(), b"99".to_vec());
        meta.put("other.name.TYPE".into(), b"4".to_vec());
        let mut recovered = bare();
        assert_eq!(read_metadata(&mut recovered, &meta), 1);
        assert_eq!(recovered.fields()[0].host_type, Some(HostType::String));
        assert_eq!(recovered.fields()[1].host_type, Some(HostType::Integer));
        assert!(recovered.fields()[1].nullable);
    }
}
