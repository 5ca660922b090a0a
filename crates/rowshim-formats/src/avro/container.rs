//! Object container header carrying the exact writer schema.
//!
//! `arrow-avro`'s own container format regenerates the header schema from
//! the Arrow columns. That loses record names and field defaults, and its
//! null-first unions disagree with the encoder whenever a default puts the
//! value branch first. [`ContainerFormat`] writes the JSON the encoder was
//! built from instead.

use std::io::Write;

use arrow_avro::compression::CompressionCodec;
use arrow_avro::writer::format::AvroFormat;
use arrow_schema::{ArrowError, Schema};

use super::io::AVRO_SCHEMA_KEY;

const MAGIC: &[u8; 4] = b"Obj\x01";
const CODEC_KEY: &str = "avro.codec";

/// Uncompressed container format whose header schema is taken verbatim
/// from the [`AVRO_SCHEMA_KEY`] metadata entry.
#[derive(Debug, Default)]
pub(crate) struct ContainerFormat {
    sync_marker: [u8; 16],
}

impl AvroFormat for ContainerFormat {
    const NEEDS_PREFIX: bool = false;

    fn start_stream<W: Write>(
        &mut self,
        writer: &mut W,
        schema: &Schema,
        compression: Option<CompressionCodec>,
    ) -> Result<(), ArrowError> {
        if compression.is_some() {
            return Err(ArrowError::InvalidArgumentError(
                "container blocks are written uncompressed".into(),
            ));
        }
        let json = schema.metadata().get(AVRO_SCHEMA_KEY).ok_or_else(|| {
            ArrowError::SchemaError(format!("missing '{AVRO_SCHEMA_KEY}' metadata"))
        })?;
        self.sync_marker = rand::random();

        let mut header = Vec::with_capacity(json.len() + 64);
        header.extend_from_slice(MAGIC);
        write_long(&mut header, 2);
        write_bytes(&mut header, AVRO_SCHEMA_KEY.as_bytes());
        write_bytes(&mut header, json.as_bytes());
        write_bytes(&mut header, CODEC_KEY.as_bytes());
        write_bytes(&mut header, b"null");
        write_long(&mut header, 0);
        header.extend_from_slice(&self.sync_marker);
        writer
            .write_all(&header)
            .map_err(|e| ArrowError::IoError(format!("write avro header: {e}"), e))
    }

    fn sync_marker(&self) -> Option<&[u8; 16]> {
        Some(&self.sync_marker)
    }
}

/// Zig-zag varint, the Avro `long` encoding.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn write_long(out: &mut Vec<u8>, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        out.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, i64::try_from(bytes.len()).unwrap_or(i64::MAX));
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_zigzag_long() {
        let encode = |v| {
            let mut out = Vec::new();
            write_long(&mut out, v);
            out
        };
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(-1), [0x01]);
        assert_eq!(encode(1), [0x02]);
        assert_eq!(encode(64), [0x80, 0x01]);
        assert_eq!(encode(-65), [0x81, 0x01]);
    }

    #[test]
    fn test_header_carries_schema_verbatim() {
        let json = r#"{"type":"record","name":"person","fields":[]}"#;
        let schema = Schema::empty().with_metadata(HashMap::from([(
            AVRO_SCHEMA_KEY.to_string(),
            json.to_string(),
        )]));
        let mut format = ContainerFormat::default();
        let mut out = Vec::new();
        format.start_stream(&mut out, &schema, None).unwrap();

        assert!(out.starts_with(MAGIC));
        assert!(out
            .windows(json.len())
            .any(|w| w == json.as_bytes()));
        assert!(out.ends_with(format.sync_marker().unwrap()));
    }

    #[test]
    fn test_missing_schema_metadata() {
        let mut format = ContainerFormat::default();
        let err = format
            .start_stream(&mut Vec::new(), &Schema::empty(), None)
            .unwrap_err();
        assert!(matches!(err, ArrowError::SchemaError(_)));
    }
}
