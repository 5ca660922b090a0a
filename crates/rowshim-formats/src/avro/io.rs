//! Avro object container file streams.
//!
//! Writing builds the Avro schema from the description once and attaches
//! it to the Arrow schema under [`AVRO_SCHEMA_KEY`]. `arrow-avro` encodes
//! against that JSON and the container header repeats it verbatim, so
//! record names, union order and defaults survive. Reading takes the
//! schema from the container header, falling back to deriving one from
//! the Arrow columns when the header JSON is outside the supported model.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_avro::reader::{Reader, ReaderBuilder};
use arrow_avro::writer::{Writer, WriterBuilder};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use tracing::{debug, info, warn};

use super::container::ContainerFormat;
use super::mapping::{build_native_schema, build_schema_description, DEFAULT_RECORD_NAME};
use super::path::resolve;
use super::value::{encode_target, AvroValueConverter};
use super::{AvroField, AvroRecord, AvroSchema, AvroType};
use crate::config::ConversionConfig;
use crate::error::{FormatError, FormatResult};
use crate::schema::{legacy, SchemaDescription};
use crate::stream::{
    arrow_fields, validate_defaults, BatchRowReader, BatchRowWriter, BatchSink, DEFAULT_BATCH_SIZE,
};

/// Arrow schema metadata key holding the Avro schema JSON.
pub const AVRO_SCHEMA_KEY: &str = "avro.schema";

const FORMAT: &str = "avro";

/// Row writer producing an Avro object container file.
pub type AvroRowWriter = BatchRowWriter<AvroValueConverter, AvroSink>;

/// Row reader over an Avro object container file.
pub type AvroRowReader = BatchRowReader<AvroValueConverter, Reader<BufReader<File>>>;

/// Settings for [`create_writer`].
#[derive(Debug, Clone)]
pub struct AvroWriterConfig {
    /// Name of the top-level record (default: `"row"`).
    pub record_name: String,
    /// Optional namespace of the top-level record.
    pub namespace: Option<String>,
    /// Rows per encoded block.
    pub batch_size: usize,
    /// Shared conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for AvroWriterConfig {
    fn default() -> Self {
        Self {
            record_name: DEFAULT_RECORD_NAME.to_string(),
            namespace: None,
            batch_size: DEFAULT_BATCH_SIZE,
            conversion: ConversionConfig::default(),
        }
    }
}

impl AvroWriterConfig {
    /// Sets the record name.
    #[must_use]
    pub fn with_record_name(mut self, name: impl Into<String>) -> Self {
        self.record_name = name.into();
        self
    }

    /// Sets the record namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the rows per block.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the conversion settings.
    #[must_use]
    pub fn with_conversion(mut self, conversion: ConversionConfig) -> Self {
        self.conversion = conversion;
        self
    }
}

/// Settings for [`open_reader`].
#[derive(Debug, Clone)]
pub struct AvroReaderConfig {
    /// Rows per decoded batch.
    pub batch_size: usize,
    /// Schema to read with instead of the one discovered in the file.
    /// Native names are field paths into the file's record.
    pub schema: Option<SchemaDescription<AvroType>>,
    /// Shared conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for AvroReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            schema: None,
            conversion: ConversionConfig::default(),
        }
    }
}

impl AvroReaderConfig {
    /// Reads with `schema` instead of the discovered one.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaDescription<AvroType>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the rows per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the conversion settings.
    #[must_use]
    pub fn with_conversion(mut self, conversion: ConversionConfig) -> Self {
        self.conversion = conversion;
        self
    }
}

/// Batch sink over an `arrow-avro` container writer.
pub struct AvroSink {
    writer: Writer<File, ContainerFormat>,
}

impl BatchSink for AvroSink {
    fn write_batch(&mut self, batch: &RecordBatch) -> FormatResult<()> {
        self.writer.write(batch)?;
        Ok(())
    }

    fn finish(mut self) -> FormatResult<()> {
        self.writer.finish()?;
        Ok(())
    }
}

impl std::fmt::Debug for AvroSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvroSink").finish_non_exhaustive()
    }
}

/// Creates a row writer for a new Avro file at `path`.
///
/// The schema is validated and converted before the file is created, so
/// setup errors leave nothing on disk.
///
/// # Errors
///
/// Returns setup errors from schema conversion, or I/O and Arrow errors
/// when the file or encoder cannot be created.
pub fn create_writer(
    path: impl AsRef<Path>,
    schema: SchemaDescription<AvroType>,
    config: &AvroWriterConfig,
) -> FormatResult<AvroRowWriter> {
    let native = build_native_schema(&schema, &config.record_name, config.namespace.as_deref())?;
    let arrow_schema = arrow_schema_for(&schema, &native)?;
    validate_defaults(&schema, config.conversion.zone)?;
    if config.batch_size == 0 {
        return Err(FormatError::invalid_config("batch_size", "must be positive"));
    }

    let path = path.as_ref();
    let file = File::create(path)?;
    let writer =
        WriterBuilder::new(arrow_schema.as_ref().clone()).build::<_, ContainerFormat>(file)?;
    info!(
        path = %path.display(),
        fields = schema.len(),
        record = %config.record_name,
        "opened avro writer"
    );

    BatchRowWriter::new(
        FORMAT,
        schema,
        AvroValueConverter::new(config.conversion.zone),
        arrow_schema,
        AvroSink { writer },
        config.batch_size,
        &config.conversion,
    )
}

/// Opens a row reader over the Avro file at `path`.
///
/// # Errors
///
/// Returns I/O and Arrow errors for unreadable files, and setup errors
/// when the schema cannot be described or a field path does not resolve.
pub fn open_reader(path: impl AsRef<Path>, config: &AvroReaderConfig) -> FormatResult<AvroRowReader> {
    if config.batch_size == 0 {
        return Err(FormatError::invalid_config("batch_size", "must be positive"));
    }
    let path = path.as_ref();
    let reader = open_native(path, config.batch_size)?;
    let native = native_schema_of(&reader)?;

    let schema = match &config.schema {
        Some(schema) => schema.clone(),
        None => build_schema_description(&native, &config.conversion)?,
    };
    schema.require_fields()?;

    let legacy = config.conversion.legacy_field_names && has_legacy_names(&native);
    let columns = schema
        .iter()
        .map(|field| resolve(&field.native_name, &native, legacy).map(|h| h.path))
        .collect::<FormatResult<Vec<_>>>()?;
    info!(path = %path.display(), fields = schema.len(), "opened avro reader");

    BatchRowReader::new(
        FORMAT,
        schema,
        AvroValueConverter::new(config.conversion.zone),
        columns,
        reader,
        &config.conversion,
    )
}

/// Discovers the schema description of the Avro file at `path`.
///
/// # Errors
///
/// See [`open_reader`].
pub fn read_schema(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> FormatResult<SchemaDescription<AvroType>> {
    let reader = open_native(path.as_ref(), DEFAULT_BATCH_SIZE)?;
    let native = native_schema_of(&reader)?;
    build_schema_description(&native, config)
}

fn open_native(path: &Path, batch_size: usize) -> FormatResult<Reader<BufReader<File>>> {
    let file = File::open(path)?;
    let reader = ReaderBuilder::new()
        .with_batch_size(batch_size)
        .build(BufReader::new(file))?;
    Ok(reader)
}

fn has_legacy_names(native: &AvroSchema) -> bool {
    native
        .as_record()
        .is_some_and(|r| legacy::is_legacy(r.fields.iter().map(|f| f.name.as_str())))
}

/// Builds the Arrow schema the encoder writes, one column per field.
fn arrow_schema_for(
    schema: &SchemaDescription<AvroType>,
    native: &AvroSchema,
) -> FormatResult<SchemaRef> {
    let fields = arrow_fields(schema, encode_target)?;
    let metadata = HashMap::from([(AVRO_SCHEMA_KEY.to_string(), native.to_json_string())]);
    Ok(Arc::new(Schema::new_with_metadata(fields, metadata)))
}

/// Returns the writer schema of an open file: the container header JSON
/// when it parses, otherwise one derived from the decoded Arrow columns.
fn native_schema_of(reader: &Reader<BufReader<File>>) -> FormatResult<AvroSchema> {
    let header = reader
        .avro_header()
        .get(AVRO_SCHEMA_KEY)
        .map(String::from_utf8_lossy);
    match header.as_deref().map(AvroSchema::parse) {
        Some(Ok(schema)) => {
            debug!("using container header schema");
            return Ok(schema);
        }
        Some(Err(e)) => warn!(error = %e, "unsupported avro header schema; deriving from columns"),
        None => debug!("no avro header schema, deriving from columns"),
    }
    derive_from_arrow(&reader.schema())
}

fn derive_from_arrow(arrow: &Schema) -> FormatResult<AvroSchema> {
    let fields = arrow
        .fields()
        .iter()
        .map(|f| field_from_arrow(f))
        .collect::<FormatResult<Vec<_>>>()?;
    Ok(AvroSchema::Record(AvroRecord {
        name: DEFAULT_RECORD_NAME.to_string(),
        namespace: None,
        fields,
    }))
}

fn field_from_arrow(field: &Field) -> FormatResult<AvroField> {
    let leaf = schema_from_arrow(field.name(), field.data_type())?;
    let schema = if field.is_nullable() {
        AvroSchema::Union(vec![AvroSchema::Null, leaf])
    } else {
        leaf
    };
    Ok(AvroField {
        name: field.name().clone(),
        schema,
        default: None,
    })
}

fn schema_from_arrow(name: &str, data_type: &DataType) -> FormatResult<AvroSchema> {
    Ok(match data_type {
        DataType::Null => AvroSchema::Null,
        DataType::Boolean => AvroSchema::Boolean,
        DataType::Int8 | DataType::Int16 | DataType::Int32 => AvroSchema::Int,
        DataType::Int64 => AvroSchema::Long,
        DataType::Float32 => AvroSchema::Float,
        DataType::Float64 => AvroSchema::Double,
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => AvroSchema::Bytes,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => AvroSchema::String,
        DataType::FixedSizeBinary(size) => AvroSchema::Fixed {
            name: name.to_string(),
            size: usize::try_from(*size).unwrap_or_default(),
        },
        DataType::Decimal128(precision, scale) => AvroSchema::Decimal {
            precision: u32::from(*precision),
            scale: u32::try_from(*scale)
                .map_err(|_| FormatError::unsupported(name, format!("decimal scale {scale}")))?,
            fixed_size: None,
        },
        DataType::Date32 => AvroSchema::Date,
        DataType::Time32(TimeUnit::Millisecond) => AvroSchema::TimeMillis,
        DataType::Time64(TimeUnit::Microsecond) => AvroSchema::TimeMicros,
        DataType::Timestamp(TimeUnit::Millisecond, _) => AvroSchema::TimestampMillis,
        DataType::Timestamp(TimeUnit::Microsecond, _) => AvroSchema::TimestampMicros,
        DataType::Dictionary(_, value) if value.as_ref() == &DataType::Utf8 => AvroSchema::Enum {
            name: name.to_string(),
            symbols: Vec::new(),
        },
        DataType::Struct(children) => AvroSchema::Record(AvroRecord {
            name: name.to_string(),
            namespace: None,
            fields: children
                .iter()
                .map(|c| field_from_arrow(c))
                .collect::<FormatResult<Vec<_>>>()?,
        }),
        DataType::List(item) | DataType::LargeList(item) => {
            AvroSchema::Array(Box::new(schema_from_arrow(item.name(), item.data_type())?))
        }
        DataType::Map(entries, _) => {
            let value = match entries.data_type() {
                DataType::Struct(kv) if kv.len() == 2 => {
                    schema_from_arrow(kv[1].name(), kv[1].data_type())?
                }
                other => return Err(FormatError::unsupported(name, other.to_string())),
            };
            AvroSchema::Map(Box::new(value))
        }
        other => return Err(FormatError::unsupported(name, other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostType;
    use crate::schema::SchemaField;
    use crate::stream::{RowReader, RowWriter};
    use crate::{HostRow, HostValue};

    fn people() -> SchemaDescription<AvroType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", AvroType::String),
            SchemaField::new("age", AvroType::Long).with_nullable(true),
        ])
        .unwrap()
    }

    #[test]
    fn test_arrow_schema_carries_avro_json() {
        let schema = people();
        let native = build_native_schema(&schema, "row", None).unwrap();
        let arrow = arrow_schema_for(&schema, &native).unwrap();
        assert_eq!(arrow.fields().len(), 2);
        assert_eq!(arrow.field(0).data_type(), &DataType::Utf8);
        assert!(!arrow.field(0).is_nullable());
        assert_eq!(arrow.field(1).data_type(), &DataType::Int64);
        assert!(arrow.field(1).is_nullable());
        let json = arrow.metadata().get(AVRO_SCHEMA_KEY).unwrap();
        assert_eq!(AvroSchema::parse(json).unwrap(), native);
    }

    #[test]
    fn test_decimal_without_metadata_rejected_before_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.avro");
        let schema =
            SchemaDescription::from_fields(vec![SchemaField::new("price", AvroType::Decimal)])
                .unwrap();
        let err = create_writer(&path, schema, &AvroWriterConfig::default()).unwrap_err();
        assert!(err.is_setup_error());
        assert!(!path.exists());
    }

    #[test]
    fn test_derive_from_arrow_columns() {
        let arrow = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("price", DataType::Decimal128(10, 2), true),
            Field::new(
                "at",
                DataType::Timestamp(TimeUnit::Millisecond, Some("+00:00".into())),
                false,
            ),
        ]);
        let native = derive_from_arrow(&arrow).unwrap();
        let record = native.as_record().unwrap();
        assert_eq!(record.fields[0].schema, AvroSchema::Long);
        assert_eq!(
            record.fields[1].schema,
            AvroSchema::Union(vec![
                AvroSchema::Null,
                AvroSchema::Decimal {
                    precision: 10,
                    scale: 2,
                    fixed_size: None
                }
            ])
        );
        assert_eq!(record.fields[2].schema, AvroSchema::TimestampMillis);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.avro");
        let mut writer = create_writer(&path, people(), &AvroWriterConfig::default()).unwrap();
        writer
            .write(&HostRow::from(vec![Some(HostValue::from("Alex")), Some(HostValue::Integer(87))]))
            .unwrap();
        writer
            .write(&HostRow::from(vec![Some(HostValue::from("Tom")), None]))
            .unwrap();
        writer.close().unwrap();

        let mut reader = open_reader(&path, &AvroReaderConfig::default()).unwrap();
        assert_eq!(reader.schema().fields()[1].host_type, Some(HostType::Integer));
        let rows = reader.rows().collect::<FormatResult<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some(&HostValue::from("Alex")));
        assert_eq!(rows[0].get(1), Some(&HostValue::Integer(87)));
        assert_eq!(rows[1].get(1), None);
        reader.close().unwrap();
    }

    #[test]
    fn test_defaults_and_record_name_survive_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.avro");
        let schema = SchemaDescription::from_fields(vec![
            SchemaField::new("name", AvroType::String),
            SchemaField::new("age", AvroType::Long)
                .with_nullable(true)
                .with_default("18"),
        ])
        .unwrap();
        let config = AvroWriterConfig::default()
            .with_record_name("person")
            .with_namespace("org.example");
        let mut writer = create_writer(&path, schema.clone(), &config).unwrap();
        writer
            .write(&HostRow::from(vec![Some(HostValue::from("Alex")), Some(HostValue::Integer(87))]))
            .unwrap();
        writer
            .write(&HostRow::from(vec![Some(HostValue::from("Tom")), None]))
            .unwrap();
        writer.close().unwrap();

        let native = native_schema_of(&open_native(&path, DEFAULT_BATCH_SIZE).unwrap()).unwrap();
        let record = native.as_record().unwrap();
        assert_eq!(record.name, "person");
        assert_eq!(record.namespace.as_deref(), Some("org.example"));
        assert_eq!(read_schema(&path, &ConversionConfig::default()).unwrap(), schema);

        let mut reader = open_reader(&path, &AvroReaderConfig::default()).unwrap();
        let rows = reader.rows().collect::<FormatResult<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), Some(&HostValue::Integer(87)));
        // Absent age was written from its default.
        assert_eq!(rows[1].get(1), Some(&HostValue::Integer(18)));
    }
}
