//! Parquet file streams.
//!
//! Writes go through `ArrowWriter`; the Arrow column types are chosen so
//! the writer derives exactly the message type [`build_native_schema`]
//! describes. Host attributes travel in the footer's key/value metadata
//! through the [`metadata`](crate::metadata) codec.
//!
//! Reads project only the columns the schema names and hand batches to
//! the shared row reader.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use ::parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use ::parquet::arrow::arrow_writer::ArrowWriterOptions;
use ::parquet::arrow::{ArrowWriter, ProjectionMask};
use ::parquet::basic::Compression;
use ::parquet::file::metadata::{FileMetaData, KeyValue};
use ::parquet::file::properties::WriterProperties;
use ::parquet::file::reader::ChunkReader;
use arrow_array::RecordBatch;
use arrow_schema::Schema;
use bytes::Bytes;
use tracing::{debug, info};

use super::mapping::{build_native_schema, build_schema_description, DEFAULT_MESSAGE_NAME};
use super::value::{encode_target, ParquetValueConverter};
use super::ParquetType;
use crate::config::ConversionConfig;
use crate::error::{FormatError, FormatResult};
use crate::metadata::{read_metadata, write_metadata, UserMetadata, METADATA_NAMESPACE};
use crate::schema::SchemaDescription;
use crate::stream::{
    arrow_fields, validate_defaults, BatchRowReader, BatchRowWriter, BatchSink, RowReader,
    DEFAULT_BATCH_SIZE,
};

const FORMAT: &str = "parquet";

/// Row writer producing a Parquet file.
pub type ParquetRowWriter = BatchRowWriter<ParquetValueConverter, ParquetSink>;

/// Row reader over a Parquet file or buffer.
pub type ParquetRowReader = BatchRowReader<ParquetValueConverter, ParquetRecordBatchReader>;

/// Settings for [`create_writer`].
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    /// Name of the root message (default: `"row"`).
    pub message_name: String,
    /// Rows per Arrow batch handed to the writer.
    pub batch_size: usize,
    /// Compression codec (default: Snappy).
    pub compression: Compression,
    /// Maximum rows per row group (default: `1_000_000`).
    pub max_row_group_size: usize,
    /// Whether host attributes are stored in the footer (default: true).
    pub host_metadata: bool,
    /// Shared conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            message_name: DEFAULT_MESSAGE_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            compression: Compression::SNAPPY,
            max_row_group_size: 1_000_000,
            host_metadata: true,
            conversion: ConversionConfig::default(),
        }
    }
}

impl ParquetWriterConfig {
    /// Sets the root message name.
    #[must_use]
    pub fn with_message_name(mut self, name: impl Into<String>) -> Self {
        self.message_name = name.into();
        self
    }

    /// Sets the rows per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the maximum rows per row group.
    #[must_use]
    pub fn with_max_row_group_size(mut self, size: usize) -> Self {
        self.max_row_group_size = size;
        self
    }

    /// Enables or disables footer host metadata.
    #[must_use]
    pub fn with_host_metadata(mut self, enabled: bool) -> Self {
        self.host_metadata = enabled;
        self
    }

    /// Sets the conversion settings.
    #[must_use]
    pub fn with_conversion(mut self, conversion: ConversionConfig) -> Self {
        self.conversion = conversion;
        self
    }
}

/// Settings for [`open_reader`] and [`open_reader_from_bytes`].
#[derive(Debug, Clone)]
pub struct ParquetReaderConfig {
    /// Rows per decoded batch.
    pub batch_size: usize,
    /// Schema to read with instead of the one discovered in the file.
    /// Native names must be top-level column names.
    pub schema: Option<SchemaDescription<ParquetType>>,
    /// Shared conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for ParquetReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            schema: None,
            conversion: ConversionConfig::default(),
        }
    }
}

impl ParquetReaderConfig {
    /// Reads with `schema` instead of the discovered one.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaDescription<ParquetType>) -> Self {
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

/// Batch sink over an `ArrowWriter`. Host metadata is appended to the
/// footer when the sink finishes.
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    metadata: UserMetadata,
}

impl BatchSink for ParquetSink {
    fn write_batch(&mut self, batch: &RecordBatch) -> FormatResult<()> {
        self.writer.write(batch)?;
        Ok(())
    }

    fn finish(mut self) -> FormatResult<()> {
        for (key, value) in std::mem::take(&mut self.metadata) {
            let value = String::from_utf8(value)
                .map_err(|e| FormatError::invalid_config(&key, e.to_string()))?;
            self.writer.append_key_value_metadata(KeyValue::new(key, Some(value)));
        }
        self.writer.close()?;
        Ok(())
    }
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("metadata_entries", &self.metadata.len())
            .finish_non_exhaustive()
    }
}

/// Creates a row writer for a new Parquet file at `path`.
///
/// # Errors
///
/// Returns setup errors from schema conversion before the file is
/// created, or I/O and Parquet errors from the writer.
pub fn create_writer(
    path: impl AsRef<Path>,
    schema: SchemaDescription<ParquetType>,
    config: &ParquetWriterConfig,
) -> FormatResult<ParquetRowWriter> {
    let native = build_native_schema(&schema, &config.message_name)?;
    let arrow_schema = Arc::new(Schema::new(arrow_fields(&schema, encode_target)?));
    validate_defaults(&schema, config.conversion.zone)?;
    if config.batch_size == 0 {
        return Err(FormatError::invalid_config("batch_size", "must be positive"));
    }

    let props = WriterProperties::builder()
        .set_compression(config.compression)
        .set_max_row_group_size(config.max_row_group_size)
        .build();
    let options = ArrowWriterOptions::new()
        .with_properties(props)
        .with_schema_root(native.name().to_string());

    let path = path.as_ref();
    let file = File::create(path)?;
    let writer = ArrowWriter::try_new_with_options(file, arrow_schema.clone(), options)?;
    let mut metadata = UserMetadata::new();
    if config.host_metadata {
        write_metadata(&schema, &mut metadata);
    }
    info!(path = %path.display(), fields = schema.len(), "opened parquet writer");

    BatchRowWriter::new(
        FORMAT,
        schema,
        ParquetValueConverter::new(config.conversion.zone),
        arrow_schema,
        ParquetSink { writer, metadata },
        config.batch_size,
        &config.conversion,
    )
}

/// Opens a row reader over the Parquet file at `path`.
///
/// # Errors
///
/// Returns I/O and Parquet errors for unreadable files, and setup errors
/// when the schema cannot be described or names a missing column.
pub fn open_reader(
    path: impl AsRef<Path>,
    config: &ParquetReaderConfig,
) -> FormatResult<ParquetRowReader> {
    let path = path.as_ref();
    let reader = open_with(File::open(path)?, config)?;
    info!(path = %path.display(), fields = reader.schema().len(), "opened parquet reader");
    Ok(reader)
}

/// Opens a row reader over an in-memory Parquet file.
///
/// # Errors
///
/// See [`open_reader`].
pub fn open_reader_from_bytes(
    data: Bytes,
    config: &ParquetReaderConfig,
) -> FormatResult<ParquetRowReader> {
    open_with(data, config)
}

/// Discovers the schema description of the Parquet file at `path`,
/// including host attributes stored in its footer.
///
/// # Errors
///
/// See [`open_reader`].
pub fn read_schema(path: impl AsRef<Path>) -> FormatResult<SchemaDescription<ParquetType>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    discover(builder.metadata().file_metadata())
}

fn open_with<T: ChunkReader + 'static>(
    input: T,
    config: &ParquetReaderConfig,
) -> FormatResult<ParquetRowReader> {
    if config.batch_size == 0 {
        return Err(FormatError::invalid_config("batch_size", "must be positive"));
    }
    let builder = ParquetRecordBatchReaderBuilder::try_new(input)?;
    let schema = match &config.schema {
        Some(schema) => schema.clone(),
        None => discover(builder.metadata().file_metadata())?,
    };
    schema.require_fields()?;

    let root_fields = builder.parquet_schema().root_schema().get_fields();
    let roots = schema
        .iter()
        .map(|field| {
            root_fields
                .iter()
                .position(|c| c.name() == field.native_name)
                .ok_or_else(|| {
                    FormatError::SchemaMismatch(format!(
                        "no parquet column named '{}'",
                        field.native_name
                    ))
                })
        })
        .collect::<FormatResult<Vec<_>>>()?;

    // Projected batches keep file order, so map each root to its rank.
    let mut projected = roots.clone();
    projected.sort_unstable();
    projected.dedup();
    let columns = roots
        .iter()
        .map(|root| vec![projected.partition_point(|p| p < root)])
        .collect();
    let mask = ProjectionMask::roots(builder.parquet_schema(), projected.iter().copied());
    debug!(columns = ?projected, "parquet projection");

    let reader = builder
        .with_batch_size(config.batch_size)
        .with_projection(mask)
        .build()?;

    BatchRowReader::new(
        FORMAT,
        schema,
        ParquetValueConverter::new(config.conversion.zone),
        columns,
        reader,
        &config.conversion,
    )
}

/// Builds the schema from the file's message type and applies any host
/// metadata found in the footer.
fn discover(file: &FileMetaData) -> FormatResult<SchemaDescription<ParquetType>> {
    let mut schema = build_schema_description(file.schema())?;
    let prefix = format!("{METADATA_NAMESPACE}.");
    let metadata: UserMetadata = file
        .key_value_metadata()
        .into_iter()
        .flatten()
        .filter(|kv| kv.key.starts_with(&prefix))
        .map(|kv| {
            (
                kv.key.clone(),
                kv.value.clone().unwrap_or_default().into_bytes(),
            )
        })
        .collect();
    let recovered = read_metadata(&mut schema, &metadata);
    debug!(recovered, "parquet host metadata");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostType;
    use crate::schema::SchemaField;
    use crate::stream::RowWriter;
    use crate::{HostRow, HostValue};
    use rust_decimal::Decimal;

    fn people() -> SchemaDescription<ParquetType> {
        SchemaDescription::from_fields(vec![
            SchemaField::new("name", ParquetType::Utf8),
            SchemaField::new("age", ParquetType::Int64)
                .with_nullable(true)
                .with_default("18"),
            SchemaField::new("balance", ParquetType::DecimalInt64)
                .with_decimal(12, 2)
                .with_nullable(true),
        ])
        .unwrap()
    }

    fn write_people(path: &Path) {
        let mut writer = create_writer(path, people(), &ParquetWriterConfig::default()).unwrap();
        writer
            .write(&HostRow::from(vec![
                Some(HostValue::from("Alex")),
                Some(HostValue::Integer(87)),
                Some(HostValue::BigNumber(Decimal::new(10_050, 2))),
            ]))
            .unwrap();
        writer
            .write(&HostRow::from(vec![Some(HostValue::from("Tom")), None, None]))
            .unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_write_then_read_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.parquet");
        write_people(&path);

        assert_eq!(read_schema(&path).unwrap(), people());

        let mut reader = open_reader(&path, &ParquetReaderConfig::default()).unwrap();
        let rows = reader.rows().collect::<FormatResult<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(2), Some(&HostValue::BigNumber(Decimal::new(10_050, 2))));
        // Absent age was written from its default.
        assert_eq!(rows[1].get(1), Some(&HostValue::Integer(18)));
        assert_eq!(rows[1].get(2), None);
        assert_eq!(reader.stats().rows, 2);
        reader.close().unwrap();
        assert!(matches!(reader.next_row(), Err(FormatError::Closed)));
    }

    #[test]
    fn test_override_projects_and_reorders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.parquet");
        write_people(&path);

        let schema = SchemaDescription::from_fields(vec![
            SchemaField::new("age", ParquetType::Int64).with_host_type(HostType::String),
            SchemaField::new("name", ParquetType::Utf8),
        ])
        .unwrap();
        let bytes = Bytes::from(std::fs::read(&path).unwrap());
        let mut reader =
            open_reader_from_bytes(bytes, &ParquetReaderConfig::default().with_schema(schema))
                .unwrap();
        let first = reader.next_row().unwrap().unwrap();
        assert_eq!(first.get(0), Some(&HostValue::from("87")));
        assert_eq!(first.get(1), Some(&HostValue::from("Alex")));
    }

    #[test]
    fn test_unknown_override_column_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.parquet");
        write_people(&path);
        let schema =
            SchemaDescription::from_fields(vec![SchemaField::new("email", ParquetType::Utf8)])
                .unwrap();
        let err = open_reader(&path, &ParquetReaderConfig::default().with_schema(schema))
            .unwrap_err();
        assert!(err.is_setup_error());
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_without_host_metadata_defaults_are_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.parquet");
        let config = ParquetWriterConfig::default().with_host_metadata(false);
        let mut writer = create_writer(&path, people(), &config).unwrap();
        writer
            .write(&HostRow::from(vec![Some(HostValue::from("Ann")), None, None]))
            .unwrap();
        writer.close().unwrap();

        let schema = read_schema(&path).unwrap();
        assert!(schema.iter().all(|f| f.default_value.is_none()));
        assert!(schema.fields()[1].nullable);
    }
}
