//! ORC file streams.
//!
//! ORC has no field-level nullability or defaults, so host attributes
//! travel as file user metadata through the [`metadata`](crate::metadata)
//! codec. Batches stream to the `orc-rust` writer as they fill. That
//! writer always leaves the footer metadata empty, so the codec runs at
//! close and its entries are appended to the finished footer.
//!
//! Reading discovers the struct type from the file unless a schema is
//! given, then applies whatever host metadata the file carries. Files
//! without it read with catalog host types, non-nullable fields and no
//! defaults.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_schema::{DataType, Schema};
use orc_rust::arrow_reader::{ArrowReader, ArrowReaderBuilder};
use orc_rust::arrow_writer::{ArrowWriter, ArrowWriterBuilder};
use orc_rust::projection::ProjectionMask;
use tracing::{debug, info};

use super::mapping::{build_native_schema, build_schema_description};
use super::schema::OrcSchema;
use super::tail::append_user_metadata;
use super::value::{encode_target, OrcValueConverter};
use super::OrcType;
use crate::config::ConversionConfig;
use crate::error::{FormatError, FormatResult};
use crate::metadata::{read_metadata, write_metadata, UserMetadata, METADATA_NAMESPACE};
use crate::schema::NativeTypeSpec;
use crate::schema::SchemaDescription;
use crate::stream::{
    arrow_fields, validate_defaults, BatchRowReader, BatchRowWriter, BatchSink, RowReader,
    DEFAULT_BATCH_SIZE,
};

const FORMAT: &str = "orc";

/// Row writer producing an ORC file.
pub type OrcRowWriter = BatchRowWriter<OrcValueConverter, OrcSink>;

/// Row reader over an ORC file.
pub type OrcRowReader = BatchRowReader<OrcValueConverter, ArrowReader<File>>;

/// Settings for [`create_writer`].
#[derive(Debug, Clone)]
pub struct OrcWriterConfig {
    /// Rows per Arrow batch handed to the writer.
    pub batch_size: usize,
    /// Whether host attributes are stored as user metadata (default: true).
    pub host_metadata: bool,
    /// Shared conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for OrcWriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            host_metadata: true,
            conversion: ConversionConfig::default(),
        }
    }
}

impl OrcWriterConfig {
    /// Sets the rows per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables or disables host metadata.
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

/// Settings for [`open_reader`].
#[derive(Debug, Clone)]
pub struct OrcReaderConfig {
    /// Rows per decoded batch.
    pub batch_size: usize,
    /// Schema to read with instead of the one discovered in the file.
    /// Native names must be top-level column names.
    pub schema: Option<SchemaDescription<OrcType>>,
    /// Shared conversion settings.
    pub conversion: ConversionConfig,
}

impl Default for OrcReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            schema: None,
            conversion: ConversionConfig::default(),
        }
    }
}

impl OrcReaderConfig {
    /// Reads with `schema` instead of the discovered one.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaDescription<OrcType>) -> Self {
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

/// Batch sink over the `orc-rust` Arrow writer.
///
/// Batches are encoded as they arrive. [`finish`](BatchSink::finish)
/// closes the native writer and then appends the host metadata to the
/// file footer.
pub struct OrcSink {
    path: PathBuf,
    writer: ArrowWriter<File>,
    host_schema: Option<SchemaDescription<OrcType>>,
    batches: usize,
}

impl BatchSink for OrcSink {
    fn write_batch(&mut self, batch: &RecordBatch) -> FormatResult<()> {
        self.writer
            .write(batch)
            .map_err(|e| FormatError::native(FORMAT, e))?;
        self.batches += 1;
        Ok(())
    }

    fn finish(self) -> FormatResult<()> {
        let Self {
            path,
            writer,
            host_schema,
            batches,
        } = self;
        writer.close().map_err(|e| FormatError::native(FORMAT, e))?;

        let mut metadata = UserMetadata::new();
        if let Some(schema) = &host_schema {
            write_metadata(schema, &mut metadata);
        }
        append_user_metadata(&path, &metadata)?;
        debug!(batches, entries = metadata.len(), "closed orc writer");
        Ok(())
    }
}

impl std::fmt::Debug for OrcSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrcSink")
            .field("path", &self.path)
            .field("batches", &self.batches)
            .finish_non_exhaustive()
    }
}

/// Whether the `orc-rust` writer has an encoder for `data_type`.
fn writable(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::Float32
            | DataType::Float64
            | DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Binary
            | DataType::LargeBinary
    )
}

/// Creates a row writer for a new ORC file at `path`.
///
/// Only boolean, integer, floating point, string and binary columns can
/// be written. Dates, timestamps and decimals are read-only.
///
/// # Errors
///
/// Returns setup errors from schema conversion, including column types
/// the native writer cannot encode, before the file is created, or I/O
/// errors creating it.
pub fn create_writer(
    path: impl AsRef<Path>,
    schema: SchemaDescription<OrcType>,
    config: &OrcWriterConfig,
) -> FormatResult<OrcRowWriter> {
    let native = build_native_schema(&schema)?;
    let fields = arrow_fields(&schema, encode_target)?;
    if let Some((field, column)) = schema
        .iter()
        .zip(&fields)
        .find(|(_, column)| !writable(column.data_type()))
    {
        return Err(FormatError::unsupported(
            field.native_name.clone(),
            format!("{} (orc writer)", field.native_type.display_name()),
        ));
    }
    validate_defaults(&schema, config.conversion.zone)?;
    if config.batch_size == 0 {
        return Err(FormatError::invalid_config("batch_size", "must be positive"));
    }

    let arrow_schema = Arc::new(Schema::new(fields));
    let path = path.as_ref();
    let writer = ArrowWriterBuilder::new(File::create(path)?, arrow_schema.clone())
        .try_build()
        .map_err(|e| FormatError::native(FORMAT, e))?;
    let sink = OrcSink {
        path: path.to_path_buf(),
        writer,
        host_schema: config.host_metadata.then(|| schema.clone()),
        batches: 0,
    };
    info!(path = %path.display(), schema = %native, "opened orc writer");

    BatchRowWriter::new(
        FORMAT,
        schema,
        OrcValueConverter::new(config.conversion.zone),
        arrow_schema,
        sink,
        config.batch_size,
        &config.conversion,
    )
}

/// Opens a row reader over the ORC file at `path`.
///
/// # Errors
///
/// Returns I/O and ORC errors for unreadable files, and setup errors
/// when the schema cannot be described or names a missing column.
pub fn open_reader(path: impl AsRef<Path>, config: &OrcReaderConfig) -> FormatResult<OrcRowReader> {
    if config.batch_size == 0 {
        return Err(FormatError::invalid_config("batch_size", "must be positive"));
    }
    let path = path.as_ref();
    let builder = open_builder(path)?.with_batch_size(config.batch_size);

    let (schema, columns, reader) = match &config.schema {
        None => {
            let metadata = host_metadata(builder.file_metadata().user_custom_metadata());
            let reader = builder.build();
            let schema = discover(&reader.schema(), &metadata)?;
            let columns = (0..schema.len()).map(|i| vec![i]).collect();
            (schema, columns, reader)
        }
        Some(schema) => {
            schema.require_fields()?;
            let root = builder.file_metadata().root_data_type();
            let roots = schema
                .iter()
                .map(|field| {
                    root.children()
                        .iter()
                        .position(|c| c.name() == field.native_name)
                        .ok_or_else(|| {
                            FormatError::SchemaMismatch(format!(
                                "no orc column named '{}'",
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
                .map(|pos| vec![projected.partition_point(|p| p < pos)])
                .collect();
            let indices = projected
                .iter()
                .filter_map(|&pos| root.children().get(pos))
                .map(|c| c.data_type().column_index())
                .collect::<Vec<_>>();
            let mask = ProjectionMask::roots(root, indices);
            debug!(columns = ?projected, "orc projection");
            (schema.clone(), columns, builder.with_projection(mask).build())
        }
    };
    let reader = BatchRowReader::new(
        FORMAT,
        schema,
        OrcValueConverter::new(config.conversion.zone),
        columns,
        reader,
        &config.conversion,
    )?;
    info!(path = %path.display(), fields = reader.schema().len(), "opened orc reader");
    Ok(reader)
}

/// Reads the root struct type of the ORC file at `path`.
///
/// # Errors
///
/// Returns I/O and ORC errors for unreadable files, or
/// [`FormatError::UnsupportedType`] for columns with no ORC counterpart.
pub fn read_native_schema(path: impl AsRef<Path>) -> FormatResult<OrcSchema> {
    let reader = open_builder(path.as_ref())?.build();
    OrcSchema::from_arrow_schema(&reader.schema())
}

/// Discovers the schema description of the ORC file at `path`, including
/// host attributes stored in its user metadata.
///
/// # Errors
///
/// See [`open_reader`].
pub fn read_schema(path: impl AsRef<Path>) -> FormatResult<SchemaDescription<OrcType>> {
    let builder = open_builder(path.as_ref())?;
    let metadata = host_metadata(builder.file_metadata().user_custom_metadata());
    let reader = builder.build();
    discover(&reader.schema(), &metadata)
}

fn open_builder(path: &Path) -> FormatResult<ArrowReaderBuilder<File>> {
    ArrowReaderBuilder::try_new(File::open(path)?).map_err(|e| FormatError::native(FORMAT, e))
}

/// Keeps the entries written by the metadata codec.
fn host_metadata<'a>(entries: impl IntoIterator<Item = (&'a String, &'a Vec<u8>)>) -> UserMetadata {
    let prefix = format!("{METADATA_NAMESPACE}.");
    entries
        .into_iter()
        .filter(|(key, _)| key.starts_with(&prefix))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn discover(arrow: &Schema, metadata: &UserMetadata) -> FormatResult<SchemaDescription<OrcType>> {
    let native = OrcSchema::from_arrow_schema(arrow)?;
    let mut schema = build_schema_description(&native)?;
    let recovered = read_metadata(&mut schema, metadata);
    debug!(schema = %native, recovered, "orc host metadata");
    Ok(schema)
}
