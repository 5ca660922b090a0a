//! Row stream adapters.
//!
//! The native readers and writers all exchange Arrow record batches.
//! [`BatchRowReader`] turns any iterator of batches into a lazy,
//! single-pass sequence of [`HostRow`]s; [`BatchRowWriter`] buffers rows
//! into batches and hands them to a format-specific [`BatchSink`].
//!
//! Both enforce the same lifecycle: once `close()` has run, every further
//! call fails with [`FormatError::Closed`] and the native resource has
//! been released exactly once.

use arrow_array::RecordBatch;
use arrow_schema::{ArrowError, Field, SchemaRef};
use tracing::debug;

use crate::config::{ConversionConfig, FieldErrorPolicy, HostZone};
use crate::convert::{
    assemble_row, ConversionError, ConversionErrorKind, EncodeTarget, ValueConverter,
};
use crate::error::{FormatError, FormatResult};
use crate::host::HostRow;
use crate::native::arrow::{value_at_path, BatchAssembler};
use crate::native::NativeValue;
use crate::schema::{NativeTypeSpec, SchemaDescription, SchemaField};

/// Default number of rows per native batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Checks that every declared default parses as its field's host type.
///
/// Writers call this before creating any native resource.
///
/// # Errors
///
/// Returns [`FormatError::InvalidConfig`] naming the first bad field.
pub fn validate_defaults<T: NativeTypeSpec>(
    schema: &SchemaDescription<T>,
    zone: HostZone,
) -> FormatResult<()> {
    for field in schema {
        field.default_host_value(zone).map_err(|kind| {
            FormatError::invalid_config(
                &field.native_name,
                format!("invalid default value: {kind}"),
            )
        })?;
    }
    Ok(())
}

/// Builds the Arrow columns a writer assembles, one per field, typed by
/// `target`.
///
/// # Errors
///
/// Returns [`FormatError::MissingDecimalMetadata`] for decimals without
/// precision or scale and [`FormatError::UnsupportedType`] for fields
/// `target` rejects.
pub fn arrow_fields<T, F>(schema: &SchemaDescription<T>, target: F) -> FormatResult<Vec<Field>>
where
    T: NativeTypeSpec,
    F: Fn(&SchemaField<T>) -> Result<EncodeTarget, ConversionErrorKind>,
{
    schema
        .iter()
        .map(|field| {
            let encoded = target(field).map_err(|kind| match kind {
                ConversionErrorKind::MissingDecimalMetadata => FormatError::MissingDecimalMetadata {
                    field: field.native_name.clone(),
                },
                _ => FormatError::unsupported(&field.native_name, field.native_type.display_name()),
            })?;
            Ok(Field::new(&field.native_name, encoded.arrow_type(), field.nullable))
        })
        .collect()
}

/// Counters kept by every row stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Rows produced (reader) or accepted (writer).
    pub rows: u64,
    /// Field conversions that failed.
    pub field_errors: u64,
    /// Rows rejected because of a field failure.
    pub rows_rejected: u64,
}

// ── Traits ─────────────────────────────────────────────────────────

/// A forward-only source of host rows.
pub trait RowReader {
    /// The format's type catalog.
    type Native: NativeTypeSpec;

    /// The schema rows are aligned with.
    fn schema(&self) -> &SchemaDescription<Self::Native>;

    /// Returns the next row, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// [`FormatError::Closed`] after `close()`, [`FormatError::Conversion`]
    /// when the fail-row policy rejects a row, or a resource error.
    fn next_row(&mut self) -> FormatResult<Option<HostRow>>;

    /// Counters so far.
    fn stats(&self) -> ConversionStats;

    /// Releases the native reader.
    ///
    /// # Errors
    ///
    /// [`FormatError::Closed`] if already closed.
    fn close(&mut self) -> FormatResult<()>;

    /// Iterates over the remaining rows.
    fn rows(&mut self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { reader: self }
    }
}

/// Iterator returned by [`RowReader::rows`].
#[derive(Debug)]
pub struct Rows<'a, R> {
    reader: &'a mut R,
}

impl<R: RowReader> Iterator for Rows<'_, R> {
    type Item = FormatResult<HostRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_row().transpose()
    }
}

/// A sink for host rows.
pub trait RowWriter {
    /// The format's type catalog.
    type Native: NativeTypeSpec;

    /// The schema rows must follow.
    fn schema(&self) -> &SchemaDescription<Self::Native>;

    /// Converts and buffers one row.
    ///
    /// # Errors
    ///
    /// [`FormatError::Closed`] after `close()`,
    /// [`FormatError::RequiredFieldMissing`] or [`FormatError::Conversion`]
    /// for a rejected row (the writer stays usable), or a resource error.
    fn write(&mut self, row: &HostRow) -> FormatResult<()>;

    /// Counters so far.
    fn stats(&self) -> ConversionStats;

    /// Flushes buffered rows and finalizes the native file.
    ///
    /// # Errors
    ///
    /// [`FormatError::Closed`] if already closed, or a resource error.
    fn close(&mut self) -> FormatResult<()>;
}

/// Receives finished batches from a [`BatchRowWriter`].
pub trait BatchSink {
    /// Writes one batch.
    ///
    /// # Errors
    ///
    /// Returns a resource error from the native writer.
    fn write_batch(&mut self, batch: &RecordBatch) -> FormatResult<()>;

    /// Finalizes the native file. Called exactly once.
    ///
    /// # Errors
    ///
    /// Returns a resource error from the native writer.
    fn finish(self) -> FormatResult<()>;
}

// ── Reader ─────────────────────────────────────────────────────────

/// Reads host rows from an iterator of Arrow batches.
pub struct BatchRowReader<C: ValueConverter, I> {
    format: &'static str,
    schema: SchemaDescription<C::Native>,
    converter: C,
    columns: Vec<Vec<usize>>,
    batches: Option<I>,
    current: Option<RecordBatch>,
    row: usize,
    policy: FieldErrorPolicy,
    stats: ConversionStats,
    closed: bool,
}

impl<C, I> BatchRowReader<C, I>
where
    C: ValueConverter,
    I: Iterator<Item = Result<RecordBatch, ArrowError>>,
{
    /// Creates a reader.
    ///
    /// `columns[i]` is the column path (top-level index, then struct child
    /// indices) that feeds field `i` of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SchemaMismatch`] if `columns` and `schema`
    /// differ in length, or [`FormatError::InvalidConfig`] for decimals too
    /// wide for their host type.
    pub fn new(
        format: &'static str,
        schema: SchemaDescription<C::Native>,
        converter: C,
        columns: Vec<Vec<usize>>,
        batches: I,
        config: &ConversionConfig,
    ) -> FormatResult<Self> {
        if columns.len() != schema.len() {
            return Err(FormatError::SchemaMismatch(format!(
                "{} column paths for {} fields",
                columns.len(),
                schema.len()
            )));
        }
        schema.require_host_precision()?;
        Ok(Self {
            format,
            schema,
            converter,
            columns,
            batches: Some(batches),
            current: None,
            row: 0,
            policy: config.field_error_policy,
            stats: ConversionStats::default(),
            closed: false,
        })
    }

    fn convert_row(&mut self, row: usize) -> FormatResult<HostRow> {
        let Some(batch) = self.current.as_ref() else {
            return Err(FormatError::SchemaMismatch("no current batch".into()));
        };
        let converter = &self.converter;
        let results = self
            .schema
            .fields()
            .iter()
            .zip(&self.columns)
            .map(|(field, path)| match value_at_path(batch, path, row) {
                Ok(native) => converter.decode(&native, field),
                Err(e) => Err(ConversionError::new(
                    field.host_name.clone(),
                    ConversionErrorKind::InvalidValue(e.to_string()),
                )),
            });
        let row = assemble_row(results, self.policy, &mut self.stats)?;
        self.stats.rows += 1;
        Ok(row)
    }
}

impl<C, I> RowReader for BatchRowReader<C, I>
where
    C: ValueConverter,
    I: Iterator<Item = Result<RecordBatch, ArrowError>>,
{
    type Native = C::Native;

    fn schema(&self) -> &SchemaDescription<C::Native> {
        &self.schema
    }

    fn next_row(&mut self) -> FormatResult<Option<HostRow>> {
        if self.closed {
            return Err(FormatError::Closed);
        }
        loop {
            if let Some(batch) = &self.current {
                if self.row < batch.num_rows() {
                    let row = self.row;
                    self.row += 1;
                    return self.convert_row(row).map(Some);
                }
            }
            let Some(batches) = self.batches.as_mut() else {
                return Ok(None);
            };
            match batches.next() {
                Some(Ok(batch)) => {
                    self.current = Some(batch);
                    self.row = 0;
                }
                Some(Err(e)) => {
                    self.batches = None;
                    self.current = None;
                    return Err(e.into());
                }
                None => {
                    self.batches = None;
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }

    fn stats(&self) -> ConversionStats {
        self.stats
    }

    fn close(&mut self) -> FormatResult<()> {
        if self.closed {
            return Err(FormatError::Closed);
        }
        self.closed = true;
        self.batches = None;
        self.current = None;
        debug!(
            format = self.format,
            rows = self.stats.rows,
            field_errors = self.stats.field_errors,
            "row reader closed"
        );
        Ok(())
    }
}

impl<C: ValueConverter, I> std::fmt::Debug for BatchRowReader<C, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRowReader")
            .field("format", &self.format)
            .field("fields", &self.schema.len())
            .field("stats", &self.stats)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

// ── Writer ─────────────────────────────────────────────────────────

/// Writes host rows through a [`BatchSink`].
pub struct BatchRowWriter<C: ValueConverter, S: BatchSink> {
    format: &'static str,
    schema: SchemaDescription<C::Native>,
    converter: C,
    assembler: BatchAssembler,
    sink: Option<S>,
    batch_size: usize,
    policy: FieldErrorPolicy,
    stats: ConversionStats,
}

impl<C: ValueConverter, S: BatchSink> BatchRowWriter<C, S> {
    /// Creates a writer. `arrow_schema` must have one column per field.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SchemaMismatch`] on a column count mismatch,
    /// [`FormatError::InvalidConfig`] for a zero batch size or an
    /// unparsable default value, or an Arrow error for unbuildable types.
    pub fn new(
        format: &'static str,
        schema: SchemaDescription<C::Native>,
        converter: C,
        arrow_schema: SchemaRef,
        sink: S,
        batch_size: usize,
        config: &ConversionConfig,
    ) -> FormatResult<Self> {
        if arrow_schema.fields().len() != schema.len() {
            return Err(FormatError::SchemaMismatch(format!(
                "{} arrow columns for {} fields",
                arrow_schema.fields().len(),
                schema.len()
            )));
        }
        if batch_size == 0 {
            return Err(FormatError::invalid_config("batch_size", "must be positive"));
        }
        validate_defaults(&schema, config.zone)?;
        Ok(Self {
            format,
            assembler: BatchAssembler::new(arrow_schema, batch_size)?,
            schema,
            converter,
            sink: Some(sink),
            batch_size,
            policy: config.field_error_policy,
            stats: ConversionStats::default(),
        })
    }

    fn encode_row(&mut self, row: &HostRow) -> FormatResult<Vec<NativeValue>> {
        if row.len() != self.schema.len() {
            return Err(FormatError::SchemaMismatch(format!(
                "row has {} values, schema has {} fields",
                row.len(),
                self.schema.len()
            )));
        }
        let mut values = Vec::with_capacity(row.len());
        for (idx, field) in self.schema.fields().iter().enumerate() {
            let value = row.get(idx);
            if value.is_none() && !field.nullable && field.default_value.is_none() {
                self.stats.rows_rejected += 1;
                return Err(FormatError::RequiredFieldMissing {
                    field: field.host_name.clone(),
                });
            }
            match self.converter.encode(value, field) {
                Ok(native) => values.push(native),
                Err(err) => {
                    self.stats.field_errors += 1;
                    if self.policy == FieldErrorPolicy::FailRow || !field.nullable {
                        self.stats.rows_rejected += 1;
                        return Err(err.into());
                    }
                    values.push(NativeValue::Null);
                }
            }
        }
        Ok(values)
    }

    fn flush(&mut self) -> FormatResult<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(FormatError::Closed);
        };
        if self.assembler.is_empty() {
            return Ok(());
        }
        let batch = self.assembler.finish()?;
        sink.write_batch(&batch)?;
        debug!(format = self.format, rows = batch.num_rows(), "flushed batch");
        Ok(())
    }
}

impl<C: ValueConverter, S: BatchSink> RowWriter for BatchRowWriter<C, S> {
    type Native = C::Native;

    fn schema(&self) -> &SchemaDescription<C::Native> {
        &self.schema
    }

    fn write(&mut self, row: &HostRow) -> FormatResult<()> {
        if self.sink.is_none() {
            return Err(FormatError::Closed);
        }
        let values = self.encode_row(row)?;
        self.assembler.push_row(&values)?;
        self.stats.rows += 1;
        if self.assembler.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn stats(&self) -> ConversionStats {
        self.stats
    }

    fn close(&mut self) -> FormatResult<()> {
        if self.sink.is_none() {
            return Err(FormatError::Closed);
        }
        let flushed = self.flush();
        let Some(sink) = self.sink.take() else {
            return Err(FormatError::Closed);
        };
        flushed?;
        sink.finish()?;
        debug!(
            format = self.format,
            rows = self.stats.rows,
            rejected = self.stats.rows_rejected,
            "row writer closed"
        );
        Ok(())
    }
}

impl<C: ValueConverter, S: BatchSink> std::fmt::Debug for BatchRowWriter<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRowWriter")
            .field("format", &self.format)
            .field("fields", &self.schema.len())
            .field("batch_size", &self.batch_size)
            .field("stats", &self.stats)
            .field("closed", &self.sink.is_none())
            .finish_non_exhaustive()
    }
}
