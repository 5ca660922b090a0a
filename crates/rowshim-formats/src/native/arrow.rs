//! Arrow bridge: reads [`NativeValue`]s out of Arrow arrays and assembles
//! record batches from them.
//!
//! Reading covers every array type the three native readers produce,
//! including dictionary-encoded enum columns and nested struct columns
//! addressed by a child-index path. Writing covers the flat primitive
//! types the schema converters can build.

use std::sync::Arc;

use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Date32Builder, Decimal128Builder, FixedSizeBinaryBuilder,
    Float32Builder, Float64Builder, Int16Builder, Int32Builder, Int64Builder, Int8Builder,
    StringBuilder, TimestampMicrosecondBuilder, TimestampMillisecondBuilder,
    TimestampNanosecondBuilder, TimestampSecondBuilder,
};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Date64Type, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Int8Type, Time32MillisecondType, Time32SecondType, Time64MicrosecondType,
    Time64NanosecondType, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::{ArrowError, DataType, SchemaRef, TimeUnit};

use super::NativeValue;

const MILLIS_PER_DAY: i64 = 86_400_000;

// ── Reading ────────────────────────────────────────────────────────

/// Extracts the value at `row` from `array`.
///
/// Unsigned integers widen to the next signed type; `UInt64` values
/// beyond `i64::MAX` are rejected. Dictionary arrays with string values
/// yield [`NativeValue::Enum`].
///
/// # Errors
///
/// Returns [`ArrowError::NotYetImplemented`] for array types that neither
/// map nor cast to a native value, and [`ArrowError::CastError`] for
/// out-of-range values.
pub fn value_at(array: &dyn Array, row: usize) -> Result<NativeValue, ArrowError> {
    if array.is_null(row) {
        return Ok(NativeValue::Null);
    }
    let value = match array.data_type() {
        DataType::Null => NativeValue::Null,
        DataType::Boolean => NativeValue::Boolean(array.as_boolean().value(row)),
        DataType::Int8 => NativeValue::Int8(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => NativeValue::Int16(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => NativeValue::Int32(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => NativeValue::Int64(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => {
            NativeValue::Int16(i16::from(array.as_primitive::<UInt8Type>().value(row)))
        }
        DataType::UInt16 => {
            NativeValue::Int32(i32::from(array.as_primitive::<UInt16Type>().value(row)))
        }
        DataType::UInt32 => {
            NativeValue::Int64(i64::from(array.as_primitive::<UInt32Type>().value(row)))
        }
        DataType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            NativeValue::Int64(i64::try_from(v).map_err(|_| {
                ArrowError::CastError(format!("uint64 value {v} does not fit in int64"))
            })?)
        }
        DataType::Float32 => NativeValue::Float32(array.as_primitive::<Float32Type>().value(row)),
        DataType::Float64 => NativeValue::Float64(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => NativeValue::Utf8(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => NativeValue::Utf8(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => NativeValue::Utf8(array.as_string_view().value(row).to_string()),
        DataType::Binary => NativeValue::Binary(array.as_binary::<i32>().value(row).to_vec()),
        DataType::LargeBinary => NativeValue::Binary(array.as_binary::<i64>().value(row).to_vec()),
        DataType::BinaryView => NativeValue::Binary(array.as_binary_view().value(row).to_vec()),
        DataType::FixedSizeBinary(_) => {
            NativeValue::Binary(array.as_fixed_size_binary().value(row).to_vec())
        }
        DataType::Decimal128(precision, scale) => NativeValue::Decimal {
            unscaled: array.as_primitive::<Decimal128Type>().value(row),
            precision: *precision,
            scale: *scale,
        },
        DataType::Date32 => NativeValue::Date32(array.as_primitive::<Date32Type>().value(row)),
        DataType::Date64 => {
            let ms = array.as_primitive::<Date64Type>().value(row);
            let days = ms.div_euclid(MILLIS_PER_DAY);
            NativeValue::Date32(i32::try_from(days).map_err(|_| {
                ArrowError::CastError(format!("date64 value {ms} is out of range"))
            })?)
        }
        DataType::Time32(TimeUnit::Second) => {
            NativeValue::Int32(array.as_primitive::<Time32SecondType>().value(row))
        }
        DataType::Time32(_) => {
            NativeValue::Int32(array.as_primitive::<Time32MillisecondType>().value(row))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            NativeValue::Int64(array.as_primitive::<Time64NanosecondType>().value(row))
        }
        DataType::Time64(_) => {
            NativeValue::Int64(array.as_primitive::<Time64MicrosecondType>().value(row))
        }
        DataType::Timestamp(unit, _) => {
            let value = match unit {
                TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                TimeUnit::Millisecond => {
                    array.as_primitive::<TimestampMillisecondType>().value(row)
                }
                TimeUnit::Microsecond => {
                    array.as_primitive::<TimestampMicrosecondType>().value(row)
                }
                TimeUnit::Nanosecond => array.as_primitive::<TimestampNanosecondType>().value(row),
            };
            NativeValue::Timestamp { unit: *unit, value }
        }
        DataType::Dictionary(_, _) => {
            let dict = array.as_any_dictionary();
            let key = value_at(dict.keys(), row)?
                .as_i64()
                .and_then(|k| usize::try_from(k).ok())
                .ok_or_else(|| ArrowError::CastError("invalid dictionary key".into()))?;
            match value_at(dict.values().as_ref(), key)? {
                NativeValue::Utf8(symbol) => NativeValue::Enum(symbol),
                other => other,
            }
        }
        other => return cast_value_at(array, other, row),
    };
    Ok(value)
}

/// Casts the single value at `row` to the nearest mapped type: wider
/// decimals to `Decimal128`, `Float16` to `Float64`, anything else
/// castable to text.
fn cast_value_at(
    array: &dyn Array,
    data_type: &DataType,
    row: usize,
) -> Result<NativeValue, ArrowError> {
    let target = match data_type {
        DataType::Decimal32(p, s) | DataType::Decimal64(p, s) => DataType::Decimal128(*p, *s),
        DataType::Decimal256(p, s) => DataType::Decimal128((*p).min(38), *s),
        DataType::Float16 => DataType::Float64,
        _ => DataType::Utf8,
    };
    if !arrow_cast::can_cast_types(data_type, &target) {
        return Err(ArrowError::NotYetImplemented(format!(
            "no native value mapping for arrow type {data_type}"
        )));
    }
    let single = arrow_cast::cast(array.slice(row, 1).as_ref(), &target)?;
    value_at(single.as_ref(), 0)
}

/// Extracts the value at `row` from a (possibly nested) column.
///
/// `path[0]` selects a top-level column; each further index selects a
/// child of a struct column. A null struct on the way yields
/// [`NativeValue::Null`].
///
/// # Errors
///
/// Returns [`ArrowError::InvalidArgumentError`] if the path is empty, out
/// of range, or crosses a non-struct column.
pub fn value_at_path(
    batch: &RecordBatch,
    path: &[usize],
    row: usize,
) -> Result<NativeValue, ArrowError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| ArrowError::InvalidArgumentError("empty column path".into()))?;
    let mut array: &dyn Array = batch
        .columns()
        .get(*first)
        .ok_or_else(|| bad_path(path))?
        .as_ref();
    for idx in rest {
        if array.is_null(row) {
            return Ok(NativeValue::Null);
        }
        let parent = array.as_struct_opt().ok_or_else(|| bad_path(path))?;
        array = parent.columns().get(*idx).ok_or_else(|| bad_path(path))?.as_ref();
    }
    value_at(array, row)
}

fn bad_path(path: &[usize]) -> ArrowError {
    ArrowError::InvalidArgumentError(format!("column path {path:?} does not match batch"))
}

// ── Writing ────────────────────────────────────────────────────────

/// A typed Arrow builder that accepts [`NativeValue`]s.
pub trait ColumnBuilder: Send {
    /// Appends one value; [`NativeValue::Null`] appends a null.
    ///
    /// # Errors
    ///
    /// Returns [`ArrowError::InvalidArgumentError`] if the value category
    /// does not match the column type.
    fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError>;

    /// Finishes the column and resets the builder.
    fn finish(&mut self) -> ArrayRef;
}

fn mismatch(value: &NativeValue, column: &str) -> ArrowError {
    ArrowError::InvalidArgumentError(format!(
        "cannot append {} value to {column} column",
        value.category()
    ))
}

macro_rules! impl_column_builder {
    ($builder:ty, $name:literal, $($variant:ident)|+) => {
        impl ColumnBuilder for $builder {
            fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError> {
                match value {
                    NativeValue::Null => self.append_null(),
                    $( NativeValue::$variant(v) => self.append_value(*v), )+
                    other => return Err(mismatch(other, $name)),
                }
                Ok(())
            }

            fn finish(&mut self) -> ArrayRef {
                Arc::new(<$builder>::finish(self))
            }
        }
    };
}

impl_column_builder!(BooleanBuilder, "boolean", Boolean);
impl_column_builder!(Int8Builder, "int8", Int8);
impl_column_builder!(Int16Builder, "int16", Int16);
impl_column_builder!(Int32Builder, "int32", Int32);
impl_column_builder!(Int64Builder, "int64", Int64);
impl_column_builder!(Float32Builder, "float32", Float32);
impl_column_builder!(Float64Builder, "float64", Float64);
impl_column_builder!(Date32Builder, "date32", Date32);

macro_rules! impl_timestamp_builder {
    ($builder:ty, $unit:path) => {
        impl ColumnBuilder for $builder {
            fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError> {
                match value {
                    NativeValue::Null => self.append_null(),
                    NativeValue::Timestamp { unit: $unit, value } => self.append_value(*value),
                    other => return Err(mismatch(other, "timestamp")),
                }
                Ok(())
            }

            fn finish(&mut self) -> ArrayRef {
                Arc::new(<$builder>::finish(self))
            }
        }
    };
}

impl_timestamp_builder!(TimestampSecondBuilder, TimeUnit::Second);
impl_timestamp_builder!(TimestampMillisecondBuilder, TimeUnit::Millisecond);
impl_timestamp_builder!(TimestampMicrosecondBuilder, TimeUnit::Microsecond);
impl_timestamp_builder!(TimestampNanosecondBuilder, TimeUnit::Nanosecond);

impl ColumnBuilder for StringBuilder {
    fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError> {
        match value {
            NativeValue::Null => self.append_null(),
            NativeValue::Utf8(s) | NativeValue::Enum(s) => self.append_value(s),
            other => return Err(mismatch(other, "utf8")),
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(StringBuilder::finish(self))
    }
}

impl ColumnBuilder for BinaryBuilder {
    fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError> {
        match value {
            NativeValue::Null => self.append_null(),
            NativeValue::Binary(b) => self.append_value(b),
            other => return Err(mismatch(other, "binary")),
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(BinaryBuilder::finish(self))
    }
}

impl ColumnBuilder for FixedSizeBinaryBuilder {
    fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError> {
        match value {
            NativeValue::Null => self.append_null(),
            NativeValue::Binary(b) => self.append_value(b)?,
            other => return Err(mismatch(other, "fixed_size_binary")),
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(FixedSizeBinaryBuilder::finish(self))
    }
}

impl ColumnBuilder for Decimal128Builder {
    fn append(&mut self, value: &NativeValue) -> Result<(), ArrowError> {
        match value {
            NativeValue::Null => self.append_null(),
            NativeValue::Decimal { unscaled, .. } => self.append_value(*unscaled),
            other => return Err(mismatch(other, "decimal")),
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(Decimal128Builder::finish(self))
    }
}

/// Creates a builder for `data_type`.
///
/// # Errors
///
/// Returns [`ArrowError::NotYetImplemented`] for types no schema converter
/// builds (lists, maps, nested structs, dictionaries).
pub fn create_builder(
    data_type: &DataType,
    capacity: usize,
) -> Result<Box<dyn ColumnBuilder>, ArrowError> {
    let builder: Box<dyn ColumnBuilder> = match data_type {
        DataType::Boolean => Box::new(BooleanBuilder::with_capacity(capacity)),
        DataType::Int8 => Box::new(Int8Builder::with_capacity(capacity)),
        DataType::Int16 => Box::new(Int16Builder::with_capacity(capacity)),
        DataType::Int32 => Box::new(Int32Builder::with_capacity(capacity)),
        DataType::Int64 => Box::new(Int64Builder::with_capacity(capacity)),
        DataType::Float32 => Box::new(Float32Builder::with_capacity(capacity)),
        DataType::Float64 => Box::new(Float64Builder::with_capacity(capacity)),
        DataType::Utf8 => Box::new(StringBuilder::with_capacity(capacity, capacity * 32)),
        DataType::Binary => Box::new(BinaryBuilder::with_capacity(capacity, capacity * 64)),
        DataType::FixedSizeBinary(width) => {
            Box::new(FixedSizeBinaryBuilder::with_capacity(capacity, *width))
        }
        DataType::Decimal128(precision, scale) => Box::new(
            Decimal128Builder::with_capacity(capacity)
                .with_precision_and_scale(*precision, *scale)?,
        ),
        DataType::Date32 => Box::new(Date32Builder::with_capacity(capacity)),
        DataType::Timestamp(TimeUnit::Second, tz) => {
            Box::new(TimestampSecondBuilder::with_capacity(capacity).with_timezone_opt(tz.clone()))
        }
        DataType::Timestamp(TimeUnit::Millisecond, tz) => Box::new(
            TimestampMillisecondBuilder::with_capacity(capacity).with_timezone_opt(tz.clone()),
        ),
        DataType::Timestamp(TimeUnit::Microsecond, tz) => Box::new(
            TimestampMicrosecondBuilder::with_capacity(capacity).with_timezone_opt(tz.clone()),
        ),
        DataType::Timestamp(TimeUnit::Nanosecond, tz) => Box::new(
            TimestampNanosecondBuilder::with_capacity(capacity).with_timezone_opt(tz.clone()),
        ),
        other => {
            return Err(ArrowError::NotYetImplemented(format!(
                "no column builder for arrow type {other}"
            )))
        }
    };
    Ok(builder)
}

/// Accumulates rows of native values into a [`RecordBatch`].
pub struct BatchAssembler {
    schema: SchemaRef,
    builders: Vec<Box<dyn ColumnBuilder>>,
    rows: usize,
}

impl BatchAssembler {
    /// Creates an assembler for `schema` sized for `capacity` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any column type has no builder.
    pub fn new(schema: SchemaRef, capacity: usize) -> Result<Self, ArrowError> {
        let builders = schema
            .fields()
            .iter()
            .map(|f| create_builder(f.data_type(), capacity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            schema,
            builders,
            rows: 0,
        })
    }

    /// Appends one row. On error the assembler holds a partial row and
    /// must be discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width or any value category is wrong.
    pub fn push_row(&mut self, values: &[NativeValue]) -> Result<(), ArrowError> {
        if values.len() != self.builders.len() {
            return Err(ArrowError::InvalidArgumentError(format!(
                "row has {} values, schema has {} columns",
                values.len(),
                self.builders.len()
            )));
        }
        for (builder, value) in self.builders.iter_mut().zip(values) {
            builder.append(value)?;
        }
        self.rows += 1;
        Ok(())
    }

    /// Number of buffered rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Returns `true` if no rows are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Finishes all columns into a batch and resets the assembler.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns violate the schema (e.g. a null in
    /// a non-nullable column).
    pub fn finish(&mut self) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = self.builders.iter_mut().map(|b| b.finish()).collect();
        self.rows = 0;
        RecordBatch::try_new(Arc::clone(&self.schema), columns)
    }
}

impl std::fmt::Debug for BatchAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchAssembler")
            .field("columns", &self.builders.len())
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
