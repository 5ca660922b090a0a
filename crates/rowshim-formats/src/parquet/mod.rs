//! Parquet schema mapping, value conversion and file streams.
//!
//! The native schema is a `parquet` message type annotated with converted
//! types. Decimal columns use the narrowest physical type for their
//! precision. Declared host types and default values are kept in the
//! footer's key/value metadata.

mod catalog;
mod io;
mod mapping;
mod value;

pub use catalog::ParquetType;
pub use io::{
    create_writer, open_reader, open_reader_from_bytes, read_schema, ParquetReaderConfig,
    ParquetRowReader, ParquetRowWriter, ParquetSink, ParquetWriterConfig,
};
pub use mapping::{build_native_schema, build_schema_description, DEFAULT_MESSAGE_NAME};
pub use value::{encode_target, ParquetValueConverter};
