//! Avro schema mapping, value conversion and object container file
//! streams.
//!
//! Nullable fields are written as a two-branch union with `null`. Nested
//! records are flattened on discovery into `$.parent.child` field paths,
//! which [`resolve`] maps back to column indices when reading.

mod catalog;
mod container;
mod io;
mod mapping;
mod path;
mod schema;
mod value;

pub use catalog::AvroType;
pub use io::{
    create_writer, open_reader, read_schema, AvroReaderConfig, AvroRowReader, AvroRowWriter,
    AvroSink, AvroWriterConfig, AVRO_SCHEMA_KEY,
};
pub use mapping::{build_native_schema, build_schema_description, DEFAULT_RECORD_NAME};
pub use path::{resolve, FieldHandle};
pub use schema::{AvroField, AvroRecord, AvroSchema};
pub use value::{encode_target, AvroValueConverter};
