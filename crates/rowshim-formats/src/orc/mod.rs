//! ORC schema mapping, value conversion and file streams.
//!
//! The native schema is an [`OrcSchema`] tree whose root is a struct.
//! ORC cannot express nullability or defaults, so those and the declared
//! host types are stored as file user metadata, appended to the footer
//! once the native writer has closed the file.

mod catalog;
mod io;
mod mapping;
mod schema;
mod tail;
mod value;

pub use catalog::OrcType;
pub use io::{
    create_writer, open_reader, read_native_schema, read_schema, OrcReaderConfig, OrcRowReader,
    OrcRowWriter, OrcSink, OrcWriterConfig,
};
pub use mapping::{build_native_schema, build_schema_description};
pub use schema::{
    OrcSchema, OrcStruct, DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE, DEFAULT_MAX_LENGTH,
};
pub use value::{encode_target, OrcValueConverter};
