//! # `rowshim` Formats
//!
//! Schema-driven, bidirectional conversion between generic host rows and
//! three external binary formats:
//!
//! - **Avro** ([`avro`]): row-oriented, self-describing JSON schema
//! - **Parquet** ([`parquet`]): columnar with logical-type annotations
//! - **ORC** ([`orc`]): columnar with a typed tree schema and user metadata
//!
//! # Architecture
//!
//! ```text
//! write:  SchemaDescription ──SchemaConverter──▶ native schema (once)
//!         HostRow ──ValueConverter (per field)──▶ NativeValue ──▶ Arrow batch ──▶ native writer
//!         close(): flush, metadata codec (Parquet footer, ORC user metadata), finalize
//!
//! read:   native reader ──▶ Arrow batch ──▶ NativeValue ──ValueConverter──▶ HostRow
//!         schema from file (or override) + recovered host metadata
//! ```
//!
//! Every pass owns its own schema, converters and stream adapter; nothing
//! is shared between concurrent passes.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

#[macro_use]
mod macros;

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod host;
pub mod metadata;
pub mod native;
pub mod schema;
pub mod stream;

#[cfg(feature = "avro")]
pub mod avro;

#[cfg(feature = "parquet")]
pub mod parquet;

#[cfg(feature = "orc")]
pub mod orc;

// ── Re-exports for convenience ─────────────────────────────────────

pub use config::{ConversionConfig, FieldErrorPolicy, HostZone};
pub use convert::{ConversionError, ConversionErrorKind, ConversionResult, ValueConverter};
pub use error::{FormatError, FormatResult};
pub use format::FormatKind;
pub use host::{HostRow, HostType, HostValue};
pub use native::NativeValue;
pub use schema::{NativeTypeSpec, SchemaDescription, SchemaField};
pub use stream::{ConversionStats, RowReader, RowWriter};
