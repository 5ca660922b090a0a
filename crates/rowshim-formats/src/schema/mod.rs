//! Format-neutral schema description.
//!
//! - [`NativeTypeSpec`]: implemented by each format's type catalog
//! - [`SchemaField`] / [`SchemaDescription`]: the ordered field list a
//!   read or write pass is configured with
//! - [`marshal`]: the pipe-delimited text form embedded by callers
//! - [`legacy`]: decoding of compound `name<DELIM>type<DELIM>nullable`
//!   field names written by older marshalling

mod catalog;
pub(crate) mod field;
pub mod legacy;
pub mod marshal;

pub use catalog::NativeTypeSpec;
pub use field::{SchemaDescription, SchemaField};
