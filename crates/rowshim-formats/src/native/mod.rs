//! Native value model and the Arrow bridge used by every format.
//!
//! All three native libraries exchange data as Arrow record batches, so a
//! single closed [`NativeValue`] sum type covers every primitive category
//! they can produce or consume. Value converters match on it exhaustively.

pub mod arrow;
mod value;

pub use value::NativeValue;
