//! Host row model.
//!
//! The host is the generic, format-neutral side of every conversion:
//!
//! - [`HostType`]: the declared type of a host field (stable numeric ids)
//! - [`HostValue`]: a single typed host value
//! - [`HostRow`]: an ordered row of optional host values
//! - [`coerce`]: conversions between host types, used on the write path
//!   when a value's runtime type differs from its field's declared type

pub mod coerce;
mod row;
mod types;
mod value;

pub use row::HostRow;
pub use types::HostType;
pub use value::HostValue;
