//! Field-level value conversion.
//!
//! Each format has a [`ValueConverter`] that maps single values between
//! the native and host representations of one field. The conversion is
//! dispatched on the pair (native category, declared host type):
//!
//! - decode: [`NativeValue`] is lifted to its natural host value, then
//!   coerced to the field's declared host type
//! - encode: the host value is coerced to the host type that matches the
//!   field's [`EncodeTarget`], then narrowed to the native category
//!
//! Converters never panic and never log. Failures come back as
//! [`ConversionError`]; [`assemble_row`] applies the configured
//! [`FieldErrorPolicy`] to a row's worth of results.

mod error;
mod matrix;

pub use error::{ConversionError, ConversionErrorKind, ConversionResult};
pub use matrix::{
    decimal_from_unscaled, decode_value, encode_value, unscaled_from_be_bytes, EncodeTarget,
    MAX_HOST_DECIMAL_PRECISION, UTC_TIMEZONE,
};

use crate::config::{FieldErrorPolicy, HostZone};
use crate::host::{HostRow, HostValue};
use crate::native::NativeValue;
use crate::schema::{NativeTypeSpec, SchemaField};
use crate::stream::ConversionStats;

/// Converts single values of one format between native and host form.
pub trait ValueConverter {
    /// The format's type catalog.
    type Native: NativeTypeSpec;

    /// Converts a decoded native value to the field's host type.
    /// [`NativeValue::Null`] yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] naming the field on failure.
    fn decode(
        &self,
        value: &NativeValue,
        field: &SchemaField<Self::Native>,
    ) -> ConversionResult<Option<HostValue>>;

    /// Converts a host value to the native value written for the field.
    /// An absent value yields the field's default, or [`NativeValue::Null`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConversionError`] naming the field on failure.
    fn encode(
        &self,
        value: Option<&HostValue>,
        field: &SchemaField<Self::Native>,
    ) -> ConversionResult<NativeValue>;
}

/// Decodes one value for `field`, coercing to its declared host type.
///
/// # Errors
///
/// Returns a [`ConversionError`] naming the host field.
pub fn decode_field<T: NativeTypeSpec>(
    value: &NativeValue,
    field: &SchemaField<T>,
    zone: HostZone,
) -> ConversionResult<Option<HostValue>> {
    decode_value(value, field.host_type, &field.coercion(zone))
        .map_err(|kind| ConversionError::new(field.host_name.clone(), kind))
}

/// Encodes one value for `field` into `target`. An absent value is
/// replaced by the field's parsed default when one is declared.
///
/// # Errors
///
/// Returns a [`ConversionError`] naming the host field.
pub fn encode_field<T: NativeTypeSpec>(
    value: Option<&HostValue>,
    field: &SchemaField<T>,
    target: EncodeTarget,
    zone: HostZone,
) -> ConversionResult<NativeValue> {
    let to_error = |kind| ConversionError::new(field.host_name.clone(), kind);
    let coercion = field.coercion(zone);
    match value {
        Some(v) => encode_value(Some(v), target, &coercion).map_err(to_error),
        None => {
            let default = field.default_host_value(zone).map_err(to_error)?;
            encode_value(default.as_ref(), target, &coercion).map_err(to_error)
        }
    }
}

/// Assembles per-field results into a row.
///
/// With [`FieldErrorPolicy::AbsentOnError`] a failed field becomes `None`
/// and the row is kept; with [`FieldErrorPolicy::FailRow`] the first
/// failure is returned. Every failure is counted in `stats`.
///
/// # Errors
///
/// Returns the first [`ConversionError`] under `FailRow`.
pub fn assemble_row<I>(
    results: I,
    policy: FieldErrorPolicy,
    stats: &mut ConversionStats,
) -> ConversionResult<HostRow>
where
    I: IntoIterator<Item = ConversionResult<Option<HostValue>>>,
{
    let mut row = HostRow::default();
    for result in results {
        match result {
            Ok(value) => row.push(value),
            Err(err) => {
                stats.field_errors += 1;
                match policy {
                    FieldErrorPolicy::AbsentOnError => row.push(None),
                    FieldErrorPolicy::FailRow => {
                        stats.rows_rejected += 1;
                        return Err(err);
                    }
                }
            }
        }
    }
    Ok(row)
}
