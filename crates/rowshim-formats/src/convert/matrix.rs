//! The shared native/host conversion matrix.

use arrow_schema::{DataType, TimeUnit};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::ConversionErrorKind;
use crate::host::coerce::Coercion;
use crate::host::{HostType, HostValue};
use crate::native::NativeValue;

/// Time zone attached to every timestamp column this crate builds.
pub const UTC_TIMEZONE: &str = "+00:00";

/// Most digits a [`HostValue::BigNumber`] holds exactly.
pub const MAX_HOST_DECIMAL_PRECISION: u32 = 28;

// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Native category a host value is encoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeTarget {
    /// Boolean.
    Boolean,
    /// 8-bit integer.
    Int8,
    /// 16-bit integer.
    Int16,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// UTF-8 text.
    Utf8,
    /// Variable-length bytes.
    Binary,
    /// Bytes of exactly this width.
    FixedBinary(i32),
    /// Decimal with fixed precision and scale.
    Decimal {
        /// Total digits.
        precision: u8,
        /// Digits after the point.
        scale: i8,
    },
    /// Days since the epoch.
    Date32,
    /// Instant in the given unit.
    Timestamp(TimeUnit),
}

impl EncodeTarget {
    /// Builds a decimal target from field metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionErrorKind::MissingDecimalMetadata`] if either
    /// value is absent, or [`ConversionErrorKind::InvalidValue`] if they
    /// are out of range.
    pub fn decimal(precision: Option<u32>, scale: Option<u32>) -> Result<Self, ConversionErrorKind> {
        let (Some(precision), Some(scale)) = (precision, scale) else {
            return Err(ConversionErrorKind::MissingDecimalMetadata);
        };
        let bad = || {
            ConversionErrorKind::InvalidValue(format!("invalid decimal({precision},{scale})"))
        };
        let p = u8::try_from(precision).map_err(|_| bad())?;
        let s = i8::try_from(scale).map_err(|_| bad())?;
        if p == 0 || p > 38 || scale > precision {
            return Err(bad());
        }
        Ok(Self::Decimal {
            precision: p,
            scale: s,
        })
    }

    /// Arrow column type that carries values of this target.
    #[must_use]
    pub fn arrow_type(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int8 => DataType::Int8,
            Self::Int16 => DataType::Int16,
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
            Self::Binary => DataType::Binary,
            Self::FixedBinary(width) => DataType::FixedSizeBinary(width),
            Self::Decimal { precision, scale } => DataType::Decimal128(precision, scale),
            Self::Date32 => DataType::Date32,
            Self::Timestamp(unit) => DataType::Timestamp(unit, Some(UTC_TIMEZONE.into())),
        }
    }
}

/// Decodes `value`, coercing to `host` when a host type is declared.
///
/// [`NativeValue::Null`] yields `None`. Enum symbols decode as text
/// before coercion. Epoch days become the start of that day in the
/// coercion's zone. Decimals decoded as text or numbers skip the
/// big-number step, so values wider than
/// [`MAX_HOST_DECIMAL_PRECISION`] keep every digit as text.
///
/// # Errors
///
/// Returns the failure kind when the value cannot be lifted or coerced.
pub fn decode_value(
    value: &NativeValue,
    host: Option<HostType>,
    coercion: &Coercion<'_>,
) -> Result<Option<HostValue>, ConversionErrorKind> {
    if let (
        NativeValue::Decimal {
            unscaled, scale, ..
        },
        Some(target @ (HostType::String | HostType::Number)),
    ) = (value, host)
    {
        let text = decimal_text(*unscaled, *scale);
        return if target == HostType::Number {
            text.parse()
                .map(|n| Some(HostValue::Number(n)))
                .map_err(|_| ConversionErrorKind::Parse(text))
        } else {
            Ok(Some(HostValue::String(text)))
        };
    }
    let Some(natural) = lift(value, coercion)? else {
        return Ok(None);
    };
    match host {
        Some(target) => coercion.coerce(&natural, target).map(Some),
        None => Ok(Some(natural)),
    }
}

fn lift(value: &NativeValue, coercion: &Coercion<'_>) -> Result<Option<HostValue>, ConversionErrorKind> {
    let lifted = match value {
        NativeValue::Null => return Ok(None),
        NativeValue::Boolean(b) => HostValue::Boolean(*b),
        NativeValue::Int8(_)
        | NativeValue::Int16(_)
        | NativeValue::Int32(_)
        | NativeValue::Int64(_) => HostValue::Integer(value.as_i64().unwrap_or_default()),
        NativeValue::Float32(v) => HostValue::Number(f64::from(*v)),
        NativeValue::Float64(v) => HostValue::Number(*v),
        NativeValue::Utf8(s) | NativeValue::Enum(s) => HostValue::String(s.clone()),
        NativeValue::Binary(b) => HostValue::Binary(b.clone()),
        NativeValue::Decimal {
            unscaled, scale, ..
        } => HostValue::BigNumber(decimal_from_parts(*unscaled, *scale)?),
        NativeValue::Date32(days) => {
            let date = days
                .checked_add(EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| ConversionErrorKind::Overflow(days.to_string()))?;
            HostValue::Date(coercion.zone().start_of_day(date))
        }
        NativeValue::Timestamp { unit, value } => {
            let utc = instant_from_ticks(*unit, *value)
                .ok_or_else(|| ConversionErrorKind::Overflow(value.to_string()))?;
            HostValue::Timestamp(coercion.zone().in_zone(utc))
        }
    };
    Ok(Some(lifted))
}

fn instant_from_ticks(unit: TimeUnit, ticks: i64) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(ticks, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(ticks),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(ticks),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(ticks)),
    }
}

fn decimal_from_parts(unscaled: i128, scale: i8) -> Result<Decimal, ConversionErrorKind> {
    let overflow = || ConversionErrorKind::Overflow(format!("{unscaled}e-{scale}"));
    if scale >= 0 {
        Decimal::try_from_i128_with_scale(unscaled, u32::from(scale.unsigned_abs()))
            .map_err(|_| overflow())
    } else {
        let factor = 10_i128
            .checked_pow(u32::from(scale.unsigned_abs()))
            .ok_or_else(overflow)?;
        let widened = unscaled.checked_mul(factor).ok_or_else(overflow)?;
        Decimal::try_from_i128_with_scale(widened, 0).map_err(|_| overflow())
    }
}

/// Renders an unscaled decimal exactly, with `scale` fraction digits.
fn decimal_text(unscaled: i128, scale: i8) -> String {
    let digits = unscaled.unsigned_abs().to_string();
    let sign = if unscaled < 0 { "-" } else { "" };
    let Ok(scale) = usize::try_from(scale) else {
        if unscaled == 0 {
            return "0".into();
        }
        let zeros = "0".repeat(usize::from(scale.unsigned_abs()));
        return format!("{sign}{digits}{zeros}");
    };
    if scale == 0 {
        return format!("{sign}{digits}");
    }
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int, frac) = padded.split_at(padded.len() - scale);
    format!("{sign}{int}.{frac}")
}

/// Builds a decimal from a raw unscaled integer using field metadata.
///
/// Used when a native reader hands back the physical representation of a
/// decimal column (an integer or bytes) instead of an annotated value.
///
/// # Errors
///
/// Returns [`ConversionErrorKind::MissingDecimalMetadata`] unless both
/// precision and scale are present, and
/// [`ConversionErrorKind::PrecisionExceeded`] if the value is too wide.
pub fn decimal_from_unscaled(
    unscaled: i128,
    precision: Option<u32>,
    scale: Option<u32>,
) -> Result<Decimal, ConversionErrorKind> {
    let EncodeTarget::Decimal { precision, scale } = EncodeTarget::decimal(precision, scale)?
    else {
        return Err(ConversionErrorKind::MissingDecimalMetadata);
    };
    let digits = digit_count(unscaled);
    if digits > u32::from(precision) {
        return Err(ConversionErrorKind::PrecisionExceeded {
            precision: u32::from(precision),
            digits,
        });
    }
    decimal_from_parts(unscaled, scale)
}

/// Reads a big-endian two's-complement integer of up to 16 bytes, the
/// physical form of `bytes`/`fixed` decimals.
///
/// # Errors
///
/// Returns [`ConversionErrorKind::Overflow`] for wider inputs and
/// [`ConversionErrorKind::InvalidValue`] for empty ones.
pub fn unscaled_from_be_bytes(bytes: &[u8]) -> Result<i128, ConversionErrorKind> {
    let Some(first) = bytes.first() else {
        return Err(ConversionErrorKind::InvalidValue("empty decimal bytes".into()));
    };
    if bytes.len() > 16 {
        return Err(ConversionErrorKind::Overflow(format!("{}-byte decimal", bytes.len())));
    }
    let fill = if first & 0x80 == 0 { 0x00 } else { 0xff };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

/// Encodes a host value into `target`. An absent value encodes as
/// [`NativeValue::Null`].
///
/// # Errors
///
/// Returns the failure kind when coercion or narrowing fails.
pub fn encode_value(
    value: Option<&HostValue>,
    target: EncodeTarget,
    coercion: &Coercion<'_>,
) -> Result<NativeValue, ConversionErrorKind> {
    let Some(value) = value else {
        return Ok(NativeValue::Null);
    };
    let encoded = match target {
        EncodeTarget::Boolean => NativeValue::Boolean(coercion.boolean(value)?),
        EncodeTarget::Int8 => NativeValue::Int8(narrow(coercion.integer(value)?)?),
        EncodeTarget::Int16 => NativeValue::Int16(narrow(coercion.integer(value)?)?),
        EncodeTarget::Int32 => NativeValue::Int32(narrow(coercion.integer(value)?)?),
        EncodeTarget::Int64 => NativeValue::Int64(coercion.integer(value)?),
        EncodeTarget::Float32 => NativeValue::Float32(to_f32(coercion.number(value)?)?),
        EncodeTarget::Float64 => NativeValue::Float64(coercion.number(value)?),
        EncodeTarget::Utf8 => NativeValue::Utf8(coercion.text(value)?),
        EncodeTarget::Binary => NativeValue::Binary(coercion.binary(value)?),
        EncodeTarget::FixedBinary(width) => {
            let bytes = coercion.binary(value)?;
            if usize::try_from(width).ok() != Some(bytes.len()) {
                return Err(ConversionErrorKind::InvalidValue(format!(
                    "expected {width} bytes, got {}",
                    bytes.len()
                )));
            }
            NativeValue::Binary(bytes)
        }
        EncodeTarget::Decimal { precision, scale } => {
            encode_decimal(coercion.big_number(value)?, precision, scale)?
        }
        EncodeTarget::Date32 => {
            let instant = coercion.instant(value)?;
            let date = coercion.zone().date_of(&instant);
            let days = i64::from(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE);
            NativeValue::Date32(narrow(days)?)
        }
        EncodeTarget::Timestamp(unit) => {
            let instant = coercion.instant(value)?;
            let ticks = match unit {
                TimeUnit::Second => Some(instant.timestamp()),
                TimeUnit::Millisecond => Some(instant.timestamp_millis()),
                TimeUnit::Microsecond => Some(instant.timestamp_micros()),
                TimeUnit::Nanosecond => instant.timestamp_nanos_opt(),
            }
            .ok_or_else(|| ConversionErrorKind::Overflow(instant.to_rfc3339()))?;
            NativeValue::Timestamp { unit, value: ticks }
        }
    };
    Ok(encoded)
}

fn narrow<T: TryFrom<i64>>(v: i64) -> Result<T, ConversionErrorKind> {
    T::try_from(v).map_err(|_| ConversionErrorKind::Overflow(v.to_string()))
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(v: f64) -> Result<f32, ConversionErrorKind> {
    let narrowed = v as f32;
    if v.is_finite() && !narrowed.is_finite() {
        return Err(ConversionErrorKind::Overflow(v.to_string()));
    }
    Ok(narrowed)
}

fn encode_decimal(d: Decimal, precision: u8, scale: i8) -> Result<NativeValue, ConversionErrorKind> {
    let s = u32::try_from(scale).map_err(|_| {
        ConversionErrorKind::InvalidValue(format!("negative decimal scale {scale}"))
    })?;
    let mut rounded = d.round_dp_with_strategy(s, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(s);
    if rounded.scale() != s {
        return Err(ConversionErrorKind::Overflow(d.to_string()));
    }
    let unscaled = rounded.mantissa();
    let digits = digit_count(unscaled);
    if digits > u32::from(precision) {
        return Err(ConversionErrorKind::PrecisionExceeded {
            precision: u32::from(precision),
            digits,
        });
    }
    Ok(NativeValue::Decimal {
        unscaled,
        precision,
        scale,
    })
}

fn digit_count(v: i128) -> u32 {
    v.unsigned_abs().checked_ilog10().map_or(1, |l| l + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostZone;

    fn utc() -> Coercion<'static> {
        Coercion::new(HostZone::Utc)
    }

    #[test]
    fn test_epoch_day_decode() {
        let c = utc();
        let Some(HostValue::Date(d0)) = decode_value(&NativeValue::Date32(0), Some(HostType::Date), &c).unwrap() else {
            panic!("expected date");
        };
        assert_eq!(d0.date_naive(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        let Some(HostValue::Date(d1)) = decode_value(&NativeValue::Date32(1), Some(HostType::Date), &c).unwrap() else {
            panic!("expected date");
        };
        assert_eq!(d1.date_naive(), NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
        assert_eq!(d1.timestamp(), 86_400);
    }

    #[test]
    fn test_date_encode_matches_decode() {
        let c = utc();
        let decoded = decode_value(&NativeValue::Date32(18_000), Some(HostType::Date), &c)
            .unwrap()
            .unwrap();
        let encoded = encode_value(Some(&decoded), EncodeTarget::Date32, &c).unwrap();
        assert_eq!(encoded, NativeValue::Date32(18_000));
    }

    #[test]
    fn test_boolean_text_decode() {
        let c = utc();
        let decode = |s: &str| {
            decode_value(&NativeValue::Utf8(s.into()), Some(HostType::Boolean), &c)
                .unwrap()
                .unwrap()
        };
        assert_eq!(decode("Y"), HostValue::Boolean(true));
        assert_eq!(decode("TRUE"), HostValue::Boolean(true));
        assert_eq!(decode("no"), HostValue::Boolean(false));
        assert_eq!(decode(""), HostValue::Boolean(false));
    }

    #[test]
    fn test_numeric_widening_and_narrowing() {
        let c = utc();
        assert_eq!(
            decode_value(&NativeValue::Int32(87), Some(HostType::Integer), &c).unwrap(),
            Some(HostValue::Integer(87))
        );
        assert_eq!(
            decode_value(&NativeValue::Float64(9.99), Some(HostType::Integer), &c).unwrap(),
            Some(HostValue::Integer(9))
        );
        assert_eq!(
            decode_value(&NativeValue::Int64(5), Some(HostType::BigNumber), &c).unwrap(),
            Some(HostValue::BigNumber(Decimal::from(5)))
        );
        assert!(matches!(
            encode_value(Some(&HostValue::Integer(300)), EncodeTarget::Int8, &c),
            Err(ConversionErrorKind::Overflow(_))
        ));
        assert_eq!(
            encode_value(Some(&HostValue::Number(7.8)), EncodeTarget::Int32, &c).unwrap(),
            NativeValue::Int32(7)
        );
    }

    #[test]
    fn test_enum_decodes_via_symbol() {
        let c = utc();
        assert_eq!(
            decode_value(&NativeValue::Enum("RED".into()), Some(HostType::String), &c).unwrap(),
            Some(HostValue::String("RED".into()))
        );
        assert!(decode_value(&NativeValue::Enum("RED".into()), Some(HostType::Integer), &c).is_err());
    }

    #[test]
    fn test_decimal_encode_rounds_to_scale() {
        let c = utc();
        let target = EncodeTarget::decimal(Some(10), Some(2)).unwrap();
        let v = HostValue::BigNumber(Decimal::new(12_345, 3));
        assert_eq!(
            encode_value(Some(&v), target, &c).unwrap(),
            NativeValue::Decimal {
                unscaled: 1235,
                precision: 10,
                scale: 2
            }
        );
        let widened = encode_value(Some(&HostValue::Integer(7)), target, &c).unwrap();
        assert_eq!(
            widened,
            NativeValue::Decimal {
                unscaled: 700,
                precision: 10,
                scale: 2
            }
        );
    }

    #[test]
    fn test_decimal_precision_preserved_on_roundtrip() {
        let c = utc();
        let target = EncodeTarget::decimal(Some(12), Some(4)).unwrap();
        let value = Decimal::new(-987_654_321, 4);
        let native = encode_value(Some(&HostValue::BigNumber(value)), target, &c).unwrap();
        let back = decode_value(&native, Some(HostType::BigNumber), &c).unwrap();
        assert_eq!(back, Some(HostValue::BigNumber(value)));
    }

    #[test]
    fn test_wide_decimal_decodes_exactly_as_text() {
        let c = utc();
        let wide = NativeValue::Decimal {
            unscaled: 10_i128.pow(30) + 7,
            precision: 38,
            scale: 2,
        };
        assert_eq!(
            decode_value(&wide, Some(HostType::String), &c).unwrap(),
            Some(HostValue::from("10000000000000000000000000000.07"))
        );
        assert_eq!(
            decode_value(&wide, Some(HostType::Number), &c).unwrap(),
            Some(HostValue::Number(1e28))
        );
        assert!(decode_value(&wide, Some(HostType::BigNumber), &c).is_err());
    }

    #[test]
    fn test_decimal_text() {
        assert_eq!(decimal_text(1230, 2), "12.30");
        assert_eq!(decimal_text(-5, 3), "-0.005");
        assert_eq!(decimal_text(0, 2), "0.00");
        assert_eq!(decimal_text(42, 0), "42");
        assert_eq!(decimal_text(-42, -2), "-4200");
        assert_eq!(decimal_text(0, -2), "0");
    }

    #[test]
    fn test_decimal_requires_metadata() {
        assert_eq!(
            EncodeTarget::decimal(Some(10), None),
            Err(ConversionErrorKind::MissingDecimalMetadata)
        );
        assert_eq!(
            EncodeTarget::decimal(None, Some(2)),
            Err(ConversionErrorKind::MissingDecimalMetadata)
        );
        assert!(EncodeTarget::decimal(Some(2), Some(5)).is_err());
        assert_eq!(
            decimal_from_unscaled(1234, None, Some(2)),
            Err(ConversionErrorKind::MissingDecimalMetadata)
        );
        assert_eq!(
            decimal_from_unscaled(1234, Some(6), Some(2)).unwrap(),
            Decimal::new(1234, 2)
        );
    }

    #[test]
    fn test_decimal_precision_exceeded() {
        let c = utc();
        let target = EncodeTarget::decimal(Some(4), Some(2)).unwrap();
        let err = encode_value(Some(&HostValue::BigNumber(Decimal::new(123_456, 2))), target, &c)
            .unwrap_err();
        assert_eq!(
            err,
            ConversionErrorKind::PrecisionExceeded {
                precision: 4,
                digits: 6
            }
        );
    }

    #[test]
    fn test_timestamp_roundtrip_units() {
        let c = utc();
        for unit in [TimeUnit::Millisecond, TimeUnit::Microsecond] {
            let native = NativeValue::Timestamp {
                unit,
                value: 1_600_000_000_123,
            };
            let host = decode_value(&native, Some(HostType::Timestamp), &c).unwrap();
            let back = encode_value(host.as_ref(), EncodeTarget::Timestamp(unit), &c).unwrap();
            assert_eq!(back, native);
        }
    }

    #[test]
    fn test_timestamp_from_text_in_zone() {
        let c = utc();
        let v = HostValue::String("1970/01/01 00:00:01.500".into());
        assert_eq!(
            encode_value(Some(&v), EncodeTarget::Timestamp(TimeUnit::Millisecond), &c).unwrap(),
            NativeValue::Timestamp {
                unit: TimeUnit::Millisecond,
                value: 1_500
            }
        );
    }

    #[test]
    fn test_fixed_binary_width() {
        let c = utc();
        assert!(encode_value(Some(&HostValue::Binary(vec![1, 2])), EncodeTarget::FixedBinary(3), &c).is_err());
        assert_eq!(
            encode_value(Some(&HostValue::Binary(vec![1, 2, 3])), EncodeTarget::FixedBinary(3), &c).unwrap(),
            NativeValue::Binary(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_arrow_types() {
        assert_eq!(
            EncodeTarget::decimal(Some(10), Some(2)).unwrap().arrow_type(),
            DataType::Decimal128(10, 2)
        );
        assert_eq!(
            EncodeTarget::Timestamp(TimeUnit::Millisecond).arrow_type(),
            DataType::Timestamp(TimeUnit::Millisecond, Some("+00:00".into()))
        );
        assert_eq!(EncodeTarget::FixedBinary(16).arrow_type(), DataType::FixedSizeBinary(16));
    }

    #[test]
    fn test_unscaled_from_be_bytes() {
        assert_eq!(unscaled_from_be_bytes(&[0x04, 0xd2]).unwrap(), 1234);
        assert_eq!(unscaled_from_be_bytes(&[0xfb, 0x2e]).unwrap(), -1234);
        assert_eq!(unscaled_from_be_bytes(&[0xff]).unwrap(), -1);
        assert!(unscaled_from_be_bytes(&[]).is_err());
        assert!(unscaled_from_be_bytes(&[0; 17]).is_err());
    }

    #[test]
    fn test_null_passthrough() {
        let c = utc();
        assert_eq!(decode_value(&NativeValue::Null, Some(HostType::String), &c).unwrap(), None);
        assert_eq!(encode_value(None, EncodeTarget::Utf8, &c).unwrap(), NativeValue::Null);
        let d = decode_value(&NativeValue::Date32(0), None, &c).unwrap().unwrap();
        assert!(matches!(d, HostValue::Date(dt) if dt.year() == 1970));
    }
}
