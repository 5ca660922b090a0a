//! Conversions between host types.
//!
//! Used on the write path when a value's runtime type differs from its
//! field's declared host type, and to parse textual default values.
//! Text follows these rules:
//!
//! - booleans render as `"Y"`/`"N"`; the truthy set is `Y`, `TRUE`,
//!   `YES`, `1` (case-insensitive), everything else is false
//! - dates and timestamps use the field's `string_format` (chrono strftime
//!   syntax) or [`DEFAULT_DATE_FORMAT`]
//! - numbers narrowing to integers truncate toward zero

use std::fmt::Write;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{HostType, HostValue};
use crate::config::HostZone;
use crate::convert::ConversionErrorKind;

/// Pattern used to render and parse dates when a field has no format.
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

const FALLBACK_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d",
    "%Y-%m-%d",
];

// i64::MAX + 1 as f64; anything at or above overflows.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Returns `true` if `text` is in the truthy lexical set.
#[must_use]
pub fn is_truthy(text: &str) -> bool {
    ["Y", "TRUE", "YES", "1"]
        .iter()
        .any(|t| t.eq_ignore_ascii_case(text))
}

/// Host-to-host conversion rules bound to a zone and an optional
/// date/time pattern.
#[derive(Debug, Clone, Copy)]
pub struct Coercion<'a> {
    zone: HostZone,
    format: Option<&'a str>,
}

impl<'a> Coercion<'a> {
    /// Creates a coercion in `zone` using the default date pattern.
    #[must_use]
    pub fn new(zone: HostZone) -> Self {
        Self { zone, format: None }
    }

    /// Returns the zone used for local calendar arithmetic.
    #[must_use]
    pub fn zone(&self) -> HostZone {
        self.zone
    }

    /// Sets the date/time pattern.
    #[must_use]
    pub fn with_format(mut self, format: Option<&'a str>) -> Self {
        self.format = format;
        self
    }

    /// Converts `value` to `target`.
    ///
    /// # Errors
    ///
    /// Returns the failure kind when the value cannot be represented.
    pub fn coerce(
        &self,
        value: &HostValue,
        target: HostType,
    ) -> Result<HostValue, ConversionErrorKind> {
        if value.host_type() == target {
            return Ok(value.clone());
        }
        Ok(match target {
            HostType::String => HostValue::String(self.text(value)?),
            HostType::Integer => HostValue::Integer(self.integer(value)?),
            HostType::Number => HostValue::Number(self.number(value)?),
            HostType::BigNumber => HostValue::BigNumber(self.big_number(value)?),
            HostType::Boolean => HostValue::Boolean(self.boolean(value)?),
            HostType::Date => HostValue::Date(self.instant(value)?),
            HostType::Timestamp => HostValue::Timestamp(self.instant(value)?),
            HostType::Binary => HostValue::Binary(self.binary(value)?),
            HostType::Inet => HostValue::Inet(self.inet(value)?),
        })
    }

    /// Parses textual input (e.g. a default value) as `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionErrorKind::Parse`] if the text is malformed.
    pub fn parse(&self, text: &str, target: HostType) -> Result<HostValue, ConversionErrorKind> {
        self.coerce(&HostValue::String(text.to_string()), target)
    }

    /// Renders a value as text.
    ///
    /// # Errors
    ///
    /// Fails for binary values that are not UTF-8 and for invalid date
    /// patterns.
    pub fn text(&self, value: &HostValue) -> Result<String, ConversionErrorKind> {
        match value {
            HostValue::String(s) => Ok(s.clone()),
            HostValue::Integer(v) => Ok(v.to_string()),
            HostValue::Number(v) => Ok(v.to_string()),
            HostValue::BigNumber(v) => Ok(v.to_string()),
            HostValue::Boolean(b) => Ok(if *b { "Y" } else { "N" }.to_string()),
            HostValue::Date(dt) | HostValue::Timestamp(dt) => {
                format_instant(dt, self.format.unwrap_or(DEFAULT_DATE_FORMAT))
            }
            HostValue::Binary(b) => String::from_utf8(b.clone())
                .map_err(|_| ConversionErrorKind::Parse("binary value is not UTF-8".into())),
            HostValue::Inet(ip) => Ok(ip.to_string()),
        }
    }

    /// Converts to a 64-bit integer, truncating fractional values.
    ///
    /// # Errors
    ///
    /// Fails on unparsable text, out-of-range values and addresses.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn integer(&self, value: &HostValue) -> Result<i64, ConversionErrorKind> {
        match value {
            HostValue::Integer(v) => Ok(*v),
            HostValue::Number(f) => {
                let t = f.trunc();
                if !t.is_finite() || t < -I64_UPPER || t >= I64_UPPER {
                    return Err(ConversionErrorKind::Overflow(f.to_string()));
                }
                Ok(t as i64)
            }
            HostValue::BigNumber(d) => d
                .trunc()
                .to_i64()
                .ok_or_else(|| ConversionErrorKind::Overflow(d.to_string())),
            HostValue::Boolean(b) => Ok(i64::from(*b)),
            HostValue::String(s) => parse_text::<i64>(s),
            HostValue::Date(dt) | HostValue::Timestamp(dt) => Ok(dt.timestamp_millis()),
            HostValue::Binary(_) => parse_text::<i64>(&self.text(value)?),
            HostValue::Inet(_) => Err(unsupported(value, HostType::Integer)),
        }
    }

    /// Converts to a 64-bit float.
    ///
    /// # Errors
    ///
    /// Fails on unparsable text and addresses.
    #[allow(clippy::cast_precision_loss)]
    pub fn number(&self, value: &HostValue) -> Result<f64, ConversionErrorKind> {
        match value {
            HostValue::Number(v) => Ok(*v),
            HostValue::Integer(v) => Ok(*v as f64),
            HostValue::BigNumber(d) => d
                .to_f64()
                .ok_or_else(|| ConversionErrorKind::Overflow(d.to_string())),
            HostValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            HostValue::String(s) => parse_text::<f64>(s),
            HostValue::Date(dt) | HostValue::Timestamp(dt) => Ok(dt.timestamp_millis() as f64),
            HostValue::Binary(_) => parse_text::<f64>(&self.text(value)?),
            HostValue::Inet(_) => Err(unsupported(value, HostType::Number)),
        }
    }

    /// Converts to a decimal.
    ///
    /// # Errors
    ///
    /// Fails on unparsable text, non-finite floats and addresses.
    pub fn big_number(&self, value: &HostValue) -> Result<Decimal, ConversionErrorKind> {
        match value {
            HostValue::BigNumber(d) => Ok(*d),
            HostValue::Integer(v) => Ok(Decimal::from(*v)),
            HostValue::Number(f) => {
                Decimal::try_from(*f).map_err(|_| ConversionErrorKind::Overflow(f.to_string()))
            }
            HostValue::Boolean(b) => Ok(Decimal::from(i64::from(*b))),
            HostValue::String(s) => parse_decimal(s),
            HostValue::Date(dt) | HostValue::Timestamp(dt) => {
                Ok(Decimal::from(dt.timestamp_millis()))
            }
            HostValue::Binary(_) => parse_decimal(&self.text(value)?),
            HostValue::Inet(_) => Err(unsupported(value, HostType::BigNumber)),
        }
    }

    /// Converts to a boolean.
    ///
    /// # Errors
    ///
    /// Fails for temporal values and addresses.
    pub fn boolean(&self, value: &HostValue) -> Result<bool, ConversionErrorKind> {
        match value {
            HostValue::Boolean(b) => Ok(*b),
            HostValue::String(s) => Ok(is_truthy(s)),
            HostValue::Integer(v) => Ok(*v != 0),
            HostValue::Number(v) => Ok(*v != 0.0),
            HostValue::BigNumber(d) => Ok(!d.is_zero()),
            HostValue::Binary(_) => Ok(is_truthy(&self.text(value)?)),
            HostValue::Date(_) | HostValue::Timestamp(_) | HostValue::Inet(_) => {
                Err(unsupported(value, HostType::Boolean))
            }
        }
    }

    /// Converts to an instant. Numbers are epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Fails on unparsable text, out-of-range numbers, booleans, binary
    /// and addresses.
    pub fn instant(&self, value: &HostValue) -> Result<DateTime<FixedOffset>, ConversionErrorKind> {
        match value {
            HostValue::Date(dt) | HostValue::Timestamp(dt) => Ok(*dt),
            HostValue::String(s) => self.parse_instant(s),
            HostValue::Integer(_) | HostValue::Number(_) | HostValue::BigNumber(_) => {
                let ms = self.integer(value)?;
                DateTime::from_timestamp_millis(ms)
                    .map(|utc| self.zone.in_zone(utc))
                    .ok_or_else(|| ConversionErrorKind::Overflow(ms.to_string()))
            }
            HostValue::Boolean(_) | HostValue::Binary(_) | HostValue::Inet(_) => {
                Err(unsupported(value, HostType::Timestamp))
            }
        }
    }

    /// Converts to bytes. Non-binary values use their text form.
    ///
    /// # Errors
    ///
    /// Fails only when rendering the text form fails.
    pub fn binary(&self, value: &HostValue) -> Result<Vec<u8>, ConversionErrorKind> {
        match value {
            HostValue::Binary(b) => Ok(b.clone()),
            other => Ok(self.text(other)?.into_bytes()),
        }
    }

    /// Converts to a network address.
    ///
    /// # Errors
    ///
    /// Fails on unparsable text and byte strings that are not 4 or 16
    /// octets long.
    pub fn inet(&self, value: &HostValue) -> Result<IpAddr, ConversionErrorKind> {
        match value {
            HostValue::Inet(ip) => Ok(*ip),
            HostValue::String(s) => parse_text::<IpAddr>(s),
            HostValue::Binary(b) => {
                if let Ok(octets) = <[u8; 4]>::try_from(b.as_slice()) {
                    Ok(IpAddr::from(octets))
                } else if let Ok(octets) = <[u8; 16]>::try_from(b.as_slice()) {
                    Ok(IpAddr::from(octets))
                } else {
                    Err(ConversionErrorKind::InvalidValue(format!(
                        "{} bytes is not an address",
                        b.len()
                    )))
                }
            }
            other => Err(unsupported(other, HostType::Inet)),
        }
    }

    fn parse_instant(&self, text: &str) -> Result<DateTime<FixedOffset>, ConversionErrorKind> {
        let text = text.trim();
        if let Some(pattern) = self.format {
            return self
                .parse_with(text, pattern)
                .ok_or_else(|| ConversionErrorKind::Parse(text.to_string()));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt);
        }
        std::iter::once(DEFAULT_DATE_FORMAT)
            .chain(FALLBACK_FORMATS.iter().copied())
            .find_map(|pattern| self.parse_with(text, pattern))
            .ok_or_else(|| ConversionErrorKind::Parse(text.to_string()))
    }

    fn parse_with(&self, text: &str, pattern: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Some(dt);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(self.zone.localize(naive));
        }
        NaiveDate::parse_from_str(text, pattern)
            .ok()
            .map(|d| self.zone.start_of_day(d))
    }
}

fn parse_text<T: FromStr>(text: &str) -> Result<T, ConversionErrorKind> {
    text.trim()
        .parse::<T>()
        .map_err(|_| ConversionErrorKind::Parse(text.to_string()))
}

fn parse_decimal(text: &str) -> Result<Decimal, ConversionErrorKind> {
    let t = text.trim();
    Decimal::from_str(t)
        .or_else(|_| Decimal::from_scientific(t))
        .map_err(|_| ConversionErrorKind::Parse(text.to_string()))
}

fn format_instant(
    dt: &DateTime<FixedOffset>,
    pattern: &str,
) -> Result<String, ConversionErrorKind> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        return Err(ConversionErrorKind::InvalidValue(format!(
            "invalid date pattern '{pattern}'"
        )));
    }
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.iter())).map_err(|_| {
        ConversionErrorKind::InvalidValue(format!("cannot render date with '{pattern}'"))
    })?;
    Ok(out)
}

fn unsupported(value: &HostValue, target: HostType) -> ConversionErrorKind {
    ConversionErrorKind::Unsupported {
        native: value.host_type().to_string(),
        host: target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn utc() -> Coercion<'static> {
        Coercion::new(HostZone::Utc)
    }

    #[test]
    fn test_truthy_set() {
        for t in ["Y", "y", "TRUE", "true", "Yes", "1"] {
            assert!(is_truthy(t), "{t}");
        }
        for f in ["no", "", "N", "0", "false", "2", " Y"] {
            assert!(!is_truthy(f), "{f}");
        }
    }

    #[test]
    fn test_boolean_text_roundtrip() {
        let c = utc();
        assert_eq!(c.text(&HostValue::Boolean(true)).unwrap(), "Y");
        assert_eq!(c.text(&HostValue::Boolean(false)).unwrap(), "N");
        assert!(c.boolean(&HostValue::String("Y".into())).unwrap());
        assert!(!c.boolean(&HostValue::String("maybe".into())).unwrap());
    }

    #[test]
    fn test_number_to_integer_truncates() {
        let c = utc();
        assert_eq!(c.integer(&HostValue::Number(2.9)).unwrap(), 2);
        assert_eq!(c.integer(&HostValue::Number(-2.9)).unwrap(), -2);
        assert!(c.integer(&HostValue::Number(f64::NAN)).is_err());
        assert!(c.integer(&HostValue::Number(1e30)).is_err());
        assert_eq!(
            c.integer(&HostValue::BigNumber(Decimal::new(-1599, 2))).unwrap(),
            -15
        );
    }

    #[test]
    fn test_text_to_numbers() {
        let c = utc();
        assert_eq!(c.integer(&HostValue::String(" 42 ".into())).unwrap(), 42);
        assert!(matches!(
            c.integer(&HostValue::String("abc".into())),
            Err(ConversionErrorKind::Parse(_))
        ));
        assert_eq!(
            c.big_number(&HostValue::String("12.30".into())).unwrap(),
            Decimal::new(1230, 2)
        );
        assert_eq!(
            c.big_number(&HostValue::String("1.5e2".into())).unwrap(),
            Decimal::new(150, 0)
        );
        assert!((c.number(&HostValue::String("1.25".into())).unwrap() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_date_default_format_roundtrip() {
        let c = utc();
        let parsed = c.instant(&HostValue::String("2021/03/04 05:06:07.890".into())).unwrap();
        assert_eq!(parsed.year(), 2021);
        assert_eq!(parsed.hour(), 5);
        assert_eq!(parsed.timestamp_subsec_millis(), 890);
        let text = c.text(&HostValue::Timestamp(parsed)).unwrap();
        assert_eq!(text, "2021/03/04 05:06:07.890");
    }

    #[test]
    fn test_date_custom_format() {
        let c = utc().with_format(Some("%d.%m.%Y"));
        let parsed = c.instant(&HostValue::String("02.01.1970".into())).unwrap();
        assert_eq!(parsed.timestamp(), 86_400);
        assert_eq!(c.text(&HostValue::Date(parsed)).unwrap(), "02.01.1970");
        assert!(c.instant(&HostValue::String("1970-01-02".into())).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_error_not_panic() {
        let c = utc().with_format(Some("%Q"));
        let dt = c.instant(&HostValue::Integer(0)).unwrap();
        assert!(matches!(
            c.text(&HostValue::Date(dt)),
            Err(ConversionErrorKind::InvalidValue(_))
        ));
    }

    #[test]
    fn test_fallback_formats() {
        let c = utc();
        assert!(c.instant(&HostValue::String("2020-05-06".into())).is_ok());
        assert!(c
            .instant(&HostValue::String("2020-05-06T01:02:03+02:00".into()))
            .is_ok());
        assert!(c.instant(&HostValue::String("yesterday".into())).is_err());
    }

    #[test]
    fn test_epoch_millis_to_instant() {
        let c = utc();
        let dt = c.instant(&HostValue::Integer(86_400_000)).unwrap();
        assert_eq!(dt.day(), 2);
        assert_eq!(c.integer(&HostValue::Timestamp(dt)).unwrap(), 86_400_000);
    }

    #[test]
    fn test_inet_conversions() {
        let c = utc();
        let ip = c.inet(&HostValue::String("192.168.0.1".into())).unwrap();
        assert_eq!(ip.to_string(), "192.168.0.1");
        assert_eq!(c.inet(&HostValue::Binary(vec![10, 0, 0, 1])).unwrap().to_string(), "10.0.0.1");
        assert!(c.inet(&HostValue::Binary(vec![1, 2, 3])).is_err());
        assert!(matches!(
            c.number(&HostValue::Inet(ip)),
            Err(ConversionErrorKind::Unsupported { .. })
        ));
    }

    #[test]
    fn test_coerce_same_type_is_identity() {
        let c = utc();
        let v = HostValue::Integer(5);
        assert_eq!(c.coerce(&v, HostType::Integer).unwrap(), v);
        assert_eq!(
            c.coerce(&v, HostType::String).unwrap(),
            HostValue::String("5".into())
        );
        assert_eq!(
            c.parse("TRUE", HostType::Boolean).unwrap(),
            HostValue::Boolean(true)
        );
    }
}
