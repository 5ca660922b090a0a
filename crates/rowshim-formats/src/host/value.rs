//! Typed host values.

use std::net::IpAddr;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use super::HostType;

/// A single non-null host value.
///
/// Absent values are represented as `None` in a [`HostRow`](super::HostRow).
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// UTF-8 text.
    String(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Number(f64),
    /// Arbitrary-precision decimal.
    BigNumber(Decimal),
    /// Boolean.
    Boolean(bool),
    /// Start of a calendar day in the host zone.
    Date(DateTime<FixedOffset>),
    /// Instant.
    Timestamp(DateTime<FixedOffset>),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Network address.
    Inet(IpAddr),
}

impl HostValue {
    /// Returns the host type of this value.
    #[must_use]
    pub fn host_type(&self) -> HostType {
        match self {
            Self::String(_) => HostType::String,
            Self::Integer(_) => HostType::Integer,
            Self::Number(_) => HostType::Number,
            Self::BigNumber(_) => HostType::BigNumber,
            Self::Boolean(_) => HostType::Boolean,
            Self::Date(_) => HostType::Date,
            Self::Timestamp(_) => HostType::Timestamp,
            Self::Binary(_) => HostType::Binary,
            Self::Inet(_) => HostType::Inet,
        }
    }

    /// Returns the text if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<Decimal> for HostValue {
    fn from(v: Decimal) -> Self {
        Self::BigNumber(v)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

impl From<IpAddr> for HostValue {
    fn from(v: IpAddr) -> Self {
        Self::Inet(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_type_of_values() {
        assert_eq!(HostValue::from("a").host_type(), HostType::String);
        assert_eq!(HostValue::from(3i32).host_type(), HostType::Integer);
        assert_eq!(HostValue::from(1.5).host_type(), HostType::Number);
        assert_eq!(HostValue::from(true).host_type(), HostType::Boolean);
        assert_eq!(
            HostValue::from(Decimal::new(15, 1)).host_type(),
            HostType::BigNumber
        );
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(HostValue::from(ip).host_type(), HostType::Inet);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(HostValue::from("x").as_str(), Some("x"));
        assert_eq!(HostValue::from(7i64).as_integer(), Some(7));
        assert_eq!(HostValue::from(7i64).as_str(), None);
    }
}
