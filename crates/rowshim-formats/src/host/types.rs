//! Host type tags.

/// Declared type of a host field.
///
/// Ids are stable: they appear in marshalled schema strings, ORC
/// metadata and legacy compound field names. Id `0` means "no type" and
/// maps to `None` in [`HostType::from_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    /// 64-bit floating point.
    Number,
    /// UTF-8 text.
    String,
    /// Calendar date (start of day in the host zone).
    Date,
    /// Boolean.
    Boolean,
    /// 64-bit signed integer. Also accepts the name `long`.
    Integer,
    /// Arbitrary-precision decimal.
    BigNumber,
    /// Raw bytes.
    Binary,
    /// Instant with sub-second precision.
    Timestamp,
    /// IPv4 or IPv6 address.
    Inet,
}

str_enum!(HostType, lowercase, "host_type",
    Number => "number", "double", "float";
    String => "string", "text";
    Date => "date";
    Boolean => "boolean", "bool";
    Integer => "integer", "long", "int";
    BigNumber => "bignumber", "big_number", "bigdecimal", "big_decimal";
    Binary => "binary", "bytes";
    Timestamp => "timestamp";
    Inet => "inet", "internet_address");

impl HostType {
    const ALL: [HostType; 9] = [
        HostType::Number,
        HostType::String,
        HostType::Date,
        HostType::Boolean,
        HostType::Integer,
        HostType::BigNumber,
        HostType::Binary,
        HostType::Timestamp,
        HostType::Inet,
    ];

    /// Returns the stable numeric id.
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::Number => 1,
            Self::String => 2,
            Self::Date => 3,
            Self::Boolean => 4,
            Self::Integer => 5,
            Self::BigNumber => 6,
            Self::Binary => 8,
            Self::Timestamp => 9,
            Self::Inet => 10,
        }
    }

    /// Looks up a type by id. Id `0` and unknown ids yield `None`.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }

    /// Returns every host type.
    #[must_use]
    pub fn all() -> &'static [HostType] {
        &Self::ALL
    }

    /// Returns `true` for the numeric types.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Integer | Self::BigNumber)
    }

    /// Returns `true` for date and timestamp.
    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        assert_eq!(HostType::Number.id(), 1);
        assert_eq!(HostType::String.id(), 2);
        assert_eq!(HostType::Integer.id(), 5);
        assert_eq!(HostType::Timestamp.id(), 9);
        assert_eq!(HostType::Inet.id(), 10);
    }

    #[test]
    fn test_from_id_roundtrip() {
        for t in HostType::all() {
            assert_eq!(HostType::from_id(t.id()), Some(*t));
        }
        assert_eq!(HostType::from_id(0), None);
        assert_eq!(HostType::from_id(7), None);
        assert_eq!(HostType::from_id(42), None);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("long".parse::<HostType>().unwrap(), HostType::Integer);
        assert_eq!("Big-Decimal".parse::<HostType>().unwrap(), HostType::BigNumber);
        assert_eq!("DOUBLE".parse::<HostType>().unwrap(), HostType::Number);
        assert!("serializable".parse::<HostType>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(HostType::BigNumber.to_string(), "bignumber");
        assert_eq!(HostType::Inet.to_string(), "inet");
    }
}
