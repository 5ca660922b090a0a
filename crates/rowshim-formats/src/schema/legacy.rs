//! Compound field names written by older schema marshalling.
//!
//! Such names embed the host type id and nullability:
//! `name<DELIM>hostTypeId<DELIM>nullable`. A schema is treated as legacy
//! when its first field name contains the delimiter; every field is then
//! parsed in compatibility mode.

use crate::error::{FormatError, FormatResult};
use crate::host::HostType;

/// Delimiter between the parts of a compound name.
pub const LEGACY_DELIMITER: &str = "_delimiter_";

/// A decoded compound field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFieldName {
    /// Plain field name.
    pub name: String,
    /// Embedded host type; `None` for id `0`.
    pub host_type: Option<HostType>,
    /// Embedded nullability.
    pub nullable: bool,
}

impl LegacyFieldName {
    /// Parses `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SchemaMismatch`] if `raw` does not have three
    /// parts or the parts are malformed.
    pub fn parse(raw: &str) -> FormatResult<Self> {
        let bad = |why: &str| {
            FormatError::SchemaMismatch(format!("legacy field name '{raw}': {why}"))
        };
        let parts: Vec<&str> = raw.split(LEGACY_DELIMITER).collect();
        let [name, type_id, nullable] = parts.as_slice() else {
            return Err(bad("expected name, type and nullable parts"));
        };
        let id: u32 = type_id.parse().map_err(|_| bad("invalid host type id"))?;
        let host_type = match id {
            0 => None,
            id => Some(HostType::from_id(id).ok_or_else(|| bad("unknown host type id"))?),
        };
        let nullable = nullable.parse().map_err(|_| bad("invalid nullable flag"))?;
        Ok(Self {
            name: (*name).to_string(),
            host_type,
            nullable,
        })
    }

    /// Renders the compound form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{LEGACY_DELIMITER}{}{LEGACY_DELIMITER}{}",
            self.name,
            self.host_type.map_or(0, HostType::id),
            self.nullable
        )
    }
}

/// Returns `true` if the first name uses the compound encoding.
pub fn is_legacy<'a>(mut names: impl Iterator<Item = &'a str>) -> bool {
    names.next().is_some_and(|n| n.contains(LEGACY_DELIMITER))
}

/// Returns the plain name part of `raw`, or `raw` itself when it is not a
/// compound name.
#[must_use]
pub fn plain_name(raw: &str) -> &str {
    raw.split(LEGACY_DELIMITER).next().unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound_name() {
        let parsed = LegacyFieldName::parse("name_delimiter_2_delimiter_true").unwrap();
        assert_eq!(parsed.name, "name");
        assert_eq!(parsed.host_type, Some(HostType::String));
        assert!(parsed.nullable);
        assert_eq!(parsed.encode(), "name_delimiter_2_delimiter_true");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(LegacyFieldName::parse("plain").is_err());
        assert!(LegacyFieldName::parse("a_delimiter_x_delimiter_true").is_err());
        assert!(LegacyFieldName::parse("a_delimiter_7_delimiter_true").is_err());
        assert!(LegacyFieldName::parse("a_delimiter_2_delimiter_sometimes").is_err());
    }

    #[test]
    fn test_detection_uses_first_name() {
        assert!(is_legacy(["a_delimiter_5_delimiter_false", "b"].into_iter()));
        assert!(!is_legacy(["a", "b_delimiter_5_delimiter_false"].into_iter()));
        assert!(!is_legacy(std::iter::empty()));
    }

    #[test]
    fn test_plain_name() {
        assert_eq!(plain_name("age_delimiter_5_delimiter_false"), "age");
        assert_eq!(plain_name("age"), "age");
    }
}
