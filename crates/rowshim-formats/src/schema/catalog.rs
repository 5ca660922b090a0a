//! Type catalog contract.

use crate::host::HostType;

/// A format's enumerated native types.
///
/// Every entry has a stable id, a display name and an optional host
/// mapping. Types without a host mapping are unreadable; displayable
/// types can also be built by the format's schema converter.
pub trait NativeTypeSpec: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Stable numeric id used in marshalled schemas.
    fn id(self) -> u32;

    /// Human-readable name.
    fn display_name(self) -> &'static str;

    /// Host type a value of this native type maps to, if any.
    fn host_type(self) -> Option<HostType>;

    /// Whether the schema converter can build this type.
    fn is_displayable(self) -> bool;

    /// All catalog entries.
    fn all() -> &'static [Self];

    /// Looks up an entry by id.
    #[must_use]
    fn from_id(id: u32) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.id() == id)
    }

    /// Looks up an entry by display name, ignoring ASCII case.
    #[must_use]
    fn from_display_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.display_name().eq_ignore_ascii_case(name))
    }

    /// The displayable subset, in catalog order.
    #[must_use]
    fn displayable() -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|t| t.is_displayable())
            .collect()
    }
}
