//! Format selection.

use std::path::Path;

/// The external formats the engine converts to and from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Avro object container files.
    Avro,
    /// Apache Parquet.
    Parquet,
    /// Apache ORC.
    Orc,
}

str_enum!(FormatKind, lowercase_nodash, "format",
    Avro => "avro";
    Parquet => "parquet", "parq";
    Orc => "orc");

impl FormatKind {
    /// Conventional file extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Avro => "avro",
            Self::Parquet => "parquet",
            Self::Orc => "orc",
        }
    }

    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    /// Returns `true` if support for this format was compiled in.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Avro => cfg!(feature = "avro"),
            Self::Parquet => cfg!(feature = "parquet"),
            Self::Orc => cfg!(feature = "orc"),
        }
    }
}
