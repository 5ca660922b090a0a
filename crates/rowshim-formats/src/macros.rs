/// Generates `FromStr` and optionally `Display` impls for simple string enums.
///
/// # Forms
///
/// - `str_enum!(Enum, norm, "msg", ...)`: both `Display` and `FromStr`
/// - `str_enum!(fromstr Enum, norm, "msg", ...)`: `FromStr` only
///
/// Parse failures are reported as [`FormatError::InvalidConfig`] keyed by
/// the message prefix.
///
/// # Normalization modes
///
/// - `lowercase`: trim, lowercase, `-` becomes `_`
/// - `lowercase_nodash`: trim, lowercase
///
/// [`FormatError::InvalidConfig`]: crate::error::FormatError::InvalidConfig
#[allow(unused_macros)]
macro_rules! str_enum {
    // ── Full form: Display + FromStr ──
    ($enum_name:ident, $norm:ident, $err_msg:literal,
        $( $variant:ident => $display:literal $(, $alias:literal)* );+ $(;)?
    ) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $( Self::$variant => $display, )+
                };
                f.write_str(s)
            }
        }
        str_enum!(fromstr $enum_name, $norm, $err_msg,
            $( $variant => $display $(, $alias)* );+);
    };

    // ── FromStr-only form ──
    (fromstr $enum_name:ident, $norm:ident, $err_msg:literal,
        $( $variant:ident => $canonical:literal $(, $alias:literal)* );+ $(;)?
    ) => {
        impl std::str::FromStr for $enum_name {
            type Err = crate::error::FormatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = str_enum!(@normalize $norm s);
                match normalized.as_str() {
                    $( $canonical $(| $alias)* => Ok(Self::$variant), )+
                    other => Err(crate::error::FormatError::InvalidConfig {
                        key: $err_msg.to_string(),
                        message: format!("unknown value '{other}'"),
                    }),
                }
            }
        }
    };

    // ── Normalization helpers ──
    (@normalize lowercase $s:ident) => { $s.trim().to_lowercase().replace('-', "_") };
    (@normalize lowercase_nodash $s:ident) => { $s.trim().to_lowercase() };
}

/// Declares a native type catalog enum and its
/// [`NativeTypeSpec`](crate::schema::NativeTypeSpec) impl from a table of
/// `Variant = id, "display name", host mapping, displayable;` rows.
///
/// Also generates `Display` (the display name).
#[allow(unused_macros)]
macro_rules! native_catalog {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $id:literal, $display:literal, $host:expr, $displayable:literal;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $crate::schema::NativeTypeSpec for $name {
            fn id(self) -> u32 {
                match self { $( Self::$variant => $id, )+ }
            }

            fn display_name(self) -> &'static str {
                match self { $( Self::$variant => $display, )+ }
            }

            fn host_type(self) -> Option<$crate::host::HostType> {
                match self { $( Self::$variant => $host, )+ }
            }

            fn is_displayable(self) -> bool {
                match self { $( Self::$variant => $displayable, )+ }
            }

            fn all() -> &'static [Self] {
                &[ $( Self::$variant, )+ ]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::schema::NativeTypeSpec::display_name(*self))
            }
        }
    };
}
