//! Macro for defining closed, string-backed status enumerations.
//!
//! Status sets are matched exhaustively everywhere, so adding a variant is a
//! compile error until every transition table and summary handles it.

/// Define a fieldless enum with a canonical kebab-case spelling.
///
/// Generates:
/// - The enum with `Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord`
///   and serde impls using the canonical spelling
/// - `ALL` (every variant in declaration order) and `as_str()`
/// - `Display` and `FromStr` (the error lists the accepted values)
macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $Name:ident {
            $(
                $(#[$vmeta:meta])*
                $Variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $Name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $Variant,
            )+
        }

        impl $Name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$Name] = &[$($Name::$Variant),+];

            /// Canonical spelling of this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($Name::$Variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $Name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase().replace('_', "-");
                $Name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = $Name::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "invalid {} '{}': expected one of {}",
                            stringify!($Name),
                            s,
                            valid.join(", ")
                        )
                    })
            }
        }
    };
}

pub(crate) use define_status_enum;
