//! Identifier newtypes.
//!
//! Entity ids such as `REQ-001` are plain strings on the wire but distinct
//! types in code, so a test case id can never be passed where a script id
//! is expected.

/// Define an id newtype over a non-blank `String`.
///
/// Blank values are refused by `try_new`, `FromStr` and deserialization;
/// `new` is for ids the ledger minted itself and panics on a blank value.
macro_rules! define_newtype_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl $Name {
            const BLANK: &'static str = concat!(stringify!($Name), " cannot be blank");

            pub fn new(value: impl Into<String>) -> Self {
                match Self::try_new(value) {
                    Some(id) => id,
                    None => panic!("{}", Self::BLANK),
                }
            }

            pub fn try_new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                (!value.trim().is_empty()).then_some(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(d)?;
                Self::try_new(raw).ok_or_else(|| serde::de::Error::custom(Self::BLANK))
            }
        }

        impl std::str::FromStr for $Name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, String> {
                Self::try_new(s).ok_or_else(|| Self::BLANK.to_string())
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str {
                self.as_str()
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }
    };
}

pub(crate) use define_newtype_string;
