//! Strongly-typed identifiers used across the domain.
//!
//! All identifiers wrap a validated `String`. Construction goes through
//! [`new`](Ean::new) (or `FromStr`/serde, which route through the same check),
//! so a held identifier is always well-formed.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// European Article Number: the identity of a product. Digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ean(String);

/// Stock Keeping Unit: the identity of a sellable article. ASCII alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

/// Identifier of a typology (product class). Lowercase slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypologyId(String);

/// Identifier of a media asset. Lowercase hex digest of the asset content,
/// so re-ingesting identical bytes yields the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaId(String);

/// Identifier of an event stream owner (any entity the event log records).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal, $check:expr) => {
        impl $t {
            /// Create a validated identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                let check: fn(&str) -> Result<(), &'static str> = $check;
                check(&value).map_err(|reason| {
                    DomainError::invalid_id(format!("{} {value:?}: {reason}", $name))
                })?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_string_newtype!(Ean, "EAN", |s| {
    if s.is_empty() {
        Err("must not be empty")
    } else if !s.bytes().all(|b| b.is_ascii_digit()) {
        Err("must contain digits only")
    } else {
        Ok(())
    }
});

impl_string_newtype!(Sku, "SKU", |s| {
    if s.is_empty() {
        Err("must not be empty")
    } else if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Err("must be ASCII alphanumeric")
    } else {
        Ok(())
    }
});

impl_string_newtype!(TypologyId, "typology id", |s| {
    if s.is_empty() {
        Err("must not be empty")
    } else if !s
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
    {
        Err("must be a lowercase slug (a-z, 0-9, '-', '_')")
    } else {
        Ok(())
    }
});

impl_string_newtype!(MediaId, "media id", |s| {
    if s.is_empty() {
        Err("must not be empty")
    } else if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        Err("must be lowercase hex")
    } else {
        Ok(())
    }
});

impl_string_newtype!(EntityId, "entity id", |s| {
    if s.is_empty() { Err("must not be empty") } else { Ok(()) }
});

impl From<&Ean> for EntityId {
    fn from(ean: &Ean) -> Self {
        EntityId(format!("product/{}", ean.as_str()))
    }
}

impl From<&MediaId> for EntityId {
    fn from(media: &MediaId) -> Self {
        EntityId(format!("media/{}", media.as_str()))
    }
}

impl From<&TypologyId> for EntityId {
    fn from(typology: &TypologyId) -> Self {
        EntityId(format!("typology/{}", typology.as_str()))
    }
}
