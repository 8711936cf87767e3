//! Schema versioning primitives shared by the typology registry and the
//! product side.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::TypologyId;
use crate::value_object::ValueObject;

/// Version of a typology definition. Starts at 1 and only ever grows;
/// published versions are immutable.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    pub const FIRST: SchemaVersion = SchemaVersion(1);

    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::validation("schema version must be >= 1"));
        }
        Ok(Self(value))
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SchemaVersion> for u32 {
    fn from(version: SchemaVersion) -> Self {
        version.0
    }
}

impl ValueObject for SchemaVersion {}

/// A pinned reference to one immutable typology version, e.g. `electronics@3`.
///
/// Products carry the reference they were last validated against, so replaying
/// history always re-validates against the exact schema that was in force.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypologyRef {
    pub id: TypologyId,
    pub version: SchemaVersion,
}

impl TypologyRef {
    pub fn new(id: TypologyId, version: SchemaVersion) -> Self {
        Self { id, version }
    }
}

impl core::fmt::Display for TypologyRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl FromStr for TypologyRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, version) = s
            .split_once('@')
            .ok_or_else(|| DomainError::invalid_id(format!("typology ref {s:?}: missing '@'")))?;
        let version: u32 = version
            .parse()
            .map_err(|_| DomainError::invalid_id(format!("typology ref {s:?}: bad version")))?;
        Ok(Self::new(TypologyId::new(id)?, SchemaVersion::new(version)?))
    }
}

impl ValueObject for TypologyRef {}
