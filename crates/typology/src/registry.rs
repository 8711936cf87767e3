//! The typology registry: append-only, versioned, shared.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use mdm_core::{SchemaVersion, TypologyId, TypologyRef};

use crate::typology::{Typology, TypologySpec};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// `publish` on an id that already has a version 1.
    #[error("typology '{id}' is already published; revise it instead")]
    DuplicateTypology { id: TypologyId },

    /// Lookup or revision of an id nothing was ever published under.
    #[error("unknown typology '{id}'")]
    UnknownTypology { id: TypologyId },

    /// Lookup of a version beyond what was published.
    #[error("typology '{id}' has no version {version}")]
    UnknownVersion {
        id: TypologyId,
        version: SchemaVersion,
    },

    /// The submitted definition is incoherent.
    #[error("invalid typology definition: {}", .reasons.join("; "))]
    InvalidDefinition { reasons: Vec<String> },
}

/// Versioned store of typology definitions.
///
/// Writes are strictly append-only: `publish` creates version 1 of a new id,
/// `revise` appends the next version of an existing id, and nothing ever
/// mutates or removes a published version. Readers hold `Arc<Typology>`
/// snapshots, so a revision landing mid-validation cannot change what a
/// running validation sees.
///
/// Under concurrent first publication of the same id, exactly one writer wins
/// and the rest get [`RegistryError::DuplicateTypology`]; the write lock
/// makes the existence check and the insert one atomic step.
#[derive(Debug, Default)]
pub struct TypologyRegistry {
    versions: RwLock<HashMap<TypologyId, Vec<Arc<Typology>>>>,
}

impl TypologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish version 1 of a new typology.
    pub fn publish(&self, spec: TypologySpec) -> Result<TypologyRef, RegistryError> {
        Self::check_coherent(&spec)?;

        let mut versions = self.versions.write().unwrap_or_else(PoisonError::into_inner);
        if versions.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateTypology { id: spec.id });
        }

        let typology = Arc::new(Typology::from_spec(spec, SchemaVersion::FIRST));
        let reference = typology.reference();
        versions.insert(reference.id.clone(), vec![typology]);
        Ok(reference)
    }

    /// Append the next version of an already-published typology.
    pub fn revise(&self, spec: TypologySpec) -> Result<TypologyRef, RegistryError> {
        Self::check_coherent(&spec)?;

        let mut versions = self.versions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(existing) = versions.get_mut(&spec.id) else {
            return Err(RegistryError::UnknownTypology { id: spec.id });
        };

        let next = existing
            .last()
            .map_or(SchemaVersion::FIRST, |t| t.version().next());
        let typology = Arc::new(Typology::from_spec(spec, next));
        let reference = typology.reference();
        existing.push(typology);
        Ok(reference)
    }

    /// Fetch one exact published version.
    pub fn get(
        &self,
        id: &TypologyId,
        version: SchemaVersion,
    ) -> Result<Arc<Typology>, RegistryError> {
        let versions = self.versions.read().unwrap_or_else(PoisonError::into_inner);
        let published = versions
            .get(id)
            .ok_or_else(|| RegistryError::UnknownTypology { id: id.clone() })?;
        published
            .get((version.get() - 1) as usize)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownVersion {
                id: id.clone(),
                version,
            })
    }

    /// Fetch the newest published version.
    pub fn latest(&self, id: &TypologyId) -> Result<Arc<Typology>, RegistryError> {
        let versions = self.versions.read().unwrap_or_else(PoisonError::into_inner);
        versions
            .get(id)
            .and_then(|published| published.last().cloned())
            .ok_or_else(|| RegistryError::UnknownTypology { id: id.clone() })
    }

    /// Resolve a pinned reference.
    pub fn resolve(&self, reference: &TypologyRef) -> Result<Arc<Typology>, RegistryError> {
        self.get(&reference.id, reference.version)
    }

    /// All published ids, unordered.
    pub fn ids(&self) -> Vec<TypologyId> {
        let versions = self.versions.read().unwrap_or_else(PoisonError::into_inner);
        versions.keys().cloned().collect()
    }

    fn check_coherent(spec: &TypologySpec) -> Result<(), RegistryError> {
        let reasons = spec.coherence_problems();
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::InvalidDefinition { reasons })
        }
    }
}
