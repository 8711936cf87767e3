//! Media assets and content-addressed ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use mdm_core::{DomainError, Ean, Entity, MediaId, Sku};

use crate::filename::ParsedFileKey;
use crate::format::{FormatDescriptor, FormatRegistry};

/// Location of the stored binary, relative to the media root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageRef(String);

impl StorageRef {
    pub fn for_media(id: &MediaId, extension: Option<&str>) -> Self {
        match extension {
            Some(ext) => Self(format!("media/{id}.{ext}")),
            None => Self(format!("media/{id}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for StorageRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an asset stands in the linking workflow.
///
/// `Linked` is terminal and immutable once reached; `Ambiguous` and `Failed`
/// are terminal too. Only `Unlinked` assets are still in play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkStatus {
    Unlinked,
    Linked { ean: Ean, sku: Option<Sku> },
    Ambiguous,
    Failed,
}

impl LinkStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LinkStatus::Unlinked)
    }
}

/// A media asset: identity, parsed filename, format and link state.
///
/// Identity is the SHA-256 of the content, so the same bytes uploaded twice
/// are the same asset no matter what the files were called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    id: MediaId,
    original_filename: String,
    key: ParsedFileKey,
    format: FormatDescriptor,
    storage: StorageRef,
    link_status: LinkStatus,
    ingested_at: DateTime<Utc>,
}

impl Media {
    /// Build an asset from an upload. Structurally total: any filename and
    /// any bytes produce an asset; only link resolution can fail later.
    pub fn ingest(
        filename: &str,
        bytes: &[u8],
        formats: &FormatRegistry,
        ingested_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let id = MediaId::new(hex::encode(Sha256::digest(bytes)))?;
        let key = ParsedFileKey::parse(filename);
        let format = formats.classify(key.extension.as_deref());
        let storage = StorageRef::for_media(&id, key.extension.as_deref());

        Ok(Self {
            id,
            original_filename: filename.to_string(),
            key,
            format,
            storage,
            link_status: LinkStatus::Unlinked,
            ingested_at,
        })
    }

    pub fn media_id(&self) -> &MediaId {
        &self.id
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn key(&self) -> &ParsedFileKey {
        &self.key
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn storage(&self) -> &StorageRef {
        &self.storage
    }

    pub fn link_status(&self) -> &LinkStatus {
        &self.link_status
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    pub fn set_link_status(&mut self, status: LinkStatus) {
        self.link_status = status;
    }
}

impl Entity for Media {
    type Id = MediaId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
