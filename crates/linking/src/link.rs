//! The established link record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mdm_core::{Ean, MediaId, Sku};

/// An immutable fact: this asset belongs to this product (and optionally to
/// one of its articles). Once recorded it is never replaced; re-resolution
/// of a linked asset is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMediaLink {
    pub media: MediaId,
    pub ean: Ean,
    pub sku: Option<Sku>,
    pub linked_at: DateTime<Utc>,
}

impl ProductMediaLink {
    pub fn new(media: MediaId, ean: Ean, sku: Option<Sku>, linked_at: DateTime<Utc>) -> Self {
        Self {
            media,
            ean,
            sku,
            linked_at,
        }
    }
}
