//! Pending resolution markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mdm_core::{Ean, MediaId};
use mdm_dam::ParsedFileKey;

/// An asset that named an EAN whose product (or article) is not there yet.
///
/// The marker keeps everything needed to retry later without re-reading the
/// asset: the parsed key and the attempt history that the retry policy
/// judges against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResolution {
    pub media: MediaId,
    /// The EAN the asset is waiting on; retries are keyed by it.
    pub ean: Ean,
    pub key: ParsedFileKey,
    /// Resolution attempts so far, the failed first one included.
    pub attempts: u32,
    pub first_attempted_at: DateTime<Utc>,
    pub last_attempted_at: DateTime<Utc>,
}

impl PendingResolution {
    pub fn new(media: MediaId, ean: Ean, key: ParsedFileKey, now: DateTime<Utc>) -> Self {
        Self {
            media,
            ean,
            key,
            attempts: 1,
            first_attempted_at: now,
            last_attempted_at: now,
        }
    }

    /// Record one more failed attempt. `first_attempted_at` never moves; the
    /// horizon is measured from the first sighting.
    pub fn mark_attempt(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_attempted_at = now;
    }
}
