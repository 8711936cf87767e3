//! Retry policy for pending resolutions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pending::PendingResolution;

/// Bounds on how long an asset may sit pending.
///
/// Two independent limits, whichever trips first wins: a count of failed
/// resolution attempts and a wall-clock horizon measured from the first
/// attempt. Past either, the asset fails terminally instead of waiting
/// forever for a product that is never coming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRetryPolicy {
    /// Maximum resolution attempts, the initial one included.
    pub max_attempts: u32,
    /// Wall-clock budget from the first failed attempt.
    pub horizon: Duration,
}

impl Default for LinkRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            horizon: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl LinkRetryPolicy {
    /// A policy that fails on the first unmatched resolution.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Check if more attempts are allowed after `attempts` failed ones.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Latest instant at which a marker first attempted at `first` may still
    /// be retried.
    pub fn deadline(&self, first: DateTime<Utc>) -> DateTime<Utc> {
        first + chrono::Duration::from_std(self.horizon).unwrap_or_default()
    }

    pub fn expired(&self, pending: &PendingResolution, now: DateTime<Utc>) -> bool {
        now >= self.deadline(pending.first_attempted_at)
    }

    /// First-attempt instant at or before which a marker counts as expired
    /// at `now`. Used by the sweep.
    pub fn expiry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::from_std(self.horizon).unwrap_or_default()
    }
}
