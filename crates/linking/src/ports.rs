//! Ports the orchestrator owns.
//!
//! Deliberately narrow: one question per concern, nothing resembling either
//! side's full repository surface. Implementations adapt the real stores in
//! the infrastructure layer; tests substitute in-memory doubles.

use std::sync::Arc;

use thiserror::Error;

use mdm_core::{Ean, MediaId, Sku};
use mdm_dam::LinkStatus;
use mdm_events::MdmEvent;

use crate::link::ProductMediaLink;
use crate::pending::PendingResolution;

/// Infrastructure failure at a port.
///
/// These are never linking outcomes: a timeout says nothing about whether a
/// product exists, so the operation surfaces the error and can be retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("port operation timed out")]
    Timeout,

    #[error("port unavailable: {0}")]
    Unavailable(String),
}

impl PortError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortError::Timeout)
    }
}

/// What the link side may ask the product side.
pub trait ProductLookup: Send + Sync {
    /// Products claiming this EAN. More than one entry means the catalog is
    /// in conflict and the asset must not be linked silently.
    fn products_with_ean(&self, ean: &Ean) -> Result<Vec<Ean>, PortError>;

    /// Whether `sku` is registered as an article of the product `owner`.
    fn has_article(&self, owner: &Ean, sku: &Sku) -> Result<bool, PortError>;
}

impl<L> ProductLookup for Arc<L>
where
    L: ProductLookup + ?Sized,
{
    fn products_with_ean(&self, ean: &Ean) -> Result<Vec<Ean>, PortError> {
        (**self).products_with_ean(ean)
    }

    fn has_article(&self, owner: &Ean, sku: &Sku) -> Result<bool, PortError> {
        (**self).has_article(owner, sku)
    }
}

/// What the link side may tell the media side.
pub trait MediaSink: Send + Sync {
    fn update_link_status(&self, media: &MediaId, status: LinkStatus) -> Result<(), PortError>;
}

/// Result of a put-if-absent on the link store.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// The asset was linked before; the existing link wins.
    AlreadyLinked(ProductMediaLink),
}

/// Established product-media links, keyed by media id.
pub trait LinkStore: Send + Sync {
    fn get(&self, media: &MediaId) -> Result<Option<ProductMediaLink>, PortError>;

    /// Put-if-absent. An existing link is never replaced; callers learn about
    /// it through [`InsertOutcome::AlreadyLinked`].
    fn insert(&self, link: ProductMediaLink) -> Result<InsertOutcome, PortError>;
}

/// Markers for assets awaiting a product (or article) that may yet appear.
pub trait PendingStore: Send + Sync {
    fn get(&self, media: &MediaId) -> Result<Option<PendingResolution>, PortError>;

    /// Insert or replace the marker for this asset.
    fn upsert(&self, pending: PendingResolution) -> Result<(), PortError>;

    fn remove(&self, media: &MediaId) -> Result<(), PortError>;

    /// Remove and return every marker waiting on `ean`.
    fn take_for_ean(&self, ean: &Ean) -> Result<Vec<PendingResolution>, PortError>;

    /// Remove and return every marker whose first attempt is at or before
    /// `cutoff`.
    fn take_expired(&self, cutoff: chrono::DateTime<chrono::Utc>)
    -> Result<Vec<PendingResolution>, PortError>;

    /// All markers, for introspection and recovery checks.
    fn snapshot(&self) -> Result<Vec<PendingResolution>, PortError>;
}

/// Outbound integration events from the orchestrator.
///
/// Implementations append to the event log before fanning out, preserving
/// the store-first discipline.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MdmEvent) -> Result<(), PortError>;
}
