use chrono::{DateTime, Utc};

/// Contract every event payload satisfies.
///
/// An event is a past-tense fact: once emitted it never changes, so the
/// trait only exposes metadata. `version` covers schema evolution of the
/// payload itself, independent of the stream sequence numbers the envelope
/// carries.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "mdm.product.upserted").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
