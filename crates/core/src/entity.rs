//! Entity trait: identity + continuity across state changes.

/// Minimal interface for domain objects with identity.
///
/// An entity stays the same thing while its state moves: a media asset keeps
/// its content hash through link-status changes, an article keeps its SKU
/// through override edits. Contrast with [`ValueObject`](crate::ValueObject),
/// where only the values matter.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
