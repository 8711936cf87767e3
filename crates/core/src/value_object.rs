//! Value object trait: equality by value, not identity.

/// Marker trait for immutable domain values compared entirely by their
/// attribute values.
///
/// A `TypologyRef { id: "electronics", version: 3 }` is a value object: any
/// two references with those fields are the same reference. A `Product` is
/// not: it has identity (its EAN) and continuity across state changes.
///
/// "Modifying" a value object means constructing a new one. The trait bounds
/// keep implementations cheap to copy, comparable and debuggable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
