//! `mdm-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! validated identifiers, schema version references, the aggregate contract and
//! the shared domain error model.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod schema;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedRevision};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{Ean, EntityId, MediaId, Sku, TypologyId};
pub use schema::{SchemaVersion, TypologyRef};
pub use value_object::ValueObject;
