//! Product information domain module (event-sourced).
//!
//! This crate contains the business rules of the product side, implemented
//! purely as deterministic domain logic (no IO, no storage). Whether an
//! attribute map conforms to its typology is decided *before* a command is
//! built, by the schema validator; the aggregate enforces identity and
//! lifecycle invariants.

pub mod article;
pub mod product;

pub use article::Article;
pub use product::{
    ActivateProduct, CreateProduct, Product, ProductActivated, ProductCommand, ProductCreated,
    ProductEvent, ProductRetired, ProductStatus, ProductUpdated, RetireProduct, UpdateProduct,
};
