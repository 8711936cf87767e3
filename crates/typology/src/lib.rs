//! Typology domain module: runtime-defined product classes.
//!
//! A typology describes which attributes a class of products carries and how
//! they are validated. Typologies are **data, not code**: introducing a new
//! product class means publishing a definition at runtime, never editing a
//! match arm. Published versions are immutable; evolution appends versions.

pub mod attribute;
pub mod registry;
pub mod typology;
pub mod validator;

pub use attribute::{
    AttributeConstraints, AttributeDefinition, AttributeKind, AttributeMap, AttributeValue,
    attribute_map,
};
pub use registry::{RegistryError, TypologyRegistry};
pub use typology::{Typology, TypologySpec};
pub use validator::{
    ConstraintRule, SchemaValidator, ValidationError, ValidationReport, ValidationTarget,
    Violation, check_against, check_overrides,
};
