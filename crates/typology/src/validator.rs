//! Schema validation of attribute maps against published typologies.
//!
//! Validation is exhaustive: one pass reports **every** violation instead of
//! stopping at the first, so a caller can fix a whole submission at once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mdm_core::{TypologyId, TypologyRef};

use crate::attribute::{AttributeKind, AttributeMap, AttributeValue};
use crate::registry::{RegistryError, TypologyRegistry};
use crate::typology::Typology;

/// Constraint that a value failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintRule {
    MissingRequired,
    BelowMinimum { min: f64, found: f64 },
    AboveMaximum { max: f64, found: f64 },
    PatternMismatch { pattern: String },
    NotAllowed { allowed: Vec<String> },
    /// Shared attributes hold product-wide; articles may not override them.
    NotOverridable,
}

/// One reason an attribute map does not conform to a typology version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    /// The map carries an attribute the typology does not declare.
    UnknownAttribute { attribute: String },
    /// The value's type differs from the declared kind.
    TypeMismatch {
        attribute: String,
        expected: AttributeKind,
        found: AttributeKind,
    },
    /// The value (or its absence) breaks a declared constraint.
    Constraint {
        attribute: String,
        rule: ConstraintRule,
    },
}

impl Violation {
    pub fn attribute(&self) -> &str {
        match self {
            Violation::UnknownAttribute { attribute }
            | Violation::TypeMismatch { attribute, .. }
            | Violation::Constraint { attribute, .. } => attribute,
        }
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Violation::UnknownAttribute { attribute } => {
                write!(f, "'{attribute}' is not declared by the typology")
            }
            Violation::TypeMismatch {
                attribute,
                expected,
                found,
            } => write!(f, "'{attribute}' must be {expected}, got {found}"),
            Violation::Constraint { attribute, rule } => match rule {
                ConstraintRule::MissingRequired => write!(f, "'{attribute}' is required"),
                ConstraintRule::BelowMinimum { min, found } => {
                    write!(f, "'{attribute}' is {found}, below the minimum {min}")
                }
                ConstraintRule::AboveMaximum { max, found } => {
                    write!(f, "'{attribute}' is {found}, above the maximum {max}")
                }
                ConstraintRule::PatternMismatch { pattern } => {
                    write!(f, "'{attribute}' does not match {pattern:?}")
                }
                ConstraintRule::NotAllowed { allowed } => {
                    write!(f, "'{attribute}' is not one of {allowed:?}")
                }
                ConstraintRule::NotOverridable => {
                    write!(f, "'{attribute}' is shared at product level")
                }
            },
        }
    }
}

/// Everything wrong with one attribute map, against one pinned version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub typology: TypologyRef,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The typology (or the pinned version) is not published.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The map was checked and does not conform.
    #[error("{} violation(s) against {}", .report.len(), .report.typology)]
    Rejected { report: ValidationReport },
}

/// Which typology version to validate against.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationTarget {
    /// The exact version a product is pinned to.
    Pinned(TypologyRef),
    /// Whatever version is newest at validation time.
    Latest(TypologyId),
}

/// Validates attribute maps against the registry.
///
/// The validator owns no state beyond a registry handle; resolution happens
/// per call so it always sees the registry's current contents.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    registry: Arc<TypologyRegistry>,
}

impl SchemaValidator {
    pub fn new(registry: Arc<TypologyRegistry>) -> Self {
        Self { registry }
    }

    /// Validate `values` against the target version.
    ///
    /// Returns the resolved reference on success, so callers can stamp state
    /// with the exact version that accepted the map.
    pub fn validate(
        &self,
        target: &ValidationTarget,
        values: &AttributeMap,
    ) -> Result<TypologyRef, ValidationError> {
        let typology = match target {
            ValidationTarget::Pinned(reference) => self.registry.resolve(reference)?,
            ValidationTarget::Latest(id) => self.registry.latest(id)?,
        };

        let violations = check_against(&typology, values);
        if violations.is_empty() {
            Ok(typology.reference())
        } else {
            Err(ValidationError::Rejected {
                report: ValidationReport {
                    typology: typology.reference(),
                    violations,
                },
            })
        }
    }
}

/// Collect every violation of `values` against one typology version.
///
/// Checks run in a fixed order: required presence first (declaration order),
/// then each supplied entry (map order) for existence, kind and constraints.
/// A single value can contribute at most one violation.
pub fn check_against(typology: &Typology, values: &AttributeMap) -> Vec<Violation> {
    let mut violations = Vec::new();

    for def in typology.required() {
        if !values.contains_key(&def.name) {
            violations.push(Violation::Constraint {
                attribute: def.name.clone(),
                rule: ConstraintRule::MissingRequired,
            });
        }
    }

    for (name, value) in values {
        check_value(typology, name, value, &mut violations);
    }

    violations
}

/// Collect violations of a partial map (article overrides) against a
/// typology version. Required presence is not checked; overrides are sparse
/// by nature. Shared attributes may not be overridden at all.
pub fn check_overrides(typology: &Typology, values: &AttributeMap) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (name, value) in values {
        if let Some(def) = typology.definition(name) {
            if def.shared {
                violations.push(Violation::Constraint {
                    attribute: name.clone(),
                    rule: ConstraintRule::NotOverridable,
                });
                continue;
            }
        }
        check_value(typology, name, value, &mut violations);
    }

    violations
}

fn check_value(
    typology: &Typology,
    name: &str,
    value: &AttributeValue,
    violations: &mut Vec<Violation>,
) {
    let Some(def) = typology.definition(name) else {
        violations.push(Violation::UnknownAttribute {
            attribute: name.to_string(),
        });
        return;
    };

    if value.kind() != def.kind {
        violations.push(Violation::TypeMismatch {
            attribute: name.to_string(),
            expected: def.kind,
            found: value.kind(),
        });
        return;
    }

    let c = &def.constraints;
    match value {
        AttributeValue::Number(found) => {
            if let Some(min) = c.min {
                if *found < min {
                    violations.push(Violation::Constraint {
                        attribute: name.to_string(),
                        rule: ConstraintRule::BelowMinimum { min, found: *found },
                    });
                    return;
                }
            }
            if let Some(max) = c.max {
                if *found > max {
                    violations.push(Violation::Constraint {
                        attribute: name.to_string(),
                        rule: ConstraintRule::AboveMaximum { max, found: *found },
                    });
                }
            }
        }
        AttributeValue::Text(found) => {
            if let Some(pattern) = &c.pattern {
                // Publication verified the pattern compiles; an uncompilable
                // pattern cannot reach a published typology.
                if let Ok(re) = regex::Regex::new(pattern) {
                    if !re.is_match(found) {
                        violations.push(Violation::Constraint {
                            attribute: name.to_string(),
                            rule: ConstraintRule::PatternMismatch {
                                pattern: pattern.clone(),
                            },
                        });
                    }
                }
            }
        }
        AttributeValue::Enumeration(found) => {
            if let Some(allowed) = &c.allowed {
                if !allowed.contains(found) {
                    violations.push(Violation::Constraint {
                        attribute: name.to_string(),
                        rule: ConstraintRule::NotAllowed {
                            allowed: allowed.clone(),
                        },
                    });
                }
            }
        }
        AttributeValue::Boolean(_) => {}
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::attribute::{AttributeDefinition, attribute_map};
    use crate::typology::TypologySpec;

    fn sensors_validator() -> SchemaValidator {
        let registry = Arc::new(TypologyRegistry::new());
        registry
            .publish(
                TypologySpec::new(TypologyId::new("sensors").unwrap(), "Sensors")
                    .attribute(
                        AttributeDefinition::new("value", AttributeKind::Number)
                            .required()
                            .min(0.0)
                            .max(100.0),
                    )
                    .attribute(AttributeDefinition::new("label", AttributeKind::Text)),
            )
            .unwrap();
        SchemaValidator::new(registry)
    }

    fn sensors_target() -> ValidationTarget {
        ValidationTarget::Latest(TypologyId::new("sensors").unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 1000, ..ProptestConfig::default() })]

        #[test]
        fn prop_in_range_values_always_conform(v in 0.0f64..=100.0) {
            let validator = sensors_validator();
            let values = attribute_map([("value", AttributeValue::number(v))]);
            prop_assert!(validator.validate(&sensors_target(), &values).is_ok());
        }

        #[test]
        fn prop_out_of_range_values_never_conform(
            v in prop_oneof![-1e12f64..-1e-9, 100.000001f64..1e12],
        ) {
            let validator = sensors_validator();
            let values = attribute_map([("value", AttributeValue::number(v))]);
            let err = validator.validate(&sensors_target(), &values).unwrap_err();
            let ValidationError::Rejected { report } = err else {
                return Err(TestCaseError::fail("expected rejection"));
            };
            prop_assert_eq!(report.len(), 1);
        }

        #[test]
        fn prop_validation_is_deterministic(v in -1e12f64..1e12, s in "[a-z]{0,12}") {
            let validator = sensors_validator();
            let values = attribute_map([
                ("value", AttributeValue::number(v)),
                ("label", AttributeValue::text(s)),
            ]);
            let first = validator.validate(&sensors_target(), &values);
            let second = validator.validate(&sensors_target(), &values);
            prop_assert_eq!(first, second);
        }
    }
}
