//! Attribute definitions and values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mdm_core::{DomainError, ValueObject};

/// The type an attribute's values must carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Text,
    Number,
    Boolean,
    Enumeration,
}

impl core::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            AttributeKind::Text => "text",
            AttributeKind::Number => "number",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Enumeration => "enumeration",
        };
        f.write_str(name)
    }
}

/// A single typed attribute value.
///
/// Enumeration values carry the chosen label; whether the label is allowed is
/// the validator's business, not the value's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Enumeration(String),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Text(_) => AttributeKind::Text,
            AttributeValue::Number(_) => AttributeKind::Number,
            AttributeValue::Boolean(_) => AttributeKind::Boolean,
            AttributeValue::Enumeration(_) => AttributeKind::Enumeration,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        AttributeValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        AttributeValue::Number(value)
    }

    pub fn boolean(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }

    pub fn enumeration(value: impl Into<String>) -> Self {
        AttributeValue::Enumeration(value.into())
    }
}

impl ValueObject for AttributeValue {}

/// Attribute name → value, ordered for deterministic iteration and output.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Validation constraints attached to one attribute definition.
///
/// Which fields make sense depends on the attribute kind; coherence is
/// enforced when the typology is published (`min`/`max` on numbers, `pattern`
/// on text, `allowed` on enumerations).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl AttributeConstraints {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.pattern.is_none() && self.allowed.is_none()
    }
}

/// Declaration of one attribute within a typology version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub kind: AttributeKind,
    /// Required attributes must be present in every validated map.
    #[serde(default)]
    pub required: bool,
    /// Shared attributes hold at product level for all articles; the rest may
    /// be overridden per article.
    #[serde(default)]
    pub shared: bool,
    #[serde(default, skip_serializing_if = "AttributeConstraints::is_empty")]
    pub constraints: AttributeConstraints,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            shared: false,
            constraints: AttributeConstraints::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    pub fn allowed(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.constraints.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Check the definition itself is coherent. Returns the reasons it is not.
    pub(crate) fn coherence_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("attribute name must not be empty".to_string());
        }

        let c = &self.constraints;
        match self.kind {
            AttributeKind::Number => {
                if c.pattern.is_some() {
                    problems.push(format!("'{}': pattern is only valid on text", self.name));
                }
                if c.allowed.is_some() {
                    problems.push(format!(
                        "'{}': allowed values are only valid on enumerations",
                        self.name
                    ));
                }
                if let (Some(min), Some(max)) = (c.min, c.max) {
                    if min > max {
                        problems.push(format!("'{}': min {min} exceeds max {max}", self.name));
                    }
                }
            }
            AttributeKind::Text => {
                if c.min.is_some() || c.max.is_some() {
                    problems.push(format!("'{}': min/max are only valid on numbers", self.name));
                }
                if c.allowed.is_some() {
                    problems.push(format!(
                        "'{}': allowed values are only valid on enumerations",
                        self.name
                    ));
                }
                if let Some(pattern) = &c.pattern {
                    if regex::Regex::new(pattern).is_err() {
                        problems.push(format!(
                            "'{}': pattern {pattern:?} does not compile",
                            self.name
                        ));
                    }
                }
            }
            AttributeKind::Boolean => {
                if !c.is_empty() {
                    problems.push(format!("'{}': booleans take no constraints", self.name));
                }
            }
            AttributeKind::Enumeration => {
                if c.min.is_some() || c.max.is_some() || c.pattern.is_some() {
                    problems.push(format!(
                        "'{}': enumerations only take allowed values",
                        self.name
                    ));
                }
                match &c.allowed {
                    Some(values) if values.is_empty() => {
                        problems.push(format!("'{}': allowed values must not be empty", self.name));
                    }
                    Some(_) => {}
                    None => problems.push(format!(
                        "'{}': enumerations must declare allowed values",
                        self.name
                    )),
                }
            }
        }

        problems
    }
}

/// Convenience for building attribute maps in services and tests.
pub fn attribute_map(
    entries: impl IntoIterator<Item = (&'static str, AttributeValue)>,
) -> AttributeMap {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Parse a JSON value into a typed attribute value.
///
/// Numbers accept any JSON number; strings become text. Enumerations cannot
/// be told apart from text in raw JSON, so callers resolving against a
/// definition should use [`AttributeValue::from_json_as`].
pub fn from_json(value: &serde_json::Value) -> Result<AttributeValue, DomainError> {
    match value {
        serde_json::Value::String(s) => Ok(AttributeValue::Text(s.clone())),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(AttributeValue::Number)
            .ok_or_else(|| DomainError::validation(format!("number out of range: {n}"))),
        serde_json::Value::Bool(b) => Ok(AttributeValue::Boolean(*b)),
        other => Err(DomainError::validation(format!(
            "unsupported attribute value: {other}"
        ))),
    }
}

impl AttributeValue {
    /// Parse a JSON value with a target kind in hand, so string input can
    /// land as text or enumeration as the definition demands.
    pub fn from_json_as(
        kind: AttributeKind,
        value: &serde_json::Value,
    ) -> Result<Self, DomainError> {
        match (kind, value) {
            (AttributeKind::Enumeration, serde_json::Value::String(s)) => {
                Ok(AttributeValue::Enumeration(s.clone()))
            }
            _ => from_json(value),
        }
    }
}
