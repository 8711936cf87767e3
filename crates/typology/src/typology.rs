//! Typology definitions: the draft you submit and the immutable version the
//! registry hands back.

use serde::{Deserialize, Serialize};

use mdm_core::{SchemaVersion, TypologyId, TypologyRef};

use crate::attribute::AttributeDefinition;

/// A typology definition as submitted for publication.
///
/// A submitted definition has no version; the registry assigns one when it
/// accepts the definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypologySpec {
    pub id: TypologyId,
    pub display_name: String,
    pub attributes: Vec<AttributeDefinition>,
}

impl TypologySpec {
    pub fn new(id: TypologyId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.push(definition);
        self
    }

    /// All reasons this definition cannot be published. Empty means publishable.
    pub(crate) fn coherence_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.display_name.trim().is_empty() {
            problems.push("display name must not be empty".to_string());
        }

        let mut seen = std::collections::BTreeSet::new();
        for def in &self.attributes {
            if !seen.insert(def.name.as_str()) {
                problems.push(format!("duplicate attribute '{}'", def.name));
            }
            problems.extend(def.coherence_problems());
        }

        problems
    }
}

/// One immutable, published version of a typology.
///
/// Never constructed outside the registry; holding a `Typology` means the
/// definition passed coherence checks and carries an assigned version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typology {
    id: TypologyId,
    display_name: String,
    version: SchemaVersion,
    attributes: Vec<AttributeDefinition>,
}

impl Typology {
    pub(crate) fn from_spec(spec: TypologySpec, version: SchemaVersion) -> Self {
        Self {
            id: spec.id,
            display_name: spec.display_name,
            version,
            attributes: spec.attributes,
        }
    }

    pub fn id(&self) -> &TypologyId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn reference(&self) -> TypologyRef {
        TypologyRef::new(self.id.clone(), self.version)
    }

    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    pub fn definition(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|def| def.name == name)
    }

    /// Required attributes in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter().filter(|def| def.required)
    }

    /// Shared attributes hold product-wide; articles may not override them.
    pub fn shared(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter().filter(|def| def.shared)
    }
}
