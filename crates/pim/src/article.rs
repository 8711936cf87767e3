//! Articles: sellable variants of a product, identified by SKU.

use serde::{Deserialize, Serialize};

use mdm_core::{Ean, Entity, Sku};
use mdm_typology::AttributeMap;

/// A sellable variant of a product.
///
/// Articles don't carry their own schema. They inherit the owning product's
/// attributes and may override the non-shared ones; whether an override map
/// is admissible is checked against the product's typology at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    sku: Sku,
    owner: Ean,
    overrides: AttributeMap,
}

impl Article {
    pub fn new(sku: Sku, owner: Ean, overrides: AttributeMap) -> Self {
        Self {
            sku,
            owner,
            overrides,
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn owner(&self) -> &Ean {
        &self.owner
    }

    pub fn overrides(&self) -> &AttributeMap {
        &self.overrides
    }

    /// The article's full attribute view: the product's map with this
    /// article's overrides laid on top.
    pub fn effective_attributes(&self, product_attributes: &AttributeMap) -> AttributeMap {
        let mut effective = product_attributes.clone();
        for (name, value) in &self.overrides {
            effective.insert(name.clone(), value.clone());
        }
        effective
    }
}

impl Entity for Article {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }
}
