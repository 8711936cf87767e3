use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mdm_core::{Aggregate, AggregateRoot, DomainError, Ean, TypologyRef};
use mdm_events::Event;
use mdm_typology::AttributeMap;

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Retired,
}

/// Aggregate root: Product, keyed by EAN.
///
/// A product is always stamped with the typology version that last accepted
/// its attributes. Commands arrive with a resolved [`TypologyRef`] and an
/// already-validated map; schema conformance needs the registry, which the
/// aggregate deliberately knows nothing about.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    ean: Ean,
    typology: Option<TypologyRef>,
    attributes: AttributeMap,
    status: ProductStatus,
    revision: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(ean: Ean) -> Self {
        Self {
            ean,
            typology: None,
            attributes: AttributeMap::new(),
            status: ProductStatus::Draft,
            revision: 0,
            created: false,
        }
    }

    pub fn ean(&self) -> &Ean {
        &self.ean
    }

    /// The typology version this product was last validated against.
    ///
    /// `None` only before the creation event has been applied.
    pub fn typology(&self) -> Option<&TypologyRef> {
        self.typology.as_ref()
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_retired(&self) -> bool {
        self.status == ProductStatus::Retired
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Product {
    type Id = Ean;

    fn id(&self) -> &Self::Id {
        &self.ean
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub ean: Ean,
    pub typology: TypologyRef,
    pub attributes: AttributeMap,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. The attribute map replaces the stored one whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub ean: Ean,
    pub typology: TypologyRef,
    pub attributes: AttributeMap,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub ean: Ean,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RetireProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetireProduct {
    pub ean: Ean,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    ActivateProduct(ActivateProduct),
    RetireProduct(RetireProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub ean: Ean,
    pub typology: TypologyRef,
    pub attributes: AttributeMap,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub ean: Ean,
    pub typology: TypologyRef,
    pub attributes: AttributeMap,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductActivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub ean: Ean,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRetired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRetired {
    pub ean: Ean,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    ProductActivated(ProductActivated),
    ProductRetired(ProductRetired),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "pim.product.created",
            ProductEvent::ProductUpdated(_) => "pim.product.updated",
            ProductEvent::ProductActivated(_) => "pim.product.activated",
            ProductEvent::ProductRetired(_) => "pim.product.retired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
            ProductEvent::ProductRetired(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.ean = e.ean.clone();
                self.typology = Some(e.typology.clone());
                self.attributes = e.attributes.clone();
                self.status = ProductStatus::Draft;
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                self.typology = Some(e.typology.clone());
                self.attributes = e.attributes.clone();
            }
            ProductEvent::ProductActivated(_) => {
                self.status = ProductStatus::Active;
            }
            ProductEvent::ProductRetired(_) => {
                self.status = ProductStatus::Retired;
            }
        }

        // Deterministic revision tracking: +1 per applied event.
        self.revision += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::ActivateProduct(cmd) => self.handle_activate(cmd),
            ProductCommand::RetireProduct(cmd) => self.handle_retire(cmd),
        }
    }
}

impl Product {
    fn ensure_ean(&self, ean: &Ean) -> Result<(), DomainError> {
        if &self.ean != ean {
            return Err(DomainError::invariant("EAN mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_ean(&cmd.ean)?;

        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        // Note: EAN uniqueness across the catalog requires infrastructure
        // support (the product store). At the aggregate level we can only
        // reject re-creation of this instance.

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            ean: cmd.ean.clone(),
            typology: cmd.typology.clone(),
            attributes: cmd.attributes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_ean(&cmd.ean)?;

        if self.status == ProductStatus::Retired {
            return Err(DomainError::invariant("retired products cannot be updated"));
        }

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            ean: cmd.ean.clone(),
            typology: cmd.typology.clone(),
            attributes: cmd.attributes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_ean(&cmd.ean)?;

        if self.status == ProductStatus::Active {
            return Err(DomainError::conflict("product is already active"));
        }

        if self.status == ProductStatus::Retired {
            return Err(DomainError::invariant("retired products cannot be activated"));
        }

        Ok(vec![ProductEvent::ProductActivated(ProductActivated {
            ean: cmd.ean.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_retire(&self, cmd: &RetireProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_ean(&cmd.ean)?;

        if self.status == ProductStatus::Retired {
            return Err(DomainError::conflict("product is already retired"));
        }

        Ok(vec![ProductEvent::ProductRetired(ProductRetired {
            ean: cmd.ean.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
