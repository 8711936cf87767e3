//! Application facade: one entry point wiring typologies, products, media
//! and linking together over in-memory infrastructure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use mdm_core::{
    AggregateRoot, DomainError, Ean, ExpectedRevision, MediaId, SchemaVersion, Sku, TypologyId,
    TypologyRef,
};
use mdm_dam::{FormatRegistry, LinkStatus, Media};
use mdm_events::{EventEnvelope, InMemoryEventBus, MdmEvent, execute};
use mdm_linking::{LinkRetryPolicy, MdmOrchestrator, PendingResolution, PortError};
use mdm_pim::{
    ActivateProduct, Article, CreateProduct, Product, ProductCommand, RetireProduct, UpdateProduct,
};
use mdm_typology::{
    AttributeMap, RegistryError, SchemaValidator, Typology, TypologyRegistry, TypologySpec,
    ValidationError, ValidationReport, ValidationTarget, check_overrides,
};

use crate::adapters::{StoreMediaSink, StoreProductLookup};
use crate::event_log::{EventLog, InMemoryEventLog};
use crate::pipeline::{EventPipeline, PipelineError};
use crate::stores::{
    ArticleStore, InMemoryArticleStore, InMemoryLinkStore, InMemoryMediaStore,
    InMemoryPendingStore, InMemoryProductStore, MediaStore, ProductStore, StoreError,
};
use crate::workers::{WorkerConfig, WorkerSet, spawn_resolution_worker, spawn_sweeper};

/// Bus the core publishes event envelopes on.
pub type MdmBus = InMemoryEventBus<EventEnvelope<MdmEvent>>;
/// Record-then-publish pipeline over the in-memory log and bus.
pub type MdmPipeline = EventPipeline<Arc<InMemoryEventLog>, Arc<MdmBus>>;

/// Everything that can go wrong at the application surface.
#[derive(Debug, Error)]
pub enum MdmError {
    #[error("attribute validation failed against {}: {} violation(s)", .report.typology, .report.len())]
    Validation { report: ValidationReport },

    #[error("typology '{0}' is not published")]
    UnknownTypology(TypologyId),

    #[error("typology '{id}' has no version {version}")]
    UnknownTypologyVersion { id: TypologyId, version: SchemaVersion },

    #[error("typology '{0}' is already published")]
    DuplicateTypology(TypologyId),

    #[error("invalid typology definition: {0}")]
    InvalidTypology(String),

    #[error("product {0} already exists")]
    DuplicateProduct(Ean),

    #[error("product {0} not found")]
    ProductNotFound(Ean),

    #[error("media {0} not found")]
    MediaNotFound(MediaId),

    #[error("revision conflict: expected {expected}, stored is {actual}")]
    ConcurrentModification { expected: u64, actual: u64 },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<RegistryError> for MdmError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateTypology { id } => MdmError::DuplicateTypology(id),
            RegistryError::UnknownTypology { id } => MdmError::UnknownTypology(id),
            RegistryError::UnknownVersion { id, version } => {
                MdmError::UnknownTypologyVersion { id, version }
            }
            RegistryError::InvalidDefinition { reasons } => {
                MdmError::InvalidTypology(reasons.join("; "))
            }
        }
    }
}

impl From<ValidationError> for MdmError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Registry(registry) => registry.into(),
            ValidationError::Rejected { report } => MdmError::Validation { report },
        }
    }
}

impl From<StoreError> for MdmError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrentModification { expected, actual } => {
                MdmError::ConcurrentModification { expected, actual }
            }
            other => MdmError::Store(other),
        }
    }
}

impl From<PipelineError> for MdmError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Record(store) => store.into(),
            PipelineError::Publish(reason) => MdmError::Publish(reason),
        }
    }
}

impl From<PortError> for MdmError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Timeout => MdmError::Store(StoreError::Timeout),
            PortError::Unavailable(reason) => MdmError::Store(StoreError::Backend(reason)),
        }
    }
}

/// How an update treats a product stored under an older typology version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPolicy {
    /// Validate against the version the product is stamped with.
    #[default]
    KeepStored,
    /// Validate against the latest published version and restamp on success.
    MigrateToLatest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MdmConfig {
    pub retry: LinkRetryPolicy,
    pub worker: WorkerConfig,
}

/// The assembled MDM core.
///
/// All state lives behind `Arc`ed stores, so the facade is cheap to share
/// across threads; workers started via [`start_workers`](Self::start_workers)
/// operate on the same stores.
pub struct MdmCore {
    typologies: Arc<TypologyRegistry>,
    validator: SchemaValidator,
    products: Arc<InMemoryProductStore>,
    articles: Arc<InMemoryArticleStore>,
    media: Arc<InMemoryMediaStore>,
    formats: Arc<FormatRegistry>,
    log: Arc<InMemoryEventLog>,
    bus: Arc<MdmBus>,
    pipeline: Arc<MdmPipeline>,
    orchestrator: Arc<MdmOrchestrator>,
    config: MdmConfig,
}

impl Default for MdmCore {
    fn default() -> Self {
        Self::new(MdmConfig::default())
    }
}

impl MdmCore {
    pub fn new(config: MdmConfig) -> Self {
        let typologies = Arc::new(TypologyRegistry::new());
        let validator = SchemaValidator::new(typologies.clone());
        let products = Arc::new(InMemoryProductStore::new());
        let articles = Arc::new(InMemoryArticleStore::new());
        let media = Arc::new(InMemoryMediaStore::new());
        let formats = Arc::new(FormatRegistry::with_builtins());
        let log = Arc::new(InMemoryEventLog::new());
        let bus = Arc::new(MdmBus::new());
        let pipeline = Arc::new(EventPipeline::new(log.clone(), bus.clone()));

        let orchestrator = Arc::new(MdmOrchestrator::new(
            Arc::new(StoreProductLookup::new(products.clone(), articles.clone())),
            Arc::new(StoreMediaSink::new(media.clone())),
            Arc::new(InMemoryLinkStore::new()),
            Arc::new(InMemoryPendingStore::new()),
            pipeline.clone(),
            config.retry.clone(),
        ));

        Self {
            typologies,
            validator,
            products,
            articles,
            media,
            formats,
            log,
            bus,
            pipeline,
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &MdmConfig {
        &self.config
    }

    /// The format registry, open for runtime additions.
    pub fn format_registry(&self) -> &Arc<FormatRegistry> {
        &self.formats
    }

    /// The event bus, for subscribing additional consumers.
    pub fn bus(&self) -> &Arc<MdmBus> {
        &self.bus
    }

    // ----- typologies -----------------------------------------------------

    /// Publish version 1 of a new typology.
    pub fn publish_typology(&self, spec: TypologySpec) -> Result<TypologyRef, MdmError> {
        let published = self.typologies.publish(spec)?;
        self.pipeline.emit(MdmEvent::TypologyPublished {
            id: published.id.clone(),
            version: published.version,
            occurred_at: Utc::now(),
        })?;
        info!(typology = %published, "typology published");
        Ok(published)
    }

    /// Append the next version of an existing typology.
    pub fn revise_typology(&self, spec: TypologySpec) -> Result<TypologyRef, MdmError> {
        let revised = self.typologies.revise(spec)?;
        self.pipeline.emit(MdmEvent::TypologyPublished {
            id: revised.id.clone(),
            version: revised.version,
            occurred_at: Utc::now(),
        })?;
        info!(typology = %revised, "typology revised");
        Ok(revised)
    }

    /// Fetch a published typology; `None` selects the latest version.
    pub fn typology(
        &self,
        id: &TypologyId,
        version: Option<SchemaVersion>,
    ) -> Result<Arc<Typology>, MdmError> {
        let typology = match version {
            Some(version) => self.typologies.get(id, version)?,
            None => self.typologies.latest(id)?,
        };
        Ok(typology)
    }

    // ----- products -------------------------------------------------------

    /// Create a product under a typology; `version` pins a specific schema
    /// version, `None` takes the latest published one.
    pub fn create_product(
        &self,
        ean: Ean,
        typology: TypologyId,
        version: Option<SchemaVersion>,
        attributes: AttributeMap,
    ) -> Result<Product, MdmError> {
        let target = match version {
            Some(version) => ValidationTarget::Pinned(TypologyRef::new(typology, version)),
            None => ValidationTarget::Latest(typology),
        };
        let resolved = self.validator.validate(&target, &attributes)?;

        let mut product = Product::empty(ean.clone());
        execute(
            &mut product,
            &ProductCommand::CreateProduct(CreateProduct {
                ean: ean.clone(),
                typology: resolved.clone(),
                attributes,
                occurred_at: Utc::now(),
            }),
        )?;

        self.products.insert_new(product.clone()).map_err(|err| match err {
            StoreError::Duplicate(_) => MdmError::DuplicateProduct(ean.clone()),
            other => other.into(),
        })?;

        self.emit_product_upserted(&product)?;
        info!(ean = %ean, typology = %resolved, "product created");
        Ok(product)
    }

    /// Replace a product's attribute map.
    ///
    /// The whole map is validated and stored; there is no partial merge.
    /// `expected_revision` is the caller's optimistic concurrency token.
    pub fn update_product(
        &self,
        ean: &Ean,
        attributes: AttributeMap,
        expected_revision: u64,
        migration: MigrationPolicy,
    ) -> Result<Product, MdmError> {
        let stored = self
            .products
            .get(ean)?
            .ok_or_else(|| MdmError::ProductNotFound(ean.clone()))?;
        let stored_ref = Self::typology_of(&stored)?;

        let target = match migration {
            MigrationPolicy::KeepStored => ValidationTarget::Pinned(stored_ref),
            MigrationPolicy::MigrateToLatest => ValidationTarget::Latest(stored_ref.id),
        };
        let resolved = self.validator.validate(&target, &attributes)?;

        let mut product = stored;
        execute(
            &mut product,
            &ProductCommand::UpdateProduct(UpdateProduct {
                ean: ean.clone(),
                typology: resolved,
                attributes,
                occurred_at: Utc::now(),
            }),
        )?;

        self.products
            .save(product.clone(), ExpectedRevision::Exact(expected_revision))?;
        self.emit_product_upserted(&product)?;
        Ok(product)
    }

    pub fn activate_product(&self, ean: &Ean, expected_revision: u64) -> Result<Product, MdmError> {
        self.transition(ean, expected_revision, |ean, occurred_at| {
            ProductCommand::ActivateProduct(ActivateProduct { ean, occurred_at })
        })
    }

    pub fn retire_product(&self, ean: &Ean, expected_revision: u64) -> Result<Product, MdmError> {
        self.transition(ean, expected_revision, |ean, occurred_at| {
            ProductCommand::RetireProduct(RetireProduct { ean, occurred_at })
        })
    }

    fn transition(
        &self,
        ean: &Ean,
        expected_revision: u64,
        command: impl FnOnce(Ean, DateTime<Utc>) -> ProductCommand,
    ) -> Result<Product, MdmError> {
        let mut product = self
            .products
            .get(ean)?
            .ok_or_else(|| MdmError::ProductNotFound(ean.clone()))?;
        execute(&mut product, &command(ean.clone(), Utc::now()))?;
        self.products
            .save(product.clone(), ExpectedRevision::Exact(expected_revision))?;
        self.emit_product_upserted(&product)?;
        Ok(product)
    }

    pub fn product(&self, ean: &Ean) -> Result<Product, MdmError> {
        self.products
            .get(ean)?
            .ok_or_else(|| MdmError::ProductNotFound(ean.clone()))
    }

    // ----- articles -------------------------------------------------------

    /// Register a sellable variant under its owning product.
    ///
    /// Overrides are validated against the owner's typology (requiredness is
    /// not re-checked; absent attributes inherit). Registration is an upsert
    /// and announces the owner again, which wakes media parked on its EAN.
    pub fn register_article(
        &self,
        sku: Sku,
        owner: Ean,
        overrides: AttributeMap,
    ) -> Result<Article, MdmError> {
        let product = self
            .products
            .get(&owner)?
            .ok_or_else(|| MdmError::ProductNotFound(owner.clone()))?;
        let stored_ref = Self::typology_of(&product)?;
        let typology = self.typologies.resolve(&stored_ref)?;

        let violations = check_overrides(&typology, &overrides);
        if !violations.is_empty() {
            return Err(MdmError::Validation {
                report: ValidationReport { typology: stored_ref, violations },
            });
        }

        let article = Article::new(sku.clone(), owner.clone(), overrides);
        self.articles.register(article.clone())?;
        self.emit_product_upserted(&product)?;
        info!(sku = %sku, owner = %owner, "article registered");
        Ok(article)
    }

    pub fn articles(&self, owner: &Ean) -> Result<Vec<Article>, MdmError> {
        Ok(self.articles.for_product(owner)?)
    }

    // ----- media ----------------------------------------------------------

    /// Ingest an asset from its upload form: original filename plus bytes.
    ///
    /// Identity is the content hash, so re-uploading identical bytes
    /// converges on one record; an already-earned link status survives the
    /// re-ingest.
    pub fn ingest_media(&self, filename: &str, bytes: &[u8]) -> Result<Media, MdmError> {
        let mut media = Media::ingest(filename, bytes, &self.formats, Utc::now())?;
        if let Some(existing) = self.media.get(media.media_id())? {
            media.set_link_status(existing.link_status().clone());
        }
        self.media.save_binary(media.storage(), bytes)?;
        self.media.save(media.clone())?;

        let key = media.key().clone();
        self.pipeline.emit(MdmEvent::MediaIngested {
            media: media.media_id().clone(),
            filename: media.original_filename().to_string(),
            ean: key.ean,
            sku: key.sku,
            tag: key.tag,
            extension: key.extension,
            occurred_at: Utc::now(),
        })?;
        info!(media = %media.media_id(), filename, "media ingested");
        Ok(media)
    }

    pub fn media(&self, id: &MediaId) -> Result<Media, MdmError> {
        self.media
            .get(id)?
            .ok_or_else(|| MdmError::MediaNotFound(id.clone()))
    }

    pub fn media_binary(&self, id: &MediaId) -> Result<Vec<u8>, MdmError> {
        let media = self.media(id)?;
        self.media
            .load_binary(media.storage())?
            .ok_or_else(|| MdmError::MediaNotFound(id.clone()))
    }

    pub fn link_status(&self, id: &MediaId) -> Result<LinkStatus, MdmError> {
        Ok(self.media(id)?.link_status().clone())
    }

    // ----- linking and events ---------------------------------------------

    /// Assets currently parked for retry, oldest first.
    pub fn pending_resolutions(&self) -> Result<Vec<PendingResolution>, MdmError> {
        Ok(self.orchestrator.parked()?)
    }

    /// Feed one event through the orchestrator synchronously.
    ///
    /// This is the replay entry point: handlers are idempotent, so driving
    /// the recorded log through here converges on the same state.
    pub fn handle_event(&self, event: &MdmEvent) -> Result<(), MdmError> {
        Ok(self.orchestrator.handle(event, Utc::now())?)
    }

    /// Everything recorded so far, in recording order.
    pub fn recorded_events(&self) -> Result<Vec<EventEnvelope<MdmEvent>>, MdmError> {
        Ok(self.log.all()?)
    }

    /// Start the resolution worker and the retry sweeper.
    pub fn start_workers(&self) -> WorkerSet {
        WorkerSet::new(vec![
            spawn_resolution_worker(&self.bus, self.orchestrator.clone(), &self.config.worker),
            spawn_sweeper(self.orchestrator.clone(), &self.config.worker),
        ])
    }

    // ----- internals ------------------------------------------------------

    fn emit_product_upserted(&self, product: &Product) -> Result<(), MdmError> {
        let typology = Self::typology_of(product)?;
        self.pipeline.emit(MdmEvent::ProductUpserted {
            ean: product.ean().clone(),
            typology,
            revision: product.revision(),
            occurred_at: Utc::now(),
        })?;
        Ok(())
    }

    fn typology_of(product: &Product) -> Result<TypologyRef, MdmError> {
        product
            .typology()
            .cloned()
            .ok_or_else(|| DomainError::invariant("stored product carries no typology").into())
    }
}
