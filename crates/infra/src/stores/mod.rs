//! Storage ports for master data, and their in-memory reference backends.
//!
//! The traits make no storage assumptions. The in-memory backends carry the
//! integration tests and single-process deployments; a database-backed
//! implementation slots in behind the same traits without touching domain
//! code.

mod in_memory;
mod orchestration;

pub use in_memory::{InMemoryArticleStore, InMemoryMediaStore, InMemoryProductStore};
pub use orchestration::{InMemoryLinkStore, InMemoryPendingStore};

use thiserror::Error;

use mdm_core::{Ean, ExpectedRevision, MediaId, Sku};
use mdm_dam::{LinkStatus, Media, StorageRef};
use mdm_pim::{Article, Product};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored revision moved past what the writer saw.
    #[error("revision conflict: expected {expected}, stored is {actual}")]
    ConcurrentModification { expected: u64, actual: u64 },

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("store operation timed out")]
    Timeout,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Product state, keyed by EAN.
pub trait ProductStore: Send + Sync {
    fn get(&self, ean: &Ean) -> Result<Option<Product>, StoreError>;

    /// Insert a freshly created product. `Duplicate` if the EAN is taken.
    fn insert_new(&self, product: Product) -> Result<(), StoreError>;

    /// Replace the stored product. With `ExpectedRevision::Exact`, the write
    /// only lands if the stored revision still matches.
    fn save(&self, product: Product, expected: ExpectedRevision) -> Result<(), StoreError>;
}

/// Articles, keyed by SKU within their owning product.
pub trait ArticleStore: Send + Sync {
    fn get(&self, owner: &Ean, sku: &Sku) -> Result<Option<Article>, StoreError>;

    /// Register or re-register an article under its owner.
    fn register(&self, article: Article) -> Result<(), StoreError>;

    fn for_product(&self, owner: &Ean) -> Result<Vec<Article>, StoreError>;
}

/// Media records plus their binary payloads.
pub trait MediaStore: Send + Sync {
    fn get(&self, id: &MediaId) -> Result<Option<Media>, StoreError>;

    /// Upsert the media record. Content-hash identity makes this naturally
    /// idempotent for byte-identical uploads.
    fn save(&self, media: Media) -> Result<(), StoreError>;

    fn save_binary(&self, storage: &StorageRef, bytes: &[u8]) -> Result<(), StoreError>;

    fn load_binary(&self, storage: &StorageRef) -> Result<Option<Vec<u8>>, StoreError>;

    fn update_link_status(&self, id: &MediaId, status: LinkStatus) -> Result<(), StoreError>;
}
