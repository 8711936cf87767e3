//! In-memory master-data stores. Process-local, lock-based, no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use mdm_core::{AggregateRoot, Ean, ExpectedRevision, MediaId, Sku};
use mdm_dam::{LinkStatus, Media, StorageRef};
use mdm_pim::{Article, Product};

use super::{ArticleStore, MediaStore, ProductStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<Ean, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn get(&self, ean: &Ean) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        Ok(products.get(ean).cloned())
    }

    fn insert_new(&self, product: Product) -> Result<(), StoreError> {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        if products.contains_key(product.ean()) {
            return Err(StoreError::Duplicate(product.ean().to_string()));
        }
        products.insert(product.ean().clone(), product);
        Ok(())
    }

    fn save(&self, product: Product, expected: ExpectedRevision) -> Result<(), StoreError> {
        // Check-and-swap under the write lock; that lock is what makes the
        // optimistic check authoritative.
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        if let ExpectedRevision::Exact(expected) = expected {
            let actual = products.get(product.ean()).map(|p| p.revision()).unwrap_or(0);
            if expected != actual {
                return Err(StoreError::ConcurrentModification { expected, actual });
            }
        }
        products.insert(product.ean().clone(), product);
        Ok(())
    }
}

/// Articles live in a BTreeMap so per-product listings come out in stable
/// SKU order.
#[derive(Debug, Default)]
pub struct InMemoryArticleStore {
    articles: RwLock<BTreeMap<(Ean, Sku), Article>>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArticleStore for InMemoryArticleStore {
    fn get(&self, owner: &Ean, sku: &Sku) -> Result<Option<Article>, StoreError> {
        let articles = self.articles.read().unwrap_or_else(PoisonError::into_inner);
        Ok(articles.get(&(owner.clone(), sku.clone())).cloned())
    }

    fn register(&self, article: Article) -> Result<(), StoreError> {
        let mut articles = self.articles.write().unwrap_or_else(PoisonError::into_inner);
        articles.insert((article.owner().clone(), article.sku().clone()), article);
        Ok(())
    }

    fn for_product(&self, owner: &Ean) -> Result<Vec<Article>, StoreError> {
        let articles = self.articles.read().unwrap_or_else(PoisonError::into_inner);
        Ok(articles
            .values()
            .filter(|article| article.owner() == owner)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    records: RwLock<HashMap<MediaId, Media>>,
    binaries: RwLock<HashMap<StorageRef, Vec<u8>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaStore for InMemoryMediaStore {
    fn get(&self, id: &MediaId) -> Result<Option<Media>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(id).cloned())
    }

    fn save(&self, media: Media) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(media.media_id().clone(), media);
        Ok(())
    }

    fn save_binary(&self, storage: &StorageRef, bytes: &[u8]) -> Result<(), StoreError> {
        let mut binaries = self.binaries.write().unwrap_or_else(PoisonError::into_inner);
        binaries.insert(storage.clone(), bytes.to_vec());
        Ok(())
    }

    fn load_binary(&self, storage: &StorageRef) -> Result<Option<Vec<u8>>, StoreError> {
        let binaries = self.binaries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(binaries.get(storage).cloned())
    }

    fn update_link_status(&self, id: &MediaId, status: LinkStatus) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.get_mut(id) {
            Some(media) => {
                media.set_link_status(status);
                Ok(())
            }
            None => Err(StoreError::Backend(format!("no media record for {id}"))),
        }
    }
}
