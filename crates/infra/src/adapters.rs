//! Adapters exposing the master-data stores through the orchestrator ports.

use std::sync::Arc;

use mdm_core::{Ean, MediaId, Sku};
use mdm_dam::LinkStatus;
use mdm_linking::{MediaSink, PortError, ProductLookup};

use crate::stores::{ArticleStore, MediaStore, ProductStore, StoreError};

fn port_error(err: StoreError) -> PortError {
    match err {
        StoreError::Timeout => PortError::Timeout,
        other => PortError::Unavailable(other.to_string()),
    }
}

/// The product catalog as the link side is allowed to see it.
pub struct StoreProductLookup {
    products: Arc<dyn ProductStore>,
    articles: Arc<dyn ArticleStore>,
}

impl StoreProductLookup {
    pub fn new(products: Arc<dyn ProductStore>, articles: Arc<dyn ArticleStore>) -> Self {
        Self { products, articles }
    }
}

impl ProductLookup for StoreProductLookup {
    fn products_with_ean(&self, ean: &Ean) -> Result<Vec<Ean>, PortError> {
        // EAN-keyed primary storage holds at most one claimant; catalogs with
        // dirtier data behind this port may answer with several.
        let found = self.products.get(ean).map_err(port_error)?;
        Ok(found.map(|product| product.ean().clone()).into_iter().collect())
    }

    fn has_article(&self, owner: &Ean, sku: &Sku) -> Result<bool, PortError> {
        Ok(self.articles.get(owner, sku).map_err(port_error)?.is_some())
    }
}

/// Link-status writes routed to the media store.
pub struct StoreMediaSink {
    media: Arc<dyn MediaStore>,
}

impl StoreMediaSink {
    pub fn new(media: Arc<dyn MediaStore>) -> Self {
        Self { media }
    }
}

impl MediaSink for StoreMediaSink {
    fn update_link_status(&self, media: &MediaId, status: LinkStatus) -> Result<(), PortError> {
        self.media.update_link_status(media, status).map_err(port_error)
    }
}
