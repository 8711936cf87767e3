//! Resolution policy: from parsed filename to link outcome.

use serde::{Deserialize, Serialize};

use mdm_core::{Ean, Sku};
use mdm_dam::ParsedFileKey;

use crate::ports::{PortError, ProductLookup};

/// Why a key failed to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Nothing to resolve against; terminal immediately.
    NoEanToken,
    /// The EAN names no product yet; worth waiting for.
    ProductNotFound { ean: Ean },
    /// The product exists but the named article does not; worth waiting for.
    ArticleNotFound { ean: Ean, sku: Sku },
}

impl core::fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UnmatchedReason::NoEanToken => write!(f, "no EAN token"),
            UnmatchedReason::ProductNotFound { ean } => write!(f, "product {ean} not found"),
            UnmatchedReason::ArticleNotFound { ean, sku } => {
                write!(f, "article {sku} not found for product {ean}")
            }
        }
    }
}

/// One resolution attempt's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked { ean: Ean, sku: Option<Sku> },
    Ambiguous { candidates: Vec<Ean> },
    Unmatched { reason: UnmatchedReason },
}

/// Applies the resolution policy against the product side.
///
/// The policy is strictly ordered: EAN presence, then product existence,
/// then uniqueness, then article scope. A SKU token is only ever looked up
/// within the product the EAN named; SKUs resolve nothing on their own.
#[derive(Debug, Clone)]
pub struct LinkResolver<L> {
    lookup: L,
}

impl<L> LinkResolver<L>
where
    L: ProductLookup,
{
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, key: &ParsedFileKey) -> Result<LinkOutcome, PortError> {
        let Some(ean) = &key.ean else {
            return Ok(LinkOutcome::Unmatched {
                reason: UnmatchedReason::NoEanToken,
            });
        };

        let candidates = self.lookup.products_with_ean(ean)?;
        match candidates.len() {
            0 => Ok(LinkOutcome::Unmatched {
                reason: UnmatchedReason::ProductNotFound { ean: ean.clone() },
            }),
            1 => self.resolve_within(ean, key.sku.as_ref()),
            _ => Ok(LinkOutcome::Ambiguous { candidates }),
        }
    }

    fn resolve_within(&self, ean: &Ean, sku: Option<&Sku>) -> Result<LinkOutcome, PortError> {
        let Some(sku) = sku else {
            return Ok(LinkOutcome::Linked {
                ean: ean.clone(),
                sku: None,
            });
        };

        if self.lookup.has_article(ean, sku)? {
            Ok(LinkOutcome::Linked {
                ean: ean.clone(),
                sku: Some(sku.clone()),
            })
        } else {
            Ok(LinkOutcome::Unmatched {
                reason: UnmatchedReason::ArticleNotFound {
                    ean: ean.clone(),
                    sku: sku.clone(),
                },
            })
        }
    }
}
