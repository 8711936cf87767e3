//! Integration events: the one vocabulary modules share.
//!
//! The product side and the media side never call each other; everything that
//! crosses the boundary is one of these events. Payloads are deliberately
//! flat (identifiers and primitives only) so no module needs another module's
//! internal types to consume them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mdm_core::{Ean, EntityId, MediaId, SchemaVersion, Sku, TypologyId, TypologyRef};

use crate::event::Event;

/// Why a media asset terminally failed to link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkFailureReason {
    /// The filename carried no `EAN` token; resolution is impossible.
    NoEanToken,
    /// More than one product claimed the EAN.
    AmbiguousEan { candidates: Vec<Ean> },
    /// The retry budget ran out without the product (or article) appearing.
    RetryHorizonExhausted { attempts: u32 },
}

impl core::fmt::Display for LinkFailureReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkFailureReason::NoEanToken => write!(f, "no EAN token in filename"),
            LinkFailureReason::AmbiguousEan { candidates } => {
                write!(f, "ambiguous EAN ({} candidates)", candidates.len())
            }
            LinkFailureReason::RetryHorizonExhausted { attempts } => {
                write!(f, "retry horizon exhausted after {attempts} attempts")
            }
        }
    }
}

/// Events crossing module boundaries.
///
/// `MediaIngested` carries the parsed filename tokens as plain optionals so
/// the link side can rebuild its resolution key without depending on the
/// parser's output type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MdmEvent {
    TypologyPublished {
        id: TypologyId,
        version: SchemaVersion,
        occurred_at: DateTime<Utc>,
    },
    ProductUpserted {
        ean: Ean,
        typology: TypologyRef,
        revision: u64,
        occurred_at: DateTime<Utc>,
    },
    MediaIngested {
        media: MediaId,
        filename: String,
        ean: Option<Ean>,
        sku: Option<Sku>,
        tag: Option<String>,
        extension: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    MediaLinked {
        media: MediaId,
        ean: Ean,
        sku: Option<Sku>,
        occurred_at: DateTime<Utc>,
    },
    MediaLinkFailed {
        media: MediaId,
        reason: LinkFailureReason,
        occurred_at: DateTime<Utc>,
    },
}

impl MdmEvent {
    /// Kind of the entity whose stream records this event.
    pub fn entity_kind(&self) -> &'static str {
        match self {
            MdmEvent::TypologyPublished { .. } => "typology",
            MdmEvent::ProductUpserted { .. } => "product",
            MdmEvent::MediaIngested { .. }
            | MdmEvent::MediaLinked { .. }
            | MdmEvent::MediaLinkFailed { .. } => "media",
        }
    }

    /// Stream identity of the entity this event belongs to.
    pub fn entity_id(&self) -> EntityId {
        match self {
            MdmEvent::TypologyPublished { id, .. } => EntityId::from(id),
            MdmEvent::ProductUpserted { ean, .. } => EntityId::from(ean),
            MdmEvent::MediaIngested { media, .. }
            | MdmEvent::MediaLinked { media, .. }
            | MdmEvent::MediaLinkFailed { media, .. } => EntityId::from(media),
        }
    }
}

impl Event for MdmEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MdmEvent::TypologyPublished { .. } => "mdm.typology.published",
            MdmEvent::ProductUpserted { .. } => "mdm.product.upserted",
            MdmEvent::MediaIngested { .. } => "mdm.media.ingested",
            MdmEvent::MediaLinked { .. } => "mdm.media.linked",
            MdmEvent::MediaLinkFailed { .. } => "mdm.media.link_failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MdmEvent::TypologyPublished { occurred_at, .. }
            | MdmEvent::ProductUpserted { occurred_at, .. }
            | MdmEvent::MediaIngested { occurred_at, .. }
            | MdmEvent::MediaLinked { occurred_at, .. }
            | MdmEvent::MediaLinkFailed { occurred_at, .. } => *occurred_at,
        }
    }
}
