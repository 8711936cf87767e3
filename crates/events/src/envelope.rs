use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mdm_core::EntityId;

/// Envelope for an event, carrying stream metadata.
///
/// This is the unit the event log appends and the bus distributes.
///
/// Notes:
/// - The stream is identified by `(entity_kind, entity_id)`.
/// - **Append-only**: `sequence_number` is monotonically increasing per stream
///   and doubles as the logical timestamp for everything that happened to one
///   entity.
/// - `payload` is the domain-agnostic event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    entity_kind: String,
    entity_id: EntityId,

    /// Monotonically increasing position in the entity stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        entity_kind: impl Into<String>,
        entity_id: EntityId,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            entity_kind: entity_kind.into(),
            entity_id,
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn entity_kind(&self) -> &str {
        &self.entity_kind
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
