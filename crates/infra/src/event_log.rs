//! Append-only log of integration events, organized in per-entity streams.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use mdm_core::EntityId;
use mdm_events::{EventEnvelope, MdmEvent};

use crate::stores::StoreError;

/// Durable record of everything the core has announced.
///
/// `record` wraps the event in its envelope: a v7 event id and the next
/// sequence number of the entity's stream. Order is total per entity;
/// across entities, `all` returns events in the order they were recorded.
pub trait EventLog: Send + Sync {
    fn record(&self, event: MdmEvent) -> Result<EventEnvelope<MdmEvent>, StoreError>;

    fn stream(&self, entity_id: &EntityId) -> Result<Vec<EventEnvelope<MdmEvent>>, StoreError>;

    fn all(&self) -> Result<Vec<EventEnvelope<MdmEvent>>, StoreError>;
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn record(&self, event: MdmEvent) -> Result<EventEnvelope<MdmEvent>, StoreError> {
        (**self).record(event)
    }

    fn stream(&self, entity_id: &EntityId) -> Result<Vec<EventEnvelope<MdmEvent>>, StoreError> {
        (**self).stream(entity_id)
    }

    fn all(&self) -> Result<Vec<EventEnvelope<MdmEvent>>, StoreError> {
        (**self).all()
    }
}

#[derive(Debug, Default)]
struct LogState {
    recorded: Vec<EventEnvelope<MdmEvent>>,
    next_sequence: HashMap<EntityId, u64>,
}

#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    state: RwLock<LogState>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for InMemoryEventLog {
    fn record(&self, event: MdmEvent) -> Result<EventEnvelope<MdmEvent>, StoreError> {
        let entity_id = event.entity_id();
        let entity_kind = event.entity_kind();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let sequence = state.next_sequence.entry(entity_id.clone()).or_insert(0);
        *sequence += 1;
        let envelope = EventEnvelope::new(Uuid::now_v7(), entity_kind, entity_id, *sequence, event);
        state.recorded.push(envelope.clone());
        Ok(envelope)
    }

    fn stream(&self, entity_id: &EntityId) -> Result<Vec<EventEnvelope<MdmEvent>>, StoreError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .recorded
            .iter()
            .filter(|envelope| envelope.entity_id() == entity_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<EventEnvelope<MdmEvent>>, StoreError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.recorded.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use mdm_core::{Ean, SchemaVersion, TypologyId};

    use super::*;

    fn product_upserted(ean: &str, revision: u64) -> MdmEvent {
        MdmEvent::ProductUpserted {
            ean: Ean::new(ean).unwrap(),
            typology: "electronics@1".parse().unwrap(),
            revision,
            occurred_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        }
    }

    fn typology_published(id: &str) -> MdmEvent {
        MdmEvent::TypologyPublished {
            id: TypologyId::new(id).unwrap(),
            version: SchemaVersion::FIRST,
            occurred_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sequences_are_per_stream() {
        let log = InMemoryEventLog::new();

        let a1 = log.record(product_upserted("4006381333931", 1)).unwrap();
        let b1 = log.record(product_upserted("9990000000000", 1)).unwrap();
        let a2 = log.record(product_upserted("4006381333931", 2)).unwrap();

        assert_eq!(a1.sequence_number(), 1);
        assert_eq!(b1.sequence_number(), 1);
        assert_eq!(a2.sequence_number(), 2);
    }

    #[test]
    fn streams_filter_by_entity() {
        let log = InMemoryEventLog::new();
        log.record(product_upserted("4006381333931", 1)).unwrap();
        log.record(typology_published("electronics")).unwrap();
        log.record(product_upserted("4006381333931", 2)).unwrap();

        let entity = product_upserted("4006381333931", 1).entity_id();
        let stream = log.stream(&entity).unwrap();
        assert_eq!(stream.len(), 2);
        assert!(stream.iter().all(|e| e.entity_id() == &entity));
    }

    #[test]
    fn all_preserves_recording_order() {
        let log = InMemoryEventLog::new();
        log.record(typology_published("electronics")).unwrap();
        log.record(product_upserted("4006381333931", 1)).unwrap();

        let recorded = log.all().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(matches!(recorded[0].payload(), MdmEvent::TypologyPublished { .. }));
        assert!(matches!(recorded[1].payload(), MdmEvent::ProductUpserted { .. }));
    }
}
