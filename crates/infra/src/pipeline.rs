//! Record-then-publish pipeline for integration events.

use thiserror::Error;
use tracing::debug;

use mdm_events::{Event, EventBus, EventEnvelope, MdmEvent};
use mdm_linking::{EventPublisher, PortError};

use crate::event_log::EventLog;
use crate::stores::StoreError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("event log append failed: {0}")]
    Record(#[from] StoreError),

    /// The event is in the log but fan-out failed; consumers catch up by
    /// replaying the log.
    #[error("event publication failed after append: {0}")]
    Publish(String),
}

/// Couples the event log and the bus: every event is appended to the log
/// first and published only afterwards, so subscribers never see an event
/// the log does not hold.
#[derive(Debug)]
pub struct EventPipeline<L, B> {
    log: L,
    bus: B,
}

impl<L, B> EventPipeline<L, B> {
    pub fn new(log: L, bus: B) -> Self {
        Self { log, bus }
    }

    pub fn log(&self) -> &L {
        &self.log
    }
}

impl<L, B> EventPipeline<L, B>
where
    L: EventLog,
    B: EventBus<EventEnvelope<MdmEvent>>,
{
    pub fn emit(&self, event: MdmEvent) -> Result<EventEnvelope<MdmEvent>, PipelineError> {
        let envelope = self.log.record(event)?;
        debug!(
            event = envelope.payload().event_type(),
            stream = %envelope.entity_id(),
            sequence = envelope.sequence_number(),
            "event recorded"
        );
        self.bus
            .publish(envelope.clone())
            .map_err(|err| PipelineError::Publish(format!("{err:?}")))?;
        Ok(envelope)
    }
}

impl<L, B> EventPublisher for EventPipeline<L, B>
where
    L: EventLog,
    B: EventBus<EventEnvelope<MdmEvent>>,
{
    fn publish(&self, event: MdmEvent) -> Result<(), PortError> {
        match self.emit(event) {
            Ok(_) => Ok(()),
            Err(PipelineError::Record(StoreError::Timeout)) => Err(PortError::Timeout),
            Err(other) => Err(PortError::Unavailable(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use mdm_core::{SchemaVersion, TypologyId};
    use mdm_events::InMemoryEventBus;

    use super::*;

    fn published(id: &str) -> MdmEvent {
        MdmEvent::TypologyPublished {
            id: TypologyId::new(id).unwrap(),
            version: SchemaVersion::FIRST,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn emit_records_before_fanning_out() {
        let log = Arc::new(crate::event_log::InMemoryEventLog::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let pipeline = EventPipeline::new(log.clone(), bus);

        let envelope = pipeline.emit(published("electronics")).unwrap();

        assert_eq!(envelope.sequence_number(), 1);
        assert_eq!(log.all().unwrap().len(), 1);
        let delivered = sub.try_recv().unwrap();
        assert_eq!(delivered.event_id(), envelope.event_id());
    }

    #[test]
    fn publisher_port_reports_infrastructure_failures() {
        let log = Arc::new(crate::event_log::InMemoryEventLog::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let pipeline = EventPipeline::new(log, bus);

        let publisher: &dyn EventPublisher = &pipeline;
        publisher.publish(published("electronics")).unwrap();
    }
}
