//! `mdm-events`: event fabric for the master-data workspace.
//!
//! Mechanics (trait, envelope, bus) are domain-agnostic; the integration
//! vocabulary in [`integration`] is the one event language modules share.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod integration;

pub use bus::{EventBus, MessageFilter, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use integration::{LinkFailureReason, MdmEvent};
