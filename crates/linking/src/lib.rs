//! Product-media linking: resolution policy and orchestration.
//!
//! This crate owns the boundary between the product side and the media side.
//! Neither side calls the other; the orchestrator consumes their integration
//! events and talks to both through the narrow ports defined here. The ports
//! belong to the orchestrator, so either side can be replaced behind them
//! without the other noticing.

pub mod link;
pub mod orchestrator;
pub mod pending;
pub mod policy;
pub mod ports;
pub mod resolver;

pub use link::ProductMediaLink;
pub use orchestrator::MdmOrchestrator;
pub use pending::PendingResolution;
pub use policy::LinkRetryPolicy;
pub use ports::{
    EventPublisher, InsertOutcome, LinkStore, MediaSink, PendingStore, PortError, ProductLookup,
};
pub use resolver::{LinkOutcome, LinkResolver, UnmatchedReason};
