//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **transport layer** for events after they have been
//! appended to the event log:
//!
//! ```text
//! Operation → Event Log (append) → Event Bus (publish) → Consumers
//!                                                            ├─ Orchestrator worker
//!                                                            └─ Test subscribers
//! ```
//!
//! Events are **stored first**, then published. If publication fails the
//! event is still in the log and can be re-delivered, so the bus only has to
//! provide **at-least-once** delivery and consumers must be idempotent.
//!
//! The contract is transport-agnostic: the in-memory bus here is the default,
//! but nothing in the trait assumes channels, a broker, or persistence.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Predicate deciding whether a subscriber wants a message.
///
/// Filters run on the **publisher's** thread; keep them cheap and total.
pub type MessageFilter<M> = Arc<dyn Fn(&M) -> bool + Send + Sync>;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every published message it did not filter
/// out (broadcast semantics). Subscriptions are designed for single-threaded
/// consumption; a worker loop typically alternates `recv_timeout` with a
/// shutdown check:
///
/// ```ignore
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(envelope) => process(envelope),
///         Err(RecvTimeoutError::Timeout) => continue,      // check shutdown flag
///         Err(RecvTimeoutError::Disconnected) => break,    // bus dropped
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish()` can fail (lock poisoning, broker outage in a real transport).
/// Failures surface to the caller, which may retry; since events are already
/// persisted, retrying publication is safe.
///
/// Implementations must be safe to share across threads; multiple threads may
/// publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Subscribe to every published message.
    fn subscribe(&self) -> Subscription<M>;

    /// Subscribe to the subset of messages matching `filter`.
    ///
    /// Filtering happens before fan-out, so uninterested consumers pay no
    /// queueing cost for traffic they would discard anyway.
    fn subscribe_filtered(&self, filter: MessageFilter<M>) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn subscribe_filtered(&self, filter: MessageFilter<M>) -> Subscription<M> {
        (**self).subscribe_filtered(filter)
    }
}
