//! In-memory event bus for tests/dev.

use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, MessageFilter, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

struct Subscriber<M> {
    sender: mpsc::Sender<M>,
    filter: Option<MessageFilter<M>>,
}

impl<M> Subscriber<M> {
    fn wants(&self, message: &M) -> bool {
        self.filter.as_ref().is_none_or(|f| f(message))
    }
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - At-least-once acceptable (subscribers must be idempotent)
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<Subscriber<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // Drop any dead subscribers while publishing. A subscriber whose
        // filter rejects the message is kept but not sent to.
        subs.retain(|sub| !sub.wants(&message) || sub.sender.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        self.attach(None)
    }

    fn subscribe_filtered(&self, filter: MessageFilter<M>) -> Subscription<M> {
        self.attach(Some(filter))
    }
}

impl<M> InMemoryEventBus<M> {
    fn attach(&self, filter: Option<MessageFilter<M>>) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(Subscriber { sender: tx, filter });
        }

        Subscription::new(rx)
    }
}
