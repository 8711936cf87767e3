//! Background workers driving link resolution off the event bus.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mdm_events::{Event, EventBus, EventEnvelope, MdmEvent, Subscription};
use mdm_linking::MdmOrchestrator;

/// Handle to a running worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request shutdown and wait for the worker to finish its current item.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Timing knobs for the background loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How long the resolution worker blocks per receive before re-checking
    /// for shutdown.
    pub poll_tick: Duration,
    /// Interval between sweeps for pending markers past the retry horizon.
    pub sweep_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_tick: Duration::from_millis(250),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    pub fn with_poll_tick(mut self, tick: Duration) -> Self {
        self.poll_tick = tick;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Spawn the worker that consumes `MediaIngested` and `ProductUpserted`
/// envelopes and drives the orchestrator.
pub fn spawn_resolution_worker<B>(
    bus: &B,
    orchestrator: Arc<MdmOrchestrator>,
    config: &WorkerConfig,
) -> WorkerHandle
where
    B: EventBus<EventEnvelope<MdmEvent>>,
{
    let subscription = bus.subscribe_filtered(Arc::new(|envelope: &EventEnvelope<MdmEvent>| {
        matches!(
            envelope.payload(),
            MdmEvent::MediaIngested { .. } | MdmEvent::ProductUpserted { .. }
        )
    }));
    let tick = config.poll_tick;
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let join = thread::Builder::new()
        .name("mdm-resolution".to_string())
        .spawn(move || resolution_loop(subscription, shutdown_rx, orchestrator, tick))
        .expect("failed to spawn resolution worker thread");
    WorkerHandle { shutdown: shutdown_tx, join: Some(join) }
}

fn resolution_loop(
    subscription: Subscription<EventEnvelope<MdmEvent>>,
    shutdown_rx: mpsc::Receiver<()>,
    orchestrator: Arc<MdmOrchestrator>,
    tick: Duration,
) {
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }
        match subscription.recv_timeout(tick) {
            Ok(envelope) => {
                if let Err(err) = orchestrator.handle(envelope.payload(), Utc::now()) {
                    warn!(
                        error = %err,
                        event = envelope.payload().event_type(),
                        "link resolution failed; event will not be retried until redelivery"
                    );
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Spawn the sweeper that expires pending markers past the retry horizon.
pub fn spawn_sweeper(orchestrator: Arc<MdmOrchestrator>, config: &WorkerConfig) -> WorkerHandle {
    let interval = config.sweep_interval;
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let join = thread::Builder::new()
        .name("mdm-sweeper".to_string())
        .spawn(move || sweeper_loop(shutdown_rx, orchestrator, interval))
        .expect("failed to spawn sweeper thread");
    WorkerHandle { shutdown: shutdown_tx, join: Some(join) }
}

fn sweeper_loop(
    shutdown_rx: mpsc::Receiver<()>,
    orchestrator: Arc<MdmOrchestrator>,
    interval: Duration,
) {
    loop {
        // The nap doubles as the shutdown wait, so stop requests cut it short.
        match shutdown_rx.recv_timeout(interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        match orchestrator.expire_overdue(Utc::now()) {
            Ok(0) => {}
            Ok(expired) => info!(expired, "expired pending media past the retry horizon"),
            Err(err) => warn!(error = %err, "pending sweep failed"),
        }
    }
}

/// The running workers of one core instance, stopped as a unit.
#[derive(Debug)]
pub struct WorkerSet {
    workers: Vec<WorkerHandle>,
}

impl WorkerSet {
    pub fn new(workers: Vec<WorkerHandle>) -> Self {
        Self { workers }
    }

    /// Stop every worker and join its thread.
    pub fn shutdown(self) {
        for worker in self.workers {
            worker.shutdown();
        }
    }
}
