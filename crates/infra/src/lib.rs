//! Infrastructure layer: stores, event log, pipeline, workers and the
//! application facade that wires the MDM core together.

pub mod adapters;
pub mod app;
pub mod event_log;
pub mod pipeline;
pub mod stores;
pub mod workers;


pub use adapters::{StoreMediaSink, StoreProductLookup};
pub use app::{MdmConfig, MdmCore, MdmError, MigrationPolicy};
pub use event_log::{EventLog, InMemoryEventLog};
pub use pipeline::{EventPipeline, PipelineError};
pub use stores::{
    ArticleStore, InMemoryArticleStore, InMemoryLinkStore, InMemoryMediaStore,
    InMemoryPendingStore, InMemoryProductStore, MediaStore, ProductStore, StoreError,
};
pub use workers::{WorkerConfig, WorkerHandle, WorkerSet, spawn_resolution_worker, spawn_sweeper};
