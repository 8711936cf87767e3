//! Process-wide observability setup shared by every MDM binary.
//!
//! Library crates only emit through `tracing`; installing a subscriber is
//! the entry point's job, via [`init`].

pub mod tracing;

pub use tracing::{init, init_with_filter};
