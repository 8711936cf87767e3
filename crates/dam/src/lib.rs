//! Digital asset domain module.
//!
//! Media assets enter the system as `(filename, bytes)` and nothing else.
//! Every linking token (EAN, SKU, tag) is carved out of the filename by
//! [`filename::ParsedFileKey`]; the bytes only contribute the content-hash
//! identity.

pub mod filename;
pub mod format;
pub mod media;

pub use filename::ParsedFileKey;
pub use format::{FormatDescriptor, FormatHandler, FormatRegistry, MediaClass};
pub use media::{LinkStatus, Media, StorageRef};
