//! Format handling as data.
//!
//! The same open/closed posture the typology registry gives the product side:
//! supporting a new file format means registering a handler at runtime, not
//! extending a match over extensions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Coarse class of a media asset, for routing and display.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaClass {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

/// What the registry knows about one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Canonical lowercase format name, usually the extension.
    pub format: String,
    pub class: MediaClass,
}

impl FormatDescriptor {
    pub fn new(format: impl Into<String>, class: MediaClass) -> Self {
        Self {
            format: format.into(),
            class,
        }
    }

    /// Descriptor for a format nobody registered.
    pub fn other(format: impl Into<String>) -> Self {
        Self::new(format, MediaClass::Other)
    }
}

/// A registered format. Implementations may later carry behavior (thumbnail
/// extraction, metadata probing); the registry only requires a descriptor.
pub trait FormatHandler: Send + Sync {
    fn descriptor(&self) -> FormatDescriptor;
}

struct StaticFormat {
    descriptor: FormatDescriptor,
}

impl FormatHandler for StaticFormat {
    fn descriptor(&self) -> FormatDescriptor {
        self.descriptor.clone()
    }
}

/// Runtime-extensible mapping from file extension to format handler.
#[derive(Default)]
pub struct FormatRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn FormatHandler>>>,
}

impl FormatRegistry {
    /// An empty registry; every extension classifies as `Other`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the common web formats.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (ext, class) in [
            ("jpg", MediaClass::Image),
            ("jpeg", MediaClass::Image),
            ("png", MediaClass::Image),
            ("gif", MediaClass::Image),
            ("webp", MediaClass::Image),
            ("svg", MediaClass::Image),
            ("mp4", MediaClass::Video),
            ("mov", MediaClass::Video),
            ("webm", MediaClass::Video),
            ("mp3", MediaClass::Audio),
            ("wav", MediaClass::Audio),
            ("flac", MediaClass::Audio),
            ("pdf", MediaClass::Document),
        ] {
            registry.register_static(ext, FormatDescriptor::new(ext, class));
        }
        registry
    }

    /// Register (or replace) the handler for an extension.
    pub fn register(&self, extension: &str, handler: Arc<dyn FormatHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.insert(extension.to_ascii_lowercase(), handler);
    }

    /// Register a descriptor-only format.
    pub fn register_static(&self, extension: &str, descriptor: FormatDescriptor) {
        self.register(extension, Arc::new(StaticFormat { descriptor }));
    }

    /// Look up a registered extension (case-insensitive).
    pub fn resolve(&self, extension: &str) -> Option<FormatDescriptor> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .get(&extension.to_ascii_lowercase())
            .map(|handler| handler.descriptor())
    }

    /// Total classification: unregistered or absent extensions land in
    /// `Other` instead of failing ingestion.
    pub fn classify(&self, extension: Option<&str>) -> FormatDescriptor {
        match extension {
            Some(ext) => self
                .resolve(ext)
                .unwrap_or_else(|| FormatDescriptor::other(ext.to_ascii_lowercase())),
            None => FormatDescriptor::other("bin"),
        }
    }

    pub fn extensions(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.keys().cloned().collect()
    }
}
