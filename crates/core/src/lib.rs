// Core functionality for mcphub: document conversion, world context,
// server manifests, the server registry and platform sync

pub mod context;
pub mod document;
pub mod generator;
pub mod manifest;
pub mod platform;
pub mod registry;

pub use document::{ConversionOptions, Document, DocumentError, OutputFormat};
pub use manifest::ServerManifest;
pub use platform::{Platform, PlatformSync};
pub use registry::{ServerEntry, ServerRegistry};
