//! Data models shared by extraction and validation.

pub mod config;
pub mod record;

pub use config::{ExtractOptions, RequiredImage, ValidationConfig};
pub use record::{BoundingBox, Dimensions, DocumentRecord, ImageRecord, Metadata, Position};
