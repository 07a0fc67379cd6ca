//! Core library for PDF document authentication.
//!
//! This crate provides:
//! - PDF extraction into a structured record (page text, embedded images
//!   with SHA-256 hashes, QR payloads, placement boxes, metadata)
//! - Text normalization for case- and whitespace-insensitive matching
//! - Rule validation against required image hashes and page-one texts
//! - Canonical document codes derived from embedded QR payloads

pub mod barcode;
pub mod error;
pub mod extract;
pub mod hash;
pub mod models;
pub mod pdf;
pub mod qr;
pub mod raster;
pub mod report;
pub mod text;
pub mod validate;

pub use error::{DocAuthError, PdfError, Result};
pub use models::{
    BoundingBox, Dimensions, DocumentRecord, ExtractOptions, ImageRecord, Metadata, Position,
    RequiredImage, ValidationConfig,
};
pub use barcode::{BarcodeDecoder, Symbol, Symbology};
pub use extract::DocumentExtractor;
pub use pdf::{LopdfSource, PdfSource, RawImage};
pub use qr::canonicalize;
pub use raster::{ImageRasterDecoder, RasterDecoder};
pub use report::{authenticate, ValidationReport};
pub use text::normalize;
pub use validate::{validate, ValidationOutcome};

#[cfg(feature = "qr")]
pub use barcode::QrDecoder;
