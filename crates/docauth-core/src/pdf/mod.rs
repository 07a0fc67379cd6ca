//! PDF processing module.

mod extractor;
mod layout;
mod samples;

pub use extractor::LopdfSource;

use crate::error::PdfError;
use crate::models::{BoundingBox, Metadata};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// An embedded raster image as stored in the PDF.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Resource name the page uses to draw the image (e.g. `Im0`).
    pub name: String,
    /// Object number of the image stream, 0 when it is not an indirect object.
    pub xref: u32,
    /// Image bytes in a self-describing format when one is available.
    pub data: Vec<u8>,
    /// File extension matching `data` (jpeg, jpx, png, bin).
    pub ext: String,
    /// Fields of the image dictionary.
    pub info: Metadata,
}

/// Capability the extractor needs from a parsed PDF.
///
/// Pages are 1-indexed. Images are returned in the page's enumeration order.
pub trait PdfSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Extract the text of a page.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Extract the raster images on a page, including those inside Form
    /// XObjects. Each image object appears once.
    fn page_images(&self, page: u32) -> Result<Vec<RawImage>>;

    /// Locate the placement box of an image on its page.
    fn image_bbox(&self, page: u32, image: &RawImage) -> Result<BoundingBox>;

    /// Document information dictionary.
    fn metadata(&self) -> Metadata;
}
