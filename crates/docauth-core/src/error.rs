//! Error types for the docauth-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the docauth library.
#[derive(Error, Debug)]
pub enum DocAuthError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// A data, config or source file does not exist.
    #[error("file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A JSON input could not be parsed.
    #[error("failed to parse {}: {source}", .path.display())]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Raster decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to open PDF: {0}")]
    Open(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Failed to extract text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from a page.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The placement box of an image could not be determined.
    #[error("failed to locate image: {0}")]
    Layout(String),
}

/// Result type for the docauth library.
pub type Result<T> = std::result::Result<T, DocAuthError>;
