//! Structured document record produced by extraction and consumed by validation.
//!
//! Field names on the wire follow the established JSON layout of the
//! extraction output (`nombre_archivo`, `imagenes`, ...), so records written
//! by earlier tooling validate unchanged.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DocAuthError, Result};

/// Open string-to-scalar mapping, passed through verbatim.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Wire form of an unavailable placement box.
pub const POSITION_UNAVAILABLE: &str = "No disponible";

/// Label under which the text of a 1-indexed page is stored.
pub fn page_label(page: u32) -> String {
    format!("pagina_{}", page)
}

/// Everything extracted from one PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentRecord {
    /// File name of the source PDF.
    #[serde(rename = "nombre_archivo")]
    pub filename: String,

    /// Path of the source PDF as given on input.
    #[serde(rename = "ruta_completa")]
    pub full_path: String,

    /// Document information dictionary.
    #[serde(rename = "metadata_pdf")]
    pub metadata: Metadata,

    /// Text per page, keyed by [`page_label`], in page order.
    #[serde(rename = "texto_por_pagina")]
    pub text_by_page: IndexMap<String, String>,

    /// Number of entries in `images`.
    #[serde(rename = "cantidad_imagenes")]
    pub image_count: usize,

    /// Images in page-major, in-page enumeration order.
    #[serde(rename = "imagenes")]
    pub images: Vec<ImageRecord>,
}

impl DocumentRecord {
    /// Create an empty record for the given source.
    pub fn new(filename: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            full_path: full_path.into(),
            ..Default::default()
        }
    }

    /// Text stored for a 1-indexed page, if that page was processed.
    pub fn page_text(&self, page: u32) -> Option<&str> {
        self.text_by_page.get(&page_label(page)).map(String::as_str)
    }

    /// Store the text of a page.
    pub fn set_page_text(&mut self, page: u32, text: impl Into<String>) {
        self.text_by_page.insert(page_label(page), text.into());
    }

    /// Append an image and keep `image_count` in step.
    pub fn push_image(&mut self, image: ImageRecord) {
        self.images.push(image);
        self.image_count = self.images.len();
    }

    /// Load a record previously written by [`DocumentRecord::save`].
    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Serialize as pretty JSON with four-space indentation.
    ///
    /// Non-ASCII text is written as-is, never `\u` escaped.
    pub fn to_json_pretty(&self) -> Result<String> {
        to_json_pretty(self)
    }

    /// Write the record to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// One embedded raster image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRecord {
    /// Name of the side file the raw bytes were written to.
    #[serde(rename = "nombre_imagen")]
    pub name: String,

    /// Page number (1-indexed).
    #[serde(rename = "pagina")]
    pub page: u32,

    /// Lowercase hex SHA-256 of the raw extracted bytes.
    pub hash_sha256: String,

    /// Whether a QR symbol was decoded from the image.
    #[serde(rename = "es_qr")]
    pub is_qr: bool,

    /// Decoded QR payload.
    #[serde(rename = "datos_qr")]
    pub qr_data: Option<String>,

    /// Placement box on the page.
    #[serde(rename = "posicion")]
    pub position: Position,

    /// Size of the raw bytes.
    #[serde(rename = "tamano_bytes")]
    pub size_bytes: usize,

    /// Pixel dimensions, zero when the raster could not be decoded.
    #[serde(rename = "dimensiones")]
    pub dimensions: Dimensions,

    /// Fields reported by the PDF image dictionary.
    #[serde(rename = "metadata_interna")]
    pub internal_metadata: Metadata,
}

/// Pixel dimensions of a decoded raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(rename = "ancho")]
    pub width: u32,
    #[serde(rename = "alto")]
    pub height: u32,
}

impl Dimensions {
    /// Recorded when decoding fails.
    pub const ZERO: Dimensions = Dimensions { width: 0, height: 0 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box in page coordinates (origin top-left, y grows down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// Placement of an image on its page.
///
/// `Unavailable` is a distinct state; a zero-area box is still `Known`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Position {
    Known(BoundingBox),
    #[default]
    Unavailable,
}

impl From<BoundingBox> for Position {
    fn from(bbox: BoundingBox) -> Self {
        Position::Known(bbox)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Position::Known(bbox) => bbox.serialize(serializer),
            Position::Unavailable => serializer.serialize_str(POSITION_UNAVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Known(BoundingBox),
            Marker(String),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            Some(Repr::Known(bbox)) => Position::Known(bbox),
            Some(Repr::Marker(_)) | None => Position::Unavailable,
        })
    }
}

/// Pretty JSON with four-space indentation and unescaped non-ASCII text.
pub(crate) fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read and parse a JSON file, separating a missing file from a malformed one.
pub(crate) fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(DocAuthError::InputNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| DocAuthError::MalformedInput {
        path: path.to_path_buf(),
        source,
    })
}
