//! Configuration structures for extraction and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::record::{read_json, to_json_pretty, Metadata};
use crate::error::Result;

/// File name of the rule set looked up next to a data file.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Rules a document must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Images whose hashes must all be present in the document.
    #[serde(rename = "imagenes_a_validar")]
    pub required_images: Vec<RequiredImage>,

    /// Snippets that must appear in the text of page one.
    #[serde(rename = "textos_a_validar")]
    pub required_texts: Vec<String>,
}

/// Descriptor of a required image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredImage {
    /// Lowercase hex SHA-256 of the image bytes.
    pub hash_sha256: String,

    /// Any further descriptor fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Metadata,
}

impl RequiredImage {
    pub fn new(hash_sha256: impl Into<String>) -> Self {
        Self {
            hash_sha256: hash_sha256.into(),
            extra: Metadata::new(),
        }
    }
}

impl ValidationConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, to_json_pretty(self)?)?;
        Ok(())
    }

    /// Add a required image hash.
    pub fn with_image(mut self, hash_sha256: impl Into<String>) -> Self {
        self.required_images.push(RequiredImage::new(hash_sha256));
        self
    }

    /// Add a required page-one text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.required_texts.push(text.into());
        self
    }
}

/// Where to find the rule set for a data file.
///
/// An explicit path wins; otherwise `config.json` in the data file's directory.
pub fn resolve_config_path(data_file: &Path, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    data_file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_CONFIG_FILE)
}

/// Options for a single extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory raw image bytes are written to; `None` skips the side files.
    pub image_dir: Option<PathBuf>,

    /// Run the barcode decoder on each decoded raster.
    pub decode_barcodes: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            image_dir: None,
            decode_barcodes: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write raw image bytes into `dir`.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Enable or disable barcode decoding.
    pub fn with_barcodes(mut self, enabled: bool) -> Self {
        self.decode_barcodes = enabled;
        self
    }
}
