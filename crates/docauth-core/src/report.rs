//! Validation report: the terminal artifact of a validation run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::record::{read_json, to_json_pretty};
use crate::models::{DocumentRecord, ValidationConfig};
use crate::qr::canonicalize;
use crate::validate::{validate, ValidationOutcome};

/// Persisted verdict for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(rename = "es_valido")]
    pub is_valid: bool,

    #[serde(rename = "codigo_qr_limpio")]
    pub cleaned_qr_code: Option<String>,

    #[serde(rename = "errores")]
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Combine a validation outcome with the canonical QR code.
    pub fn assemble(outcome: ValidationOutcome, cleaned_qr_code: Option<String>) -> Self {
        let is_valid = outcome.is_valid();
        Self {
            is_valid,
            cleaned_qr_code,
            errors: if is_valid { Vec::new() } else { outcome.errors },
        }
    }

    /// Process exit code for this verdict: 0 when valid, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_valid { 0 } else { 1 }
    }

    /// Serialize as pretty JSON, non-ASCII text unescaped.
    pub fn to_json_pretty(&self) -> Result<String> {
        to_json_pretty(self)
    }

    /// Write `report_<data file name>` into `dir` and return its path.
    pub fn write_to(&self, dir: &Path, data_file: &Path) -> Result<PathBuf> {
        let path = dir.join(report_file_name(data_file));
        std::fs::write(&path, self.to_json_pretty()?)?;
        Ok(path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Validate a record and assemble its report.
pub fn authenticate(record: &DocumentRecord, config: &ValidationConfig) -> ValidationReport {
    ValidationReport::assemble(validate(record, config), canonicalize(record))
}

/// `report_<basename>` for a data file path.
pub fn report_file_name(data_file: &Path) -> String {
    let base = data_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("report_{}", base)
}
