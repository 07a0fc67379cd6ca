//! Canonical identifier derived from an embedded QR payload.

use tracing::{info, warn};

use crate::models::DocumentRecord;

/// Canonical code of the document's first QR payload.
///
/// The first image flagged as QR with a non-empty payload is used. Its
/// payload is read as a slash-delimited path and the last two segments are
/// joined as `segment[-2]:segment[-1]`, so
/// `https://verify.example/acme/998877` becomes `acme:998877`. A payload
/// with fewer than two segments, or a document without QR images, yields
/// `None`; neither is an error.
pub fn canonicalize(record: &DocumentRecord) -> Option<String> {
    let Some(payload) = record
        .images
        .iter()
        .filter(|image| image.is_qr)
        .find_map(|image| image.qr_data.as_deref().filter(|data| !data.is_empty()))
    else {
        warn!("No QR image found in the document");
        return None;
    };

    match canonical_code(payload) {
        Some(code) => {
            info!("QR code canonicalized: {}", code);
            Some(code)
        }
        None => {
            warn!("QR payload '{}' has fewer than two path segments", payload);
            None
        }
    }
}

/// `segment[-2]:segment[-1]` of a slash-delimited payload.
pub fn canonical_code(payload: &str) -> Option<String> {
    let segments: Vec<&str> = payload.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        [.., owner, id] => Some(format!("{}:{}", owner, id)),
        _ => None,
    }
}
