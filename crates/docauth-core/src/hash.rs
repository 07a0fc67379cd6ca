//! Content hashing for extracted images.

use sha2::{Digest, Sha256};

/// Length of the short hash prefix used in side-file names.
pub const SHORT_HASH_LEN: usize = 8;

/// Lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
