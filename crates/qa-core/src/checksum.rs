//! Content fingerprints, used to spot edits that change nothing.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `s`.
pub fn compute_checksum(s: &str) -> String {
    format!("{:x}", Sha256::digest(s.as_bytes()))
}
