//! SHA-256 hex digest of committed asset payloads.
//!
//! The digest is logged next to each commit so an operator can spot
//! identical images coming back for different prompts.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of an asset payload, logged as the `sha256`
/// field when a token is saved.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}
