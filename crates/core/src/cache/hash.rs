//! Content digests.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of normalized content.
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
