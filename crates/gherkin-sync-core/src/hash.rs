//! Content addressing for features and scenarios.
//!
//! A hash is a SHA-1 digest over the file path and the normalized content,
//! rendered as 40 lowercase hex characters. The path is part of the input:
//! moving a file with unchanged content yields new hashes, and the old and
//! new identities are reconnected by the scenario matcher instead.

use sha1::{Digest, Sha1};

/// Separates the path from the content. Paths never contain NUL, so the
/// split point is unambiguous.
const SEPARATOR: &[u8] = b"\0";

/// Hash `content` as found at `path`.
pub fn content_hash(content: &str, path: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(path.as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
