//! Content fingerprinting for the optimization cache.

use std::path::Path;

/// Compute the blake3 fingerprint of a source file.
///
/// The key covers both the relative path and the content bytes, so a file
/// moved to a new location is never served another file's cached output.
/// Content hashing (rather than mtime) means a cache hit is byte-identical
/// to a fresh run by construction.
pub fn fingerprint(relative: &Path, bytes: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(relative.to_string_lossy().as_bytes());
    hasher.update(&[0]);
    hasher.update(bytes);
    hex::encode(hasher.finalize().as_bytes())
}
