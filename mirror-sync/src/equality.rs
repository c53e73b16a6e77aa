//! Size + modification-time equality check.
//!
//! No file contents are read. Two files with the same length and mtime are
//! considered identical even if their bytes differ.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// `true` iff `a` and `b` have the same byte length and last-modification time.
///
/// Both paths are followed if they are symlinks. A file that vanished or
/// cannot be stat'ed surfaces as the underlying `io::Error`.
pub fn are_equal(a: &Path, b: &Path) -> io::Result<bool> {
    let meta_a = std::fs::metadata(a)?;
    let meta_b = std::fs::metadata(b)?;
    metadata_equal(&meta_a, &meta_b)
}

/// Pure comparison over already-read metadata.
pub fn metadata_equal(a: &Metadata, b: &Metadata) -> io::Result<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    Ok(a.modified()? == b.modified()?)
}
