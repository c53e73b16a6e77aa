//! Tree enumeration.
//!
//! Walks a directory tree with an explicit worklist and returns an owned,
//! sorted snapshot. Nothing is mutated while walking, so callers are free to
//! copy and delete afterwards.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Regular files and directories under `root`, relative to `root`.
#[derive(Debug, Default)]
pub struct TreeSnapshot {
    pub root: PathBuf,
    /// Regular files, sorted.
    pub files: Vec<PathBuf>,
    /// Strict descendant directories, sorted. The root itself is not listed.
    pub dirs: Vec<PathBuf>,
    /// Entries that could not be read or are not mirrored (symlinks, sockets…),
    /// keyed by relative path.
    pub failures: Vec<(PathBuf, SyncError)>,
}

impl TreeSnapshot {
    /// Snapshot of a root that does not exist yet.
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }
}

/// Enumerate every file and directory reachable from `root`.
///
/// Only a failure to read `root` itself is returned as `Err`. Subdirectories
/// that cannot be read are recorded in [`TreeSnapshot::failures`]; ones that
/// vanish mid-walk are skipped. Symbolic links are never followed.
pub fn snapshot(root: &Path) -> Result<TreeSnapshot, SyncError> {
    let mut snap = TreeSnapshot::empty(root);

    // Relative paths; `""` is the root.
    let mut pending = vec![PathBuf::new()];
    let mut cursor = 0;
    while cursor < pending.len() {
        let rel = pending[cursor].clone();
        cursor += 1;
        let current = root.join(&rel);

        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if rel.as_os_str().is_empty() => return Err(io_err(&current, err)),
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => {
                snap.failures.push((rel, io_err(&current, err)));
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    snap.failures.push((rel.clone(), io_err(&current, err)));
                    continue;
                }
            };
            let child = rel.join(entry.file_name());
            let ty = match entry.file_type() {
                Ok(ty) => ty,
                Err(err) => {
                    snap.failures.push((child, io_err(entry.path(), err)));
                    continue;
                }
            };

            if ty.is_symlink() {
                snap.failures
                    .push((child, SyncError::Symlink { path: entry.path() }));
            } else if ty.is_dir() {
                snap.dirs.push(child.clone());
                pending.push(child);
            } else if ty.is_file() {
                snap.files.push(child);
            } else {
                snap.failures
                    .push((child, SyncError::Unsupported { path: entry.path() }));
            }
        }
    }

    snap.files.sort();
    snap.dirs.sort();
    Ok(snap)
}
