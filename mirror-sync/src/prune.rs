//! Empty-directory pruning.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};
use crate::report::{FileFailure, FileOp};
use crate::sink::EventSink;
use crate::walk;

/// Directories removed by [`prune_empty_dirs`], plus any that could not be read.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    /// Absolute paths, in removal order (deepest first).
    pub removed: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// Remove every empty strict descendant directory of `root`.
///
/// Directories are visited deepest first, so a parent whose only contents
/// were empty subdirectories is itself removed in the same call. `root` is
/// never removed.
///
/// Emptiness is decided by `remove_dir` itself: a directory that gained an
/// entry (or disappeared) since the walk is skipped, not reported.
pub fn prune_empty_dirs(root: &Path, sink: &dyn EventSink) -> Result<PruneOutcome, SyncError> {
    let snap = walk::snapshot(root)?;
    let mut outcome = PruneOutcome::default();

    for (rel, err) in snap.failures {
        // Symlinks and special files were already reported by the caller's walk.
        if let SyncError::Io { .. } = err {
            sink.error(format!("cannot read {}: {err}", root.join(&rel).display()));
            outcome.failures.push(FileFailure {
                path: root.join(rel),
                op: FileOp::Prune,
                reason: err.to_string(),
            });
        }
    }

    let mut dirs = snap.dirs;
    dirs.sort_by(|a, b| {
        let (da, db) = (a.components().count(), b.components().count());
        db.cmp(&da).then_with(|| a.cmp(b))
    });

    for rel in dirs {
        let dir = root.join(&rel);
        match fs::remove_dir(&dir) {
            Ok(()) => {
                sink.info(format!("removed empty directory: {}", dir.display()));
                outcome.removed.push(dir);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => match has_entries(&dir) {
                Ok(true) => {}
                Ok(false) | Err(_) => {
                    let err = io_err(&dir, err);
                    sink.error(format!("failed to remove directory: {err}"));
                    outcome.failures.push(FileFailure {
                        path: dir,
                        op: FileOp::Prune,
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(outcome)
}

fn has_entries(dir: &Path) -> std::io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use tempfile::TempDir;

    #[test]
    fn removes_nested_empty_chain_in_one_call() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        let sink = MemorySink::new();

        let outcome = prune_empty_dirs(root, &sink).unwrap();

        assert_eq!(
            outcome.removed,
            vec![root.join("a/b/c"), root.join("a/b"), root.join("a")]
        );
        assert!(!root.join("a").exists());
        assert!(root.exists(), "root must never be removed");
        assert_eq!(sink.messages().len(), 3);
    }

    #[test]
    fn keeps_directories_with_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("keep/empty")).unwrap();
        fs::write(root.join("keep/file.txt"), "x").unwrap();
        let sink = MemorySink::new();

        let outcome = prune_empty_dirs(root, &sink).unwrap();

        assert_eq!(outcome.removed, vec![root.join("keep/empty")]);
        assert!(root.join("keep/file.txt").exists());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn empty_root_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let outcome = prune_empty_dirs(tmp.path(), &sink).unwrap();
        assert!(outcome.removed.is_empty());
        assert!(tmp.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn empty_dir_that_cannot_be_removed_is_a_failure() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let parent = root.join("sealed");
        fs::create_dir_all(parent.join("empty")).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();
        if fs::File::create(parent.join("writable")).is_ok() {
            // Permission bits do not apply to root.
            fs::remove_file(parent.join("writable")).unwrap();
            fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }
        let sink = MemorySink::new();

        let outcome = prune_empty_dirs(root, &sink).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, parent.join("empty"));
        assert_eq!(outcome.failures[0].op, FileOp::Prune);
        assert!(parent.join("empty").is_dir());
        assert_eq!(sink.errors().len(), 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let sink = MemorySink::new();
        assert!(prune_empty_dirs(&tmp.path().join("gone"), &sink).is_err());
    }
}
