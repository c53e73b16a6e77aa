//! One synchronization pass.
//!
//! ## Phases
//!
//! 1. Ensure the replica root exists.
//! 2. Forward mirror: copy every source file whose replica counterpart is
//!    missing or differs (size or mtime).
//! 3. Orphan deletion: delete every replica file with no source counterpart.
//!    Runs only after phase 2 has finished for the whole tree.
//! 4. Prune directories left empty under the replica root.
//!
//! A failure on one file is recorded and the pass moves on. Only failures
//! that make the rest of the pass meaningless (source root missing, replica
//! root unusable) end it early; in particular, phase 3 never runs against a
//! source that could not be enumerated.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use filetime::FileTime;

use mirror_core::MirrorConfig;

use crate::equality;
use crate::error::{io_err, SyncError};
use crate::prune;
use crate::report::{FileFailure, FileOp, PassReport, SyncAction};
use crate::sink::EventSink;
use crate::walk::{self, TreeSnapshot};

/// Suffix of the temporary sibling a copy is written to before the rename.
pub const TMP_SUFFIX: &str = ".mirror.tmp";

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

/// Mirrors `source` into `replica`, one pass per [`SyncEngine::run_pass`] call.
///
/// Holds no state between passes; everything is re-read from disk.
pub struct SyncEngine {
    source: PathBuf,
    replica: PathBuf,
    sink: Arc<dyn EventSink>,
    dry_run: bool,
}

impl SyncEngine {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            sink,
            dry_run: false,
        }
    }

    pub fn from_config(config: &MirrorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self::new(config.source.clone(), config.replica.clone(), sink)
    }

    /// In dry-run mode nothing is written; the report lists what a real pass
    /// would create, copy and delete. Directory pruning is not previewed.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn replica(&self) -> &Path {
        &self.replica
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Run one full pass. Never fails: every error ends up in the report and
    /// the sink.
    pub fn run_pass(&self) -> PassReport {
        let started_at = Local::now();
        let clock = Instant::now();
        let mut pass = PassState::default();

        let failure = match self.try_pass(&mut pass) {
            Ok(()) => None,
            Err(err) => {
                self.sink.error(format!("sync pass aborted: {err}"));
                Some(err.to_string())
            }
        };

        PassReport {
            source: self.source.clone(),
            replica: self.replica.clone(),
            dry_run: self.dry_run,
            started_at,
            duration_ms: clock.elapsed().as_millis(),
            actions: pass.actions,
            unchanged: pass.unchanged,
            failures: pass.failures,
            failure,
        }
    }

    fn try_pass(&self, pass: &mut PassState) -> Result<(), SyncError> {
        let replica_exists = self.ensure_replica_root(pass)?;
        let source = self.snapshot_source()?;
        self.mirror_forward(&source, pass);

        let replica = if replica_exists || !self.dry_run {
            walk::snapshot(&self.replica)?
        } else {
            TreeSnapshot::empty(&self.replica)
        };
        self.delete_orphans(&replica, pass);

        if !self.dry_run {
            let outcome = prune::prune_empty_dirs(&self.replica, self.sink.as_ref())?;
            pass.actions.extend(
                outcome
                    .removed
                    .into_iter()
                    .map(|path| SyncAction::RemovedDir { path }),
            );
            pass.failures.extend(outcome.failures);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 1
    // -----------------------------------------------------------------------

    /// Returns whether the replica root existed before this pass.
    fn ensure_replica_root(&self, pass: &mut PassState) -> Result<bool, SyncError> {
        match fs::metadata(&self.replica) {
            Ok(meta) if meta.is_dir() => Ok(true),
            Ok(_) => Err(SyncError::NotADirectory {
                path: self.replica.clone(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if self.dry_run {
                    self.sink.info(format!(
                        "[dry-run] would create directory: {}",
                        self.replica.display()
                    ));
                } else {
                    fs::create_dir_all(&self.replica).map_err(|e| io_err(&self.replica, e))?;
                    self.sink
                        .info(format!("created directory: {}", self.replica.display()));
                }
                pass.planned_dirs.insert(self.replica.clone());
                pass.actions.push(SyncAction::CreatedDir {
                    path: self.replica.clone(),
                });
                Ok(false)
            }
            Err(err) => Err(io_err(&self.replica, err)),
        }
    }

    fn snapshot_source(&self) -> Result<TreeSnapshot, SyncError> {
        match fs::metadata(&self.source) {
            Ok(meta) if meta.is_dir() => walk::snapshot(&self.source),
            Ok(_) => Err(SyncError::NotADirectory {
                path: self.source.clone(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(SyncError::SourceMissing {
                path: self.source.clone(),
            }),
            Err(err) => Err(io_err(&self.source, err)),
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2
    // -----------------------------------------------------------------------

    fn mirror_forward(&self, source: &TreeSnapshot, pass: &mut PassState) {
        for (rel, err) in &source.failures {
            pass.fail(
                self.sink.as_ref(),
                self.source.join(rel),
                FileOp::Enumerate,
                err,
            );
        }

        for rel in &source.files {
            let from = self.source.join(rel);
            let to = self.replica.join(rel);

            if let Err(err) = self.ensure_parent_dirs(rel, pass) {
                pass.fail(self.sink.as_ref(), to, FileOp::CreateDir, &err);
                continue;
            }

            match needs_copy(&from, &to) {
                Ok(false) => pass.unchanged += 1,
                Ok(true) if self.dry_run => {
                    self.sink.info(format!(
                        "[dry-run] would copy: {} -> {}",
                        from.display(),
                        to.display()
                    ));
                    pass.actions.push(SyncAction::Copied { from, to });
                }
                Ok(true) => match copy_file(&from, &to) {
                    Ok(()) => {
                        self.sink
                            .info(format!("copied: {} -> {}", from.display(), to.display()));
                        pass.actions.push(SyncAction::Copied { from, to });
                    }
                    Err(err) => pass.fail(self.sink.as_ref(), from, FileOp::Copy, &err),
                },
                Err(err) => pass.fail(self.sink.as_ref(), from, FileOp::Compare, &err),
            }
        }
    }

    /// Create each missing ancestor of `replica/rel`, one level at a time so
    /// that every creation is logged.
    fn ensure_parent_dirs(&self, rel: &Path, pass: &mut PassState) -> Result<(), SyncError> {
        let Some(parent) = rel.parent() else {
            return Ok(());
        };

        let mut current = self.replica.clone();
        for component in parent.components() {
            current.push(component);
            if pass.planned_dirs.contains(&current) {
                continue;
            }
            // A replica-side link is left in place and never written through.
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(SyncError::Symlink { path: current })
                }
                Ok(meta) if meta.is_dir() => continue,
                Ok(_) => return Err(SyncError::NotADirectory { path: current }),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(io_err(&current, err)),
            }

            if self.dry_run {
                self.sink.info(format!(
                    "[dry-run] would create directory: {}",
                    current.display()
                ));
            } else {
                match fs::create_dir(&current) {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::AlreadyExists && current.is_dir() => {
                        continue
                    }
                    Err(err) => return Err(io_err(&current, err)),
                }
                self.sink
                    .info(format!("created directory: {}", current.display()));
            }
            pass.planned_dirs.insert(current.clone());
            pass.actions.push(SyncAction::CreatedDir {
                path: current.clone(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 3
    // -----------------------------------------------------------------------

    fn delete_orphans(&self, replica: &TreeSnapshot, pass: &mut PassState) {
        for (rel, err) in &replica.failures {
            pass.fail(
                self.sink.as_ref(),
                self.replica.join(rel),
                FileOp::Enumerate,
                err,
            );
        }

        for rel in &replica.files {
            let target = self.replica.join(rel);
            match source_has_file(&self.source, rel) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    let err = io_err(self.source.join(rel), err);
                    pass.fail(self.sink.as_ref(), target, FileOp::Compare, &err);
                    continue;
                }
            }

            if self.dry_run {
                self.sink
                    .info(format!("[dry-run] would delete: {}", target.display()));
                pass.actions.push(SyncAction::Deleted { path: target });
                continue;
            }

            match fs::remove_file(&target) {
                Ok(()) => {
                    self.sink.info(format!("deleted: {}", target.display()));
                    pass.actions.push(SyncAction::Deleted { path: target });
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    let err = io_err(&target, err);
                    pass.fail(self.sink.as_ref(), target, FileOp::Delete, &err);
                }
            }
        }
    }
}

/// Run a single pass from `source` into `replica`.
pub fn run_pass(source: &Path, replica: &Path, sink: Arc<dyn EventSink>) -> PassReport {
    SyncEngine::new(source, replica, sink).run_pass()
}

// ---------------------------------------------------------------------------
// Pass state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PassState {
    actions: Vec<SyncAction>,
    unchanged: usize,
    failures: Vec<FileFailure>,
    /// Directories created (or, in dry-run, planned) during this pass.
    planned_dirs: HashSet<PathBuf>,
}

impl PassState {
    fn fail(&mut self, sink: &dyn EventSink, path: PathBuf, op: FileOp, err: &SyncError) {
        sink.error(format!("{} failed: {err}", op_label(op)));
        self.failures.push(FileFailure {
            path,
            op,
            reason: err.to_string(),
        });
    }
}

fn op_label(op: FileOp) -> &'static str {
    match op {
        FileOp::Enumerate => "enumerate",
        FileOp::Compare => "compare",
        FileOp::CreateDir => "create directory",
        FileOp::Copy => "copy",
        FileOp::Delete => "delete",
        FileOp::Prune => "prune",
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn needs_copy(from: &Path, to: &Path) -> Result<bool, SyncError> {
    match fs::symlink_metadata(to) {
        Ok(meta) if meta.file_type().is_symlink() => Err(SyncError::Symlink {
            path: to.to_path_buf(),
        }),
        Ok(_) => equality::are_equal(from, to)
            .map(|equal| !equal)
            .map_err(|e| io_err(to, e)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(true),
        Err(err) => Err(io_err(to, err)),
    }
}

/// Copy `from` over `to` via a temporary sibling, carrying the source mtime.
///
/// The mtime is read before the copy: if the source changes mid-copy, the
/// replica ends up with an older mtime than the source and is copied again
/// on the next pass.
fn copy_file(from: &Path, to: &Path) -> Result<(), SyncError> {
    let tmp = tmp_path(to);
    if let Err(err) = copy_via_tmp(from, to, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

fn copy_via_tmp(from: &Path, to: &Path, tmp: &Path) -> Result<(), SyncError> {
    let meta = fs::metadata(from).map_err(|e| io_err(from, e))?;
    fs::copy(from, tmp).map_err(|e| io_err(from, e))?;
    filetime::set_file_mtime(tmp, FileTime::from_last_modification_time(&meta))
        .map_err(|e| io_err(tmp, e))?;
    fs::rename(tmp, to).map_err(|e| io_err(to, e))
}

/// `.<name>.<pid>.mirror.tmp` next to `to`. The hidden prefix and pid keep it
/// clear of a source file named `<name>.mirror.tmp`.
fn tmp_path(to: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(to.file_name().unwrap_or_default());
    name.push(format!(".{}{TMP_SUFFIX}", std::process::id()));
    to.with_file_name(name)
}

/// Whether `source_root/rel` is something the replica file should be kept
/// for: a regular file, or a symlink (never followed, never deleted against).
///
/// A missing entry, or any ancestor that is missing or not a directory,
/// means no.
fn source_has_file(source_root: &Path, rel: &Path) -> std::io::Result<bool> {
    let mut current = source_root.to_path_buf();
    let mut components = rel.components().peekable();
    while let Some(component) = components.next() {
        if let Component::Normal(name) = component {
            current.push(name);
        }
        let meta = match fs::symlink_metadata(&current) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if components.peek().is_none() {
            return Ok(meta.is_file() || meta.file_type().is_symlink());
        }
        if !meta.is_dir() {
            return Ok(false);
        }
    }
    Ok(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
