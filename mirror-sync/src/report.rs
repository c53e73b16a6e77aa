//! Per-pass report.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Something a pass changed (or, in dry-run, would change) in the replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    CreatedDir { path: PathBuf },
    Copied { from: PathBuf, to: PathBuf },
    Deleted { path: PathBuf },
    RemovedDir { path: PathBuf },
}

/// The step that failed for a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOp {
    Enumerate,
    Compare,
    CreateDir,
    Copy,
    Delete,
    Prune,
}

/// A failure isolated to one file or directory. The pass carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub op: FileOp,
    pub reason: String,
}

/// Everything one pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub dry_run: bool,
    pub started_at: DateTime<Local>,
    pub duration_ms: u128,
    pub actions: Vec<SyncAction>,
    /// Files skipped because the replica copy already matched.
    pub unchanged: usize,
    pub failures: Vec<FileFailure>,
    /// Set when the pass ended early (e.g. the source root is missing).
    pub failure: Option<String>,
}

impl PassReport {
    pub fn copied(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Copied { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Deleted { .. }))
    }

    pub fn created_dirs(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::CreatedDir { .. }))
    }

    pub fn removed_dirs(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::RemovedDir { .. }))
    }

    /// `true` if the pass ran to the end, even with per-file failures.
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }

    /// `true` if the pass ran to the end without a single failure.
    pub fn is_clean(&self) -> bool {
        self.completed() && self.failures.is_empty()
    }

    /// One-line summary used by the scheduler and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{} copied, {} deleted, {} unchanged, {} dirs created, {} dirs removed, {} errors",
            self.copied(),
            self.deleted(),
            self.unchanged,
            self.created_dirs(),
            self.removed_dirs(),
            self.failures.len() + usize::from(self.failure.is_some()),
        )
    }

    fn count(&self, pred: impl Fn(&SyncAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(actions: Vec<SyncAction>) -> PassReport {
        PassReport {
            source: PathBuf::from("/src"),
            replica: PathBuf::from("/dst"),
            dry_run: false,
            started_at: Local::now(),
            duration_ms: 3,
            actions,
            unchanged: 2,
            failures: vec![],
            failure: None,
        }
    }

    #[test]
    fn counts_by_kind() {
        let r = report(vec![
            SyncAction::CreatedDir { path: "/dst/sub".into() },
            SyncAction::Copied { from: "/src/a".into(), to: "/dst/a".into() },
            SyncAction::Copied { from: "/src/b".into(), to: "/dst/b".into() },
            SyncAction::Deleted { path: "/dst/c".into() },
        ]);
        assert_eq!(r.copied(), 2);
        assert_eq!(r.deleted(), 1);
        assert_eq!(r.created_dirs(), 1);
        assert_eq!(r.removed_dirs(), 0);
        assert!(r.is_clean());
        assert_eq!(
            r.summary(),
            "2 copied, 1 deleted, 2 unchanged, 1 dirs created, 0 dirs removed, 0 errors"
        );
    }

    #[test]
    fn serializes_actions_with_tag() {
        let r = report(vec![SyncAction::Deleted { path: "/dst/c".into() }]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["actions"][0]["action"], "deleted");
        assert_eq!(json["actions"][0]["path"], "/dst/c");
        assert_eq!(json["failure"], serde_json::Value::Null);
    }
}
