use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_fs::prelude::*;
use mirror_sync::{
    are_equal, run_pass, walk, FileOp, LogSink, MemorySink, PassReport, SyncEngine,
};
use predicates::prelude::predicate;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Trees {
    _tmp: TempDir,
    source: PathBuf,
    replica: PathBuf,
}

impl Trees {
    fn new() -> Self {
        init_logging();
        let tmp = TempDir::new().expect("tempdir");
        let source = tmp.path().join("source");
        let replica = tmp.path().join("replica");
        fs::create_dir_all(&source).expect("create source");
        Self {
            _tmp: tmp,
            source,
            replica,
        }
    }

    fn put(&self, rel: &str, content: &str) {
        let path = self.source.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write source file");
    }

    fn remove(&self, rel: &str) {
        fs::remove_file(self.source.join(rel)).expect("remove source file");
    }

    fn pass(&self) -> PassReport {
        run_pass(&self.source, &self.replica, Arc::new(LogSink))
    }

    fn replica_files(&self) -> Vec<PathBuf> {
        walk::snapshot(&self.replica).expect("walk replica").files
    }

    fn assert_converged(&self) {
        let source_files = walk::snapshot(&self.source).expect("walk source").files;
        assert_eq!(source_files, self.replica_files(), "file sets differ");
        for rel in source_files {
            assert!(
                are_equal(&self.source.join(&rel), &self.replica.join(&rel)).expect("compare"),
                "{} differs",
                rel.display()
            );
        }
    }
}

fn rels(paths: &[&str]) -> Vec<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
}

#[test]
fn three_pass_scenario() {
    let t = Trees::new();
    t.put("a.txt", "hello");
    t.put("sub/b.txt", "abc");

    let first = t.pass();
    assert!(first.is_clean(), "{first:?}");
    assert_eq!(t.replica_files(), rels(&["a.txt", "sub/b.txt"]));
    t.assert_converged();

    t.put("c.txt", "new");
    t.remove("a.txt");
    let second = t.pass();
    assert!(second.is_clean());
    assert_eq!(t.replica_files(), rels(&["c.txt", "sub/b.txt"]));
    assert!(t.replica.join("sub").is_dir(), "sub/ still has a file");
    assert_eq!(second.deleted(), 1);

    t.remove("sub/b.txt");
    let third = t.pass();
    assert!(third.is_clean());
    assert_eq!(t.replica_files(), rels(&["c.txt"]));
    assert!(!t.replica.join("sub").exists(), "sub/ is empty and must be pruned");
    assert_eq!(third.removed_dirs(), 1);
}

#[test]
fn second_pass_is_a_no_op() {
    let t = Trees::new();
    t.put("a.txt", "hello");
    t.put("deep/er/b.bin", "0123456789");
    t.put("deep/c.txt", "c");

    let first = t.pass();
    assert_eq!(first.copied(), 3);

    let second = t.pass();
    assert_eq!(second.copied(), 0, "nothing changed, nothing to copy");
    assert_eq!(second.deleted(), 0);
    assert!(second.actions.is_empty());
    assert_eq!(second.unchanged, 3);
}

#[test]
fn replica_only_files_are_removed() {
    let t = Trees::new();
    t.put("keep.txt", "keep");
    let replica = assert_fs::fixture::ChildPath::new(&t.replica);
    replica.child("old/nested").create_dir_all().expect("mkdir");
    replica.child("stray.txt").write_str("stray").expect("write");
    replica.child("old/nested/x.log").write_str("x").expect("write");

    let report = t.pass();

    assert_eq!(report.deleted(), 2);
    replica.child("stray.txt").assert(predicate::path::missing());
    replica.child("old").assert(predicate::path::missing());
    replica.child("keep.txt").assert("keep");
    t.assert_converged();
}

#[test]
fn empty_source_directories_are_not_mirrored() {
    let t = Trees::new();
    fs::create_dir_all(t.source.join("nothing/here")).expect("mkdir");
    fs::create_dir_all(t.replica.join("was/empty")).expect("mkdir");

    let report = t.pass();

    assert!(report.is_clean());
    assert!(t.replica.is_dir(), "root survives even when empty");
    assert!(!t.replica.join("nothing").exists());
    assert!(!t.replica.join("was").exists());
}

#[test]
fn one_bad_file_does_not_block_the_rest() {
    let t = Trees::new();
    for name in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"] {
        t.put(name, name);
    }
    t.put("blocked.txt", "blocked");
    // A non-empty directory where the file should go: the rename must fail.
    fs::create_dir_all(t.replica.join("blocked.txt")).expect("mkdir");
    fs::write(t.replica.join("blocked.txt/inner"), "in the way").expect("write");

    let sink = Arc::new(MemorySink::new());
    let report = SyncEngine::new(&t.source, &t.replica, sink.clone()).run_pass();

    assert!(report.completed());
    assert_eq!(report.copied(), 5);
    let copy_failures: Vec<_> = report
        .failures
        .iter()
        .filter(|f| f.op == FileOp::Copy)
        .collect();
    assert_eq!(copy_failures.len(), 1);
    assert_eq!(copy_failures[0].path, t.source.join("blocked.txt"));
    assert!(!sink.errors().is_empty());
    for name in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"] {
        assert_eq!(fs::read_to_string(t.replica.join(name)).expect("read"), name);
    }
    let leftovers: Vec<_> = fs::read_dir(&t.replica)
        .expect("read replica")
        .map(|e| e.expect("entry").file_name())
        .filter(|n| n.to_string_lossy().ends_with(mirror_sync::engine::TMP_SUFFIX))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");

    // The obstruction was an orphan and has been cleared; the next pass heals.
    let second = t.pass();
    assert!(second.is_clean(), "{second:?}");
    t.assert_converged();
}

#[cfg(unix)]
#[test]
fn symlinks_are_isolated_failures() {
    let t = Trees::new();
    t.put("real.txt", "real");
    std::os::unix::fs::symlink(t.source.join("real.txt"), t.source.join("link.txt"))
        .expect("symlink");

    let report = t.pass();

    assert!(report.completed());
    assert_eq!(report.copied(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].op, FileOp::Enumerate);
    assert_eq!(report.failures[0].path, t.source.join("link.txt"));
    assert!(!t.replica.join("link.txt").exists());
}

#[test]
fn every_change_is_logged_to_the_sink() {
    let t = Trees::new();
    t.put("sub/a.txt", "a");
    fs::create_dir_all(t.replica.join("gone")).expect("mkdir");
    fs::write(t.replica.join("gone/x"), "x").expect("write");

    let sink = Arc::new(MemorySink::new());
    let report = SyncEngine::new(&t.source, &t.replica, sink.clone()).run_pass();

    let messages = sink.messages();
    assert_eq!(messages.len(), report.actions.len());
    assert!(messages.iter().any(|m| m.starts_with("created directory:")));
    assert!(messages.iter().any(|m| m.starts_with("copied:")));
    assert!(messages.iter().any(|m| m.starts_with("deleted:")));
    assert!(messages.iter().any(|m| m.starts_with("removed empty directory:")));
    assert!(sink.errors().is_empty());
}

#[test]
fn unchanged_replica_keeps_its_mtime() {
    let t = Trees::new();
    t.put("a.txt", "stable");
    t.pass();
    let before = fs::metadata(t.replica.join("a.txt"))
        .and_then(|m| m.modified())
        .expect("mtime");

    std::thread::sleep(std::time::Duration::from_millis(20));
    t.pass();

    let after = fs::metadata(t.replica.join("a.txt"))
        .and_then(|m| m.modified())
        .expect("mtime");
    assert_eq!(before, after, "file was rewritten on a no-op pass");
}

#[test]
fn report_serializes_to_json() {
    let t = Trees::new();
    t.put("a.txt", "a");
    let report = t.pass();
    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["dry_run"], false);
    assert!(json["actions"].as_array().expect("actions").len() >= 2);
    assert!(Path::new(json["replica"].as_str().expect("replica")).ends_with("replica"));
}
