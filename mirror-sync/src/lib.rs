//! # mirror-sync
//!
//! One-way directory mirroring: one pass copies new and changed files from a
//! source tree into a replica, deletes replica files the source no longer
//! has, and removes replica directories left empty.
//!
//! Call [`run_pass`] (or [`SyncEngine::run_pass`]) for a single pass. Every
//! event is reported through an injected [`EventSink`] and summarised in the
//! returned [`PassReport`].

pub mod engine;
pub mod equality;
pub mod error;
pub mod prune;
pub mod report;
pub mod sink;
pub mod walk;

pub use engine::{run_pass, SyncEngine};
pub use equality::are_equal;
pub use error::SyncError;
pub use prune::{prune_empty_dirs, PruneOutcome};
pub use report::{FileFailure, FileOp, PassReport, SyncAction};
pub use sink::{EventSink, LogSink, MemorySink, Severity, SyncEvent};
