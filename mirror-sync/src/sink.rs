//! Event sink: where a pass reports what it did.
//!
//! The engine and scheduler receive an `Arc<dyn EventSink>` at construction
//! instead of logging through a global. [`LogSink`] forwards to the `log`
//! facade for production; [`MemorySink`] keeps events for assertions.

use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// One timestamped message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncEvent {
    pub severity: Severity,
    pub at: DateTime<Local>,
    pub message: String,
}

impl SyncEvent {
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            at: Local::now(),
            message: message.into(),
        }
    }
}

/// Receiver for sync events. Must tolerate calls from any thread.
pub trait EventSink: Send + Sync {
    fn record(&self, event: SyncEvent);

    fn info(&self, message: String) {
        self.record(SyncEvent::now(Severity::Info, message));
    }

    fn error(&self, message: String) {
        self.record(SyncEvent::now(Severity::Error, message));
    }
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Forwards every event to the `log` facade under target `mirror`.
///
/// Timestamps come from whichever logger is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: SyncEvent) {
        match event.severity {
            Severity::Info => tracing::info!(target: "mirror", "{}", event.message),
            Severity::Error => tracing::error!(target: "mirror", "{}", event.message),
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SyncEvent>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: SyncEvent) {
        self.lock().push(event);
    }
}
