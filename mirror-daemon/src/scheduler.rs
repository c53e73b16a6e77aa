//! Fixed-period pass scheduling.
//!
//! One loop owns the timer and awaits each pass before looking at the timer
//! again, so two passes can never run at once. Ticks that fall due while a
//! pass is running are coalesced into a single tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use mirror_core::ConfigError;
use mirror_sync::{EventSink, PassReport, SyncEngine};

use crate::error::DaemonError;

/// Something that can run one sync pass. Implemented by [`SyncEngine`].
pub trait PassRunner: Send + Sync + 'static {
    fn run_pass(&self) -> PassReport;
}

impl PassRunner for SyncEngine {
    fn run_pass(&self) -> PassReport {
        SyncEngine::run_pass(self)
    }
}

/// Counters returned when the scheduler stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks that ran a pass (including aborted or panicked ones).
    pub passes: u64,
    /// Passes that ended early or panicked.
    pub failed_passes: u64,
    pub last_completed_at: Option<DateTime<Local>>,
}

pub struct Scheduler<P: PassRunner> {
    pass: Arc<P>,
    period: Duration,
    sink: Arc<dyn EventSink>,
}

impl<P: PassRunner> Scheduler<P> {
    /// Fails if `period` is zero.
    pub fn new(
        pass: Arc<P>,
        period: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, DaemonError> {
        if period.is_zero() {
            return Err(ConfigError::ZeroInterval.into());
        }
        Ok(Self { pass, period, sink })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick until `shutdown_rx` fires (or its sender is dropped).
    ///
    /// The first pass runs one period after the call. Shutdown is only
    /// observed between passes; a pass in flight always finishes.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> SchedulerStats {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats = SchedulerStats::default();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = interval.tick() => self.tick(&mut stats).await,
            }
        }

        stats
    }

    async fn tick(&self, stats: &mut SchedulerStats) {
        let pass = self.pass.clone();
        let outcome = tokio::task::spawn_blocking(move || pass.run_pass()).await;
        let finished_at = Local::now();
        stats.passes += 1;
        stats.last_completed_at = Some(finished_at);

        match outcome {
            Ok(report) => {
                if !report.completed() {
                    stats.failed_passes += 1;
                }
                tracing::debug!(
                    copied = report.copied(),
                    deleted = report.deleted(),
                    unchanged = report.unchanged,
                    failures = report.failures.len(),
                    duration_ms = report.duration_ms as u64,
                    "pass report",
                );
                self.sink.info(format!(
                    "sync completed at {} ({})",
                    finished_at.format("%H:%M:%S%.3f"),
                    report.summary()
                ));
            }
            Err(err) => {
                stats.failed_passes += 1;
                self.sink.error(format!("sync pass panicked: {err}"));
                self.sink.info(format!(
                    "sync completed at {} (aborted)",
                    finished_at.format("%H:%M:%S%.3f")
                ));
            }
        }
    }
}
