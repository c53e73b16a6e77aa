//! `mirror sync`: one pass, right now.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use mirror_daemon::init_tracing;
use mirror_sync::{
    EventSink, LogSink, MemorySink, PassReport, SyncAction, SyncEngine, SyncEvent,
};

use super::ConfigArgs;

/// Arguments for `mirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    /// Show what would change without touching the replica.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the pass report as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let (source, replica) = self.common.resolve_trees()?;

        // JSON output must stay machine-readable, so events are collected
        // and emitted with the report instead of logged to the console.
        let memory = Arc::new(MemorySink::new());
        let sink: Arc<dyn EventSink> = if self.json {
            memory.clone()
        } else {
            init_tracing(None).context("failed to initialise logging")?;
            Arc::new(LogSink)
        };

        let report = SyncEngine::new(source, replica, sink)
            .with_dry_run(self.dry_run)
            .run_pass();

        if self.json {
            let output = JsonOutput {
                report: &report,
                events: memory.events(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("failed to render report JSON")?
            );
        } else {
            print_report(&report);
        }

        if let Some(failure) = &report.failure {
            anyhow::bail!("sync pass aborted: {failure}");
        }
        Ok(())
    }
}

/// `--json` output: the report's fields plus every event the pass emitted.
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    report: &'a PassReport,
    events: Vec<SyncEvent>,
}

fn print_report(report: &PassReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let mark = if report.is_clean() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };

    println!(
        "{prefix}{mark} '{}' -> '{}' ({} ms)",
        report.source.display(),
        report.replica.display(),
        report.duration_ms
    );
    println!("  {}", report.summary());

    for action in &report.actions {
        match action {
            SyncAction::CreatedDir { path } => println!("  +  {}/", path.display()),
            SyncAction::Copied { to, .. } => println!("  ✎  {}", to.display()),
            SyncAction::Deleted { path } => println!("  -  {}", path.display()),
            SyncAction::RemovedDir { path } => println!("  -  {}/", path.display()),
        }
    }
    for failure in &report.failures {
        println!("  {}  {}: {}", "!".red(), failure.path.display(), failure.reason);
    }
}
