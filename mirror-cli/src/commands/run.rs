//! `mirror run`: scheduled sync in the foreground.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mirror_daemon::start_blocking;

use super::ConfigArgs;

/// Sync on a fixed interval until interrupted.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    /// Milliseconds between passes.
    #[arg(long, short = 'i', value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Append log lines to this file in addition to the console.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut overrides = self.common.overrides();
        overrides.interval_ms = self.interval_ms;
        overrides.log_file = self.log_file;
        let config = self.common.resolve(overrides)?;

        println!("Sync service started. Press ctrl-c to exit...");
        let stats = start_blocking(config).context("sync service exited with error")?;
        println!(
            "Sync service stopped after {} passes ({} failed).",
            stats.passes, stats.failed_passes
        );
        Ok(())
    }
}
