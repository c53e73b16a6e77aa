//! `mirror init --source <dir> --replica <dir> --interval-ms <ms> [--log-file <path>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mirror_core::{config as config_file, MirrorConfig};

use super::config_path;

/// Validate settings and save them to the config file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory tree to mirror from. Must exist.
    #[arg(long, short = 's', value_name = "DIR")]
    pub source: PathBuf,

    /// Directory tree to mirror into. Created on the first pass if missing.
    #[arg(long, short = 'r', value_name = "DIR")]
    pub replica: PathBuf,

    /// Milliseconds between passes.
    #[arg(long, short = 'i', value_name = "MS")]
    pub interval_ms: u64,

    /// Append log lines to this file in addition to the console.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Where to write the config (default: ~/.mirror/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let source = self
            .source
            .canonicalize()
            .with_context(|| format!("cannot resolve source '{}'", self.source.display()))?;
        let replica = absolute(&self.replica)?;

        let mut config = MirrorConfig::new(source, replica, self.interval_ms);
        if let Some(log_file) = &self.log_file {
            config = config.with_log_file(absolute(log_file)?);
        }
        config.validate().context("invalid configuration")?;

        let path = config_path(self.config)?;
        config_file::save_at(&path, &config)
            .with_context(|| format!("failed to save config to {}", path.display()))?;

        println!(
            "✓ Mirroring '{}' into '{}' every {} ms",
            config.source.display(),
            config.replica.display(),
            config.interval_ms
        );
        println!("  Saved to: {}", path.display());
        Ok(())
    }
}

fn absolute(path: &std::path::Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("could not determine current directory")?
        .join(path))
}
