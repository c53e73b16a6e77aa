pub mod config;
pub mod init;
pub mod run;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mirror_core::{config as config_file, ConfigOverrides, MirrorConfig};

/// `explicit` if given, else `~/.mirror/config.yaml`.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config_file::default_config_path().context("could not locate config file"),
    }
}

/// Options shared by every command that needs a resolved configuration.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Config file to read (default: ~/.mirror/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory tree to mirror from.
    #[arg(long, short = 's', value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Directory tree to mirror into. Created if missing.
    #[arg(long, short = 'r', value_name = "DIR")]
    pub replica: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn config_path(&self) -> Result<PathBuf> {
        config_path(self.config.clone())
    }

    /// Merge `overrides` over the config file (if any) and validate.
    pub fn resolve(&self, overrides: ConfigOverrides) -> Result<MirrorConfig> {
        let path = self.config_path()?;
        let base = config_file::load_optional_at(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = overrides.apply(base).with_context(|| {
            format!(
                "pass it as a flag or run `mirror init` (config file: {})",
                path.display()
            )
        })?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Source and replica only, for a one-off pass that needs no interval.
    pub fn resolve_trees(&self) -> Result<(PathBuf, PathBuf)> {
        let path = self.config_path()?;
        let base = config_file::load_optional_at(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let (base_source, base_replica) = match base {
            Some(cfg) => (Some(cfg.source), Some(cfg.replica)),
            None => (None, None),
        };
        let source = self
            .source
            .clone()
            .or(base_source)
            .context("missing --source (or run `mirror init`)")?;
        let replica = self
            .replica
            .clone()
            .or(base_replica)
            .context("missing --replica (or run `mirror init`)")?;

        MirrorConfig::new(source.clone(), replica.clone(), 1)
            .validate()
            .context("invalid configuration")?;
        Ok((source, replica))
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source: self.source.clone(),
            replica: self.replica.clone(),
            ..Default::default()
        }
    }
}
