//! `mirror config`: inspect the config file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use mirror_core::config as config_file;

use super::config_path;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file as YAML.
    Show {
        /// Config file to read (default: ~/.mirror/config.yaml).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Print the config file location.
    Path {
        /// Config file to read (default: ~/.mirror/config.yaml).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show { config } => {
            let path = config_path(config)?;
            let loaded = config_file::load_at(&path).with_context(|| {
                format!("no usable config at {}; run `mirror init`", path.display())
            })?;
            print!(
                "{}",
                serde_yaml::to_string(&loaded).context("failed to render config YAML")?
            );
        }
        ConfigCommand::Path { config } => {
            println!("{}", config_path(config)?.display());
        }
    }
    Ok(())
}
