//! Mirror: periodic one-way directory synchronization.
//!
//! # Usage
//!
//! ```text
//! mirror init --source <dir> --replica <dir> --interval-ms <ms> [--log-file <path>]
//! mirror run [--source <dir>] [--replica <dir>] [--interval-ms <ms>] [--log-file <path>]
//! mirror sync [--source <dir>] [--replica <dir>] [--dry-run] [--json]
//! mirror config show
//! ```
//!
//! Every command accepts `--config <path>` (default `~/.mirror/config.yaml`).
//! Values given on the command line win over the config file.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, init::InitArgs, run::RunArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mirror",
    version,
    about = "Keep a replica directory in sync with a source directory",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate settings and save them to the config file.
    Init(InitArgs),

    /// Sync on a fixed interval until interrupted with ctrl-c.
    Run(RunArgs),

    /// Run a single sync pass now and print what it did.
    Sync(SyncArgs),

    /// Inspect the config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
