//! Command-line interface definitions.
//!
//! Defines the CLI structure for the `pulsewire` binary using `clap`:
//! streaming metrics to the terminal and diagnostic checks.

pub mod check;
pub mod output;
pub mod watch;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;

/// Stream campaign metrics from the push service
#[derive(Parser, Debug)]
#[command(name = "pulsewire")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Subscribe and print metric updates until interrupted
    Watch(WatchArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `pulsewire check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Open one WebSocket connection to the push service
    Connection(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Owner (user) whose metrics to stream
    #[arg(long)]
    pub owner: String,

    /// Campaign to include; repeat for several. Omit for account-wide metrics
    #[arg(long = "campaign")]
    pub campaigns: Vec<String>,

    /// Metric to stream; repeat for several
    #[arg(long = "metric", required = true)]
    pub metrics: Vec<String>,

    /// Explicit update interval in seconds (overrides the scope default)
    #[arg(long)]
    pub interval: Option<u32>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Load `path`, or fall back to defaults plus environment overrides when the
/// file does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::load(path);
    }

    let mut config = Config::default();
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
