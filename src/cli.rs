use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "repo-mirror",
    about = "Mirror a working directory into a git repository and publish it",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Directory to mirror from (default: current directory)
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Git working copy to mirror into
    #[arg(long, global = true)]
    pub destination: Option<PathBuf>,

    /// Commit message for the publish commit
    #[arg(short, long, global = true)]
    pub message: Option<String>,

    /// Config file (default: ./repo-mirror.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Copy files sequentially (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

impl GlobalOpts {
    /// Path and message overrides for config resolution.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            source: self.source.clone(),
            destination: self.destination.clone(),
            message: self.message.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mirror the source into the destination, then commit, rebase and push
    Sync,
    /// Mirror the source into the destination without touching git
    Mirror,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Mirror => "mirror",
            Self::Version => "version",
        }
    }
}
