// lectern/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use lectern_common::config::Config;
use lectern_common::error::Result;

// Module declarations
pub mod check;
pub mod list;
pub mod sources;
pub mod upgrade;

use crate::cli::check::CheckArgs;
use crate::cli::list::ListArgs;
use crate::cli::sources::SourcesArgs;
use crate::cli::upgrade::UpgradeArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "lectern", bin_name = "lectern")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check configured sources for patch and plugin updates
    Check(CheckArgs),
    /// Check for updates and install a confirmed selection
    Upgrade(UpgradeArgs),
    /// List installed patches and plugins
    List(ListArgs),
    /// Show the configured sources
    Sources(SourcesArgs),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Check(command) => command.run(config).await,
            Self::Upgrade(command) => command.run(config).await,
            Self::List(command) => command.run(config).await,
            Self::Sources(command) => command.run(config).await,
        }
    }
}
