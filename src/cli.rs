//! Command-line interface.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandContext};

/// CLI to manage GCP Cloud SQL operations
#[derive(Debug, Parser)]
#[command(
    name = "sledge",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (default is $HOME/.sledge.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: debug, info, warn or error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: text or json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log what would be sent without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new Cloud SQL instance
    Create(commands::create::CreateArgs),

    /// Delete a Cloud SQL instance
    Delete(commands::delete::DeleteArgs),

    /// Describe a Cloud SQL instance
    Describe(commands::describe::DescribeArgs),

    /// Upgrade a Cloud SQL instance version or tier
    Upgrade(commands::upgrade::UpgradeArgs),

    /// Create an on-demand backup for a Cloud SQL instance
    Backup(commands::backup::BackupArgs),

    /// Restore a backup run into a Cloud SQL instance
    Restore(commands::restore::RestoreArgs),

    /// Migrate a Cloud SQL instance to another region via backup and restore
    Migrate(commands::migrate::MigrateArgs),
}

impl Cli {
    /// Dispatch the parsed subcommand.
    pub async fn run(self, ctx: &CommandContext<'_>) -> Result<()> {
        match self.command {
            Command::Create(args) => commands::create::run(ctx, args).await,
            Command::Delete(args) => commands::delete::run(ctx, args).await,
            Command::Describe(args) => commands::describe::run(ctx, args).await,
            Command::Upgrade(args) => commands::upgrade::run(ctx, args).await,
            Command::Backup(args) => commands::backup::run(ctx, args).await,
            Command::Restore(args) => commands::restore::run(ctx, args).await,
            Command::Migrate(args) => commands::migrate::run(ctx, args).await,
        }
    }
}
