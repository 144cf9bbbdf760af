use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{require, CommandContext};

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// GCP project ID (defaults to project_id from the config file)
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the Cloud SQL instance to delete
    #[arg(long)]
    pub instance: String,

    /// Wait for the operation to finish
    #[arg(long)]
    pub wait: bool,
}

pub async fn run(ctx: &CommandContext<'_>, args: DeleteArgs) -> Result<()> {
    let project = ctx.project(args.project, "project")?;
    require(&args.instance, "instance")?;

    if ctx.dry_run {
        info!(project = %project, instance = %args.instance, "dry run: would delete instance");
        return Ok(());
    }

    let op = ctx
        .api
        .delete_instance(&project, &args.instance)
        .await
        .with_context(|| format!("error deleting instance {}", args.instance))?;
    ctx.finish(&project, &op, args.wait, &format!("Deletion of instance {}", args.instance))
        .await
}
