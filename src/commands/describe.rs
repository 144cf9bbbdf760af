use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{require, CommandContext};

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// GCP project ID (defaults to project_id from the config file)
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the Cloud SQL instance
    #[arg(long)]
    pub instance: String,
}

/// Print the instance resource as pretty JSON on stdout.
pub async fn run(ctx: &CommandContext<'_>, args: DescribeArgs) -> Result<()> {
    let project = ctx.project(args.project, "project")?;
    require(&args.instance, "instance")?;

    let instance = ctx
        .api
        .get_instance(&project, &args.instance)
        .await
        .with_context(|| format!("error describing instance {}", args.instance))?;
    let data =
        serde_json::to_string_pretty(&instance).context("failed to serialize instance details")?;

    info!(project = %project, instance = %args.instance, "Cloud SQL instance details");
    println!("{data}");
    Ok(())
}
