use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{require, CommandContext};
use crate::types::{Settings, SqlInstance};

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// GCP project ID (defaults to project_id from the config file)
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the new Cloud SQL instance
    #[arg(long)]
    pub instance: String,

    /// Machine type tier (e.g. db-g1-small, db-f1-micro)
    #[arg(long, default_value = "db-f1-micro")]
    pub tier: String,

    /// Region for the instance (defaults to default_region from the config file)
    #[arg(long)]
    pub region: Option<String>,

    /// Database version, e.g. MYSQL_5_7 or MYSQL_8_0
    #[arg(long, alias = "dbVersion", default_value = "MYSQL_8_0")]
    pub db_version: String,

    /// Wait for the operation to finish
    #[arg(long)]
    pub wait: bool,
}

pub async fn run(ctx: &CommandContext<'_>, args: CreateArgs) -> Result<()> {
    let project = ctx.project(args.project, "project")?;
    require(&args.instance, "instance")?;

    let region = args
        .region
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| ctx.config.default_region.clone());
    let instance = SqlInstance {
        name: args.instance.clone(),
        project: project.clone(),
        region,
        database_version: args.db_version,
        settings: Some(Settings::with_tier(&args.tier)),
        ..SqlInstance::default()
    };

    if ctx.dry_run {
        info!(
            project = %project,
            instance = %instance.name,
            region = %instance.region,
            version = %instance.database_version,
            tier = %args.tier,
            "dry run: would create instance"
        );
        return Ok(());
    }

    let op = ctx
        .api
        .create_instance(&project, &instance)
        .await
        .with_context(|| format!("error creating instance {}", instance.name))?;
    ctx.finish(&project, &op, args.wait, &format!("Creation of instance {}", instance.name))
        .await
}
