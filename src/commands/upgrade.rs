use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use super::{require, CommandContext};
use crate::types::{Settings, SqlInstance};

#[derive(Debug, Args)]
pub struct UpgradeArgs {
    /// GCP project ID (defaults to project_id from the config file)
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the existing Cloud SQL instance
    #[arg(long)]
    pub instance: String,

    /// New database version, e.g. MYSQL_8_0
    #[arg(long, alias = "dbVersion")]
    pub db_version: Option<String>,

    /// New machine type tier
    #[arg(long)]
    pub tier: Option<String>,

    /// Wait for the operation to finish
    #[arg(long)]
    pub wait: bool,
}

/// Apply the requested version and tier to the current instance resource.
pub fn apply_upgrade(
    mut instance: SqlInstance,
    version: Option<&str>,
    tier: Option<&str>,
) -> SqlInstance {
    if let Some(version) = version.filter(|v| !v.is_empty()) {
        instance.database_version = version.to_string();
    }
    if let Some(tier) = tier.filter(|t| !t.is_empty()) {
        instance
            .settings
            .get_or_insert_with(Settings::default)
            .tier = tier.to_string();
    }
    instance
}

pub async fn run(ctx: &CommandContext<'_>, args: UpgradeArgs) -> Result<()> {
    let project = ctx.project(args.project, "project")?;
    require(&args.instance, "instance")?;

    let version = args.db_version.as_deref().filter(|v| !v.trim().is_empty());
    let tier = args.tier.as_deref().filter(|t| !t.trim().is_empty());
    if version.is_none() && tier.is_none() {
        bail!("nothing to upgrade: pass --db-version and/or --tier");
    }

    let current = ctx
        .api
        .get_instance(&project, &args.instance)
        .await
        .with_context(|| format!("could not find instance {}", args.instance))?;
    let updated = apply_upgrade(current, version, tier);

    if ctx.dry_run {
        info!(
            instance = %args.instance,
            version = %updated.database_version,
            tier = updated.tier().unwrap_or(""),
            "dry run: would patch instance"
        );
        return Ok(());
    }

    let op = ctx
        .api
        .patch_instance(&project, &args.instance, &updated)
        .await
        .with_context(|| format!("error updating instance {}", args.instance))?;
    ctx.finish(&project, &op, args.wait, &format!("Upgrade of instance {}", args.instance))
        .await
}
