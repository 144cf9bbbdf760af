use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{require, CommandContext};

pub const DEFAULT_DESCRIPTION: &str = "on-demand-backup";

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// GCP project ID (defaults to project_id from the config file)
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the Cloud SQL instance
    #[arg(long)]
    pub instance: String,

    /// Description for this backup
    #[arg(long, default_value = DEFAULT_DESCRIPTION)]
    pub description: String,

    /// Wait for the operation to finish
    #[arg(long)]
    pub wait: bool,
}

pub async fn run(ctx: &CommandContext<'_>, args: BackupArgs) -> Result<()> {
    let project = ctx.project(args.project, "project")?;
    require(&args.instance, "instance")?;

    if ctx.dry_run {
        info!(
            project = %project,
            instance = %args.instance,
            description = %args.description,
            "dry run: would create backup"
        );
        return Ok(());
    }

    let op = ctx
        .api
        .create_backup(&project, &args.instance, &args.description)
        .await
        .with_context(|| format!("error creating backup for instance {}", args.instance))?;
    ctx.finish(&project, &op, args.wait, &format!("Backup of instance {}", args.instance))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::gcp::MockSqlAdmin;
    use crate::types::Operation;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_backup_and_wait() {
        let mut config = AppConfig::default();
        config.poll.interval = Duration::from_secs(1);

        let mut api = MockSqlAdmin::new();
        api.expect_create_backup()
            .withf(|p, i, d| p == "p1" && i == "src" && d == "nightly")
            .times(1)
            .returning(|_, _, _| {
                Ok(Operation {
                    name: "projects/p1/operations/bk-1".into(),
                    status: "PENDING".into(),
                    ..Operation::default()
                })
            });
        api.expect_get_operation()
            .withf(|p, o| p == "p1" && o == "bk-1")
            .times(1)
            .returning(|_, _| {
                Ok(Operation {
                    name: "bk-1".into(),
                    status: "DONE".into(),
                    ..Operation::default()
                })
            });

        let ctx = CommandContext::new(&api, &config, false);
        run(
            &ctx,
            BackupArgs {
                project: Some("p1".into()),
                instance: "src".into(),
                description: "nightly".into(),
                wait: true,
            },
        )
        .await
        .unwrap();
    }
}
