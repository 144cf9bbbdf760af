use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use super::{require, CommandContext};
use crate::error::MigrationCause;
use crate::migrate::classify_restore_error;
use crate::types::RestoreBackupContext;

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// GCP project ID of the target instance (defaults to project_id from the config file)
    #[arg(long)]
    pub project: Option<String>,

    /// Name of the instance to restore into
    #[arg(long, alias = "targetInstance")]
    pub target_instance: String,

    /// Backup run ID to restore from
    #[arg(long, alias = "backupRunId")]
    pub backup_run_id: i64,

    /// Name of the instance the backup was taken from
    #[arg(long, alias = "sourceInstance")]
    pub source_instance: String,

    /// Project of the source instance (defaults to --project)
    #[arg(long, alias = "sourceProject")]
    pub source_project: Option<String>,

    /// Wait for the operation to finish
    #[arg(long)]
    pub wait: bool,
}

pub async fn run(ctx: &CommandContext<'_>, args: RestoreArgs) -> Result<()> {
    let project = ctx.project(args.project, "project")?;
    require(&args.target_instance, "target-instance")?;
    require(&args.source_instance, "source-instance")?;
    if args.backup_run_id <= 0 {
        anyhow::bail!("--backup-run-id is required");
    }
    let source_project = args
        .source_project
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| project.clone());

    let context = RestoreBackupContext {
        backup_run_id: args.backup_run_id,
        project: source_project,
        instance_id: args.source_instance,
    };

    if ctx.dry_run {
        info!(
            target_instance = %args.target_instance,
            backup_run_id = context.backup_run_id,
            source_instance = %context.instance_id,
            "dry run: would restore backup"
        );
        return Ok(());
    }

    let op = match ctx
        .api
        .restore_backup(&project, &args.target_instance, &context)
        .await
    {
        Ok(op) => op,
        Err(e) => {
            let cause = classify_restore_error(e);
            if matches!(cause, MigrationCause::CrossRegionUnsupported { .. }) {
                warn!("restore was refused for crossing regions");
            }
            return Err(cause).with_context(|| {
                format!("error restoring backup to instance {}", args.target_instance)
            });
        }
    };
    ctx.finish(
        &project,
        &op,
        args.wait,
        &format!(
            "Restore of backup {} into {}",
            context.backup_run_id, args.target_instance
        ),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ApiError;
    use crate::gcp::MockSqlAdmin;
    use crate::types::Operation;

    fn args() -> RestoreArgs {
        RestoreArgs {
            project: Some("p2".into()),
            target_instance: "dst".into(),
            backup_run_id: 42,
            source_instance: "src".into(),
            source_project: None,
            wait: false,
        }
    }

    #[tokio::test]
    async fn test_source_project_defaults_to_project() {
        let config = AppConfig::default();
        let mut api = MockSqlAdmin::new();
        api.expect_restore_backup()
            .withf(|p, i, c| {
                p == "p2" && i == "dst" && c.project == "p2" && c.instance_id == "src" && c.backup_run_id == 42
            })
            .times(1)
            .returning(|_, _, _| Ok(Operation::default()));

        let ctx = CommandContext::new(&api, &config, false);
        run(&ctx, args()).await.unwrap();
    }

    #[tokio::test]
    async fn test_cross_region_refusal_is_reported() {
        let config = AppConfig::default();
        let mut api = MockSqlAdmin::new();
        api.expect_restore_backup().returning(|_, _, _| {
            Err(ApiError::Remote {
                status: 400,
                message: "Restore is not supported for cross region backup runs".into(),
            })
        });

        let ctx = CommandContext::new(&api, &config, false);
        let err = run(&ctx, args()).await.unwrap_err();
        let cause = err.downcast_ref::<MigrationCause>().unwrap();
        assert!(matches!(cause, MigrationCause::CrossRegionUnsupported { .. }));
    }
}
