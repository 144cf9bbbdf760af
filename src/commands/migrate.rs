use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::{error, info, warn};

use super::CommandContext;
use crate::migrate::{MigrationRequest, Migrator, DEFAULT_BACKUP_DESCRIPTION};
use crate::poller::PollSettings;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// GCP project ID of the source instance (defaults to project_id from the config file)
    #[arg(long, alias = "sourceProject")]
    pub source_project: Option<String>,

    /// Source Cloud SQL instance name
    #[arg(long, alias = "sourceInstance")]
    pub source_instance: String,

    /// GCP project ID for the new instance (defaults to the source project)
    #[arg(long, alias = "targetProject")]
    pub target_project: Option<String>,

    /// Name of the new Cloud SQL instance in the target region
    #[arg(long, alias = "targetInstance")]
    pub target_instance: String,

    /// Region where the new instance should live
    #[arg(long, alias = "targetRegion")]
    pub target_region: String,

    /// Description for the on-demand backup
    #[arg(long, alias = "backupDesc", default_value = DEFAULT_BACKUP_DESCRIPTION)]
    pub backup_description: String,

    /// Interval between operation status checks, e.g. 5s
    #[arg(long, alias = "pollInterval", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Give up waiting on an operation after this long, e.g. 10m
    #[arg(long, alias = "pollTimeout", value_parser = humantime::parse_duration)]
    pub poll_timeout: Option<Duration>,
}

impl MigrateArgs {
    /// Build the request, filling gaps from the configuration.
    pub fn into_request(self, ctx: &CommandContext<'_>) -> MigrationRequest {
        let poll = PollSettings {
            interval: self.poll_interval.unwrap_or(ctx.config.poll.interval),
            timeout: self.poll_timeout.unwrap_or(ctx.config.poll.timeout),
        };
        MigrationRequest {
            source_project: ctx
                .config
                .project_or_default(self.source_project)
                .unwrap_or_default(),
            source_instance: self.source_instance,
            target_project: self.target_project,
            target_instance: self.target_instance,
            target_region: self.target_region,
            backup_description: self.backup_description,
            poll,
        }
    }
}

pub async fn run(ctx: &CommandContext<'_>, args: MigrateArgs) -> Result<()> {
    let request = args.into_request(ctx);

    if ctx.dry_run {
        request.validate()?;
        info!(
            source = %format!("{}/{}", request.source_project, request.source_instance),
            target = %format!("{}/{}", request.target_project(), request.target_instance),
            target_region = %request.target_region,
            description = %request.backup_description,
            "dry run: would back up the source, create the target and restore into it"
        );
        return Ok(());
    }

    match Migrator::new(ctx.api, ctx.cancel.clone()).run(&request).await {
        Ok(report) => {
            info!(
                instance = %report.target_instance,
                project = %report.target_project,
                region = %report.target_region,
                backup_run_id = report.backup_run_id,
                "Migration complete"
            );
            Ok(())
        }
        Err(err) => {
            error!(step = %err.step, "{err}");
            for step in err.leftovers() {
                warn!(
                    step = %step,
                    "resources from this step were left in place and may need manual cleanup"
                );
            }
            Err(err.into())
        }
    }
}
