//! Cross-region migration: back up the source, provision a twin in the
//! target region, restore the backup into it.
//!
//! Each step runs once, strictly after the previous one succeeded. A failure
//! stops the run and is reported against the step it happened in; nothing
//! created by earlier steps is cleaned up.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ApiError, MigrationCause, MigrationError, MigrationStep};
use crate::gcp::SqlAdmin;
use crate::locator;
use crate::poller::{OperationPoller, PollSettings};
use crate::types::{RestoreBackupContext, SqlInstance};

pub const DEFAULT_BACKUP_DESCRIPTION: &str = "migration-backup";

/// Substring the Admin API uses when it refuses a restore across regions.
///
/// There is no structured error code for this case, so this is a text match
/// against the service's wording and may break if that wording changes.
const CROSS_REGION_MARKER: &str = "not supported for cross region";

/// Input of one migration run.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRequest {
    pub source_project: String,
    pub source_instance: String,
    /// Falls back to `source_project` when `None` or empty.
    pub target_project: Option<String>,
    pub target_instance: String,
    pub target_region: String,
    pub backup_description: String,
    pub poll: PollSettings,
}

impl MigrationRequest {
    pub fn target_project(&self) -> &str {
        match self.target_project.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => &self.source_project,
        }
    }

    pub fn validate(&self) -> Result<(), MigrationError> {
        let required = [
            ("source project", &self.source_project),
            ("source instance", &self.source_instance),
            ("target instance", &self.target_instance),
            ("target region", &self.target_region),
            ("backup description", &self.backup_description),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(MigrationError::new(
                MigrationStep::Validate,
                MigrationCause::Validation(format!("missing {}", missing.join(", "))),
            ));
        }
        if self.poll.interval.is_zero() || self.poll.timeout.is_zero() {
            return Err(MigrationError::new(
                MigrationStep::Validate,
                MigrationCause::Validation("poll interval and timeout must be positive".into()),
            ));
        }
        Ok(())
    }
}

/// What a finished migration produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    pub backup_run_id: i64,
    pub target_project: String,
    pub target_instance: String,
    pub target_region: String,
    pub database_version: String,
}

/// Sort a rejected restore call into cross-region refusal or a generic
/// remote failure.
pub fn classify_restore_error(err: ApiError) -> MigrationCause {
    let message = err.message();
    if message.to_lowercase().contains(CROSS_REGION_MARKER) {
        MigrationCause::CrossRegionUnsupported { message }
    } else {
        MigrationCause::Remote(err)
    }
}

pub struct Migrator<'a> {
    api: &'a dyn SqlAdmin,
    cancel: CancellationToken,
}

impl<'a> Migrator<'a> {
    pub fn new(api: &'a dyn SqlAdmin, cancel: CancellationToken) -> Self {
        Self { api, cancel }
    }

    fn ensure_not_cancelled(&self, step: MigrationStep) -> Result<(), MigrationError> {
        if self.cancel.is_cancelled() {
            return Err(MigrationError::new(step, MigrationCause::CancelledBeforeStart));
        }
        Ok(())
    }

    pub async fn run(&self, request: &MigrationRequest) -> Result<MigrationReport, MigrationError> {
        request.validate()?;

        let source_project = request.source_project.as_str();
        let source_instance = request.source_instance.as_str();
        let target_project = request.target_project();
        let target_instance = request.target_instance.as_str();
        let target_region = request.target_region.as_str();
        let description = request.backup_description.as_str();
        let poller = OperationPoller::new(self.api, request.poll, self.cancel.clone());

        // Backup
        self.ensure_not_cancelled(MigrationStep::Backup)?;
        info!(source_instance, description, "[1/5] Creating on-demand backup");
        let step = MigrationStep::Backup;
        let op = self
            .api
            .create_backup(source_project, source_instance, description)
            .await
            .map_err(|e| MigrationError::new(step, MigrationCause::Remote(e)))?;
        info!(operation = op.short_name(), "Backup operation started");
        poller
            .wait(source_project, op.short_name())
            .await
            .map_err(|e| MigrationError::new(step, e))?;
        info!("[1/5] Backup complete");

        // Locate
        self.ensure_not_cancelled(MigrationStep::Locate)?;
        info!(description, "[2/5] Locating backup run");
        let backup =
            locator::find_by_description(self.api, source_project, source_instance, description)
                .await
                .map_err(|e| MigrationError::new(MigrationStep::Locate, e))?;
        info!(backup_run_id = backup.id, "[2/5] Using backup run");

        // Fetch source
        self.ensure_not_cancelled(MigrationStep::FetchSource)?;
        info!(source_instance, "[3/5] Getting source instance info");
        let source = self
            .api
            .get_instance(source_project, source_instance)
            .await
            .map_err(|e| {
                MigrationError::new(MigrationStep::FetchSource, MigrationCause::Remote(e))
            })?;
        info!(
            database_version = %source.database_version,
            tier = source.tier().unwrap_or("unknown"),
            "[3/5] Source instance retrieved"
        );

        // Provision
        self.ensure_not_cancelled(MigrationStep::Provision)?;
        let step = MigrationStep::Provision;
        info!(target_instance, target_region, "[4/5] Creating target instance");
        let target =
            SqlInstance::cloned_from(&source, target_project, target_instance, target_region);
        target.validate_for_create().map_err(|e| {
            MigrationError::new(step, MigrationCause::Validation(e.message()))
        })?;
        let op = self
            .api
            .create_instance(target_project, &target)
            .await
            .map_err(|e| MigrationError::new(step, MigrationCause::Remote(e)))?;
        info!(operation = op.short_name(), "Creation operation started");
        poller
            .wait(target_project, op.short_name())
            .await
            .map_err(|e| MigrationError::new(step, e))?;
        info!("[4/5] Target instance created");

        // Restore
        self.ensure_not_cancelled(MigrationStep::Restore)?;
        let step = MigrationStep::Restore;
        info!(
            backup_run_id = backup.id,
            source_instance, target_instance, "[5/5] Restoring backup into target"
        );
        let context = RestoreBackupContext {
            backup_run_id: backup.id,
            project: source_project.to_string(),
            instance_id: source_instance.to_string(),
        };
        let op = self
            .api
            .restore_backup(target_project, target_instance, &context)
            .await
            .map_err(|e| {
                let cause = classify_restore_error(e);
                if matches!(cause, MigrationCause::CrossRegionUnsupported { .. }) {
                    warn!(target_region, "service refused the cross-region restore");
                }
                MigrationError::new(step, cause)
            })?;
        info!(operation = op.short_name(), "Restore operation started");
        poller
            .wait(target_project, op.short_name())
            .await
            .map_err(|e| MigrationError::new(step, e))?;

        info!(target_instance, target_region, "[5/5] Migration complete");
        Ok(MigrationReport {
            backup_run_id: backup.id,
            target_project: target_project.to_string(),
            target_instance: target_instance.to_string(),
            target_region: target_region.to_string(),
            database_version: source.database_version,
        })
    }
}
