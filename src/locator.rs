use tracing::{debug, warn};

use crate::error::LocateError;
use crate::gcp::SqlAdmin;
use crate::types::BackupRun;

/// Find the backup run on `instance` tagged with `description`.
///
/// The first exact match in the order the service lists runs wins. When a
/// description was reused, that is not necessarily the newest run.
pub async fn find_by_description(
    api: &dyn SqlAdmin,
    project: &str,
    instance: &str,
    description: &str,
) -> Result<BackupRun, LocateError> {
    let runs = api
        .list_backups(project, instance)
        .await
        .map_err(LocateError::Remote)?;
    debug!(project, instance, count = runs.len(), "searching backup runs");

    let matches = runs.iter().filter(|r| r.description == description).count();
    if matches > 1 {
        warn!(
            instance,
            description,
            matches,
            "several backup runs share this description; using the first one listed"
        );
    }

    runs.into_iter()
        .find(|r| r.description == description)
        .ok_or_else(|| LocateError::NotFound {
            description: description.to_string(),
        })
}
