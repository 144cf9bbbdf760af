#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use gcp_sledge::error::ApiError;
use gcp_sledge::gcp::SqlAdmin;
use gcp_sledge::types::{BackupRun, Operation, RestoreBackupContext, Settings, SqlInstance};

/// In-memory Admin API that records every call in order.
#[derive(Default)]
pub struct FakeAdmin {
    pub calls: Mutex<Vec<String>>,
    pub backups_after_insert: Vec<BackupRun>,
    pub instances: Mutex<HashMap<String, SqlInstance>>,
    pub created: Mutex<Vec<(String, SqlInstance)>>,
    pub restores: Mutex<Vec<(String, String, RestoreBackupContext)>>,
    /// Statuses an operation reports on successive polls; the last one repeats.
    pub statuses: Mutex<HashMap<String, VecDeque<String>>>,
    pub restore_error: Option<ApiError>,
    pub provision_error: Option<ApiError>,
}

impl FakeAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, project: &str, name: &str, version: &str, tier: &str) -> Self {
        self.instances.lock().unwrap().insert(
            format!("{project}/{name}"),
            SqlInstance {
                name: name.to_string(),
                project: project.to_string(),
                region: "us-central1".to_string(),
                database_version: version.to_string(),
                settings: Some(Settings::with_tier(tier)),
                ..SqlInstance::default()
            },
        );
        self
    }

    pub fn with_backups(mut self, runs: Vec<BackupRun>) -> Self {
        self.backups_after_insert = runs;
        self
    }

    pub fn script(&self, operation: &str, statuses: &[&str]) {
        self.statuses.lock().unwrap().insert(
            operation.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get_operation"))
            .collect()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn started(&self, name: &str) -> Operation {
        Operation {
            name: format!("projects/fake/operations/{name}"),
            status: "PENDING".to_string(),
            ..Operation::default()
        }
    }
}

pub fn backup_run(id: i64, description: &str) -> BackupRun {
    BackupRun {
        id,
        description: description.to_string(),
        status: "SUCCESSFUL".to_string(),
        backup_type: "ON_DEMAND".to_string(),
        ..BackupRun::default()
    }
}

fn copy_error(err: &ApiError) -> ApiError {
    match err {
        ApiError::Remote { status, message } => ApiError::Remote {
            status: *status,
            message: message.clone(),
        },
        other => ApiError::Transport(other.to_string()),
    }
}

#[async_trait]
impl SqlAdmin for FakeAdmin {
    async fn create_backup(
        &self,
        _project: &str,
        instance: &str,
        description: &str,
    ) -> Result<Operation, ApiError> {
        self.record(format!("create_backup {instance} {description}"));
        Ok(self.started("backup-op"))
    }

    async fn list_backups(&self, _project: &str, instance: &str) -> Result<Vec<BackupRun>, ApiError> {
        self.record(format!("list_backups {instance}"));
        Ok(self.backups_after_insert.clone())
    }

    async fn get_instance(&self, project: &str, instance: &str) -> Result<SqlInstance, ApiError> {
        self.record(format!("get_instance {instance}"));
        self.instances
            .lock()
            .unwrap()
            .get(&format!("{project}/{instance}"))
            .cloned()
            .ok_or_else(|| ApiError::Remote {
                status: 404,
                message: format!("instance {instance} does not exist"),
            })
    }

    async fn create_instance(
        &self,
        project: &str,
        instance: &SqlInstance,
    ) -> Result<Operation, ApiError> {
        self.record(format!("create_instance {}", instance.name));
        if let Some(err) = &self.provision_error {
            return Err(copy_error(err));
        }
        self.created
            .lock()
            .unwrap()
            .push((project.to_string(), instance.clone()));
        Ok(self.started("create-op"))
    }

    async fn patch_instance(
        &self,
        _project: &str,
        name: &str,
        _instance: &SqlInstance,
    ) -> Result<Operation, ApiError> {
        self.record(format!("patch_instance {name}"));
        Ok(self.started("patch-op"))
    }

    async fn delete_instance(&self, _project: &str, instance: &str) -> Result<Operation, ApiError> {
        self.record(format!("delete_instance {instance}"));
        Ok(self.started("delete-op"))
    }

    async fn restore_backup(
        &self,
        project: &str,
        instance: &str,
        context: &RestoreBackupContext,
    ) -> Result<Operation, ApiError> {
        self.record(format!("restore_backup {instance}"));
        if let Some(err) = &self.restore_error {
            return Err(copy_error(err));
        }
        self.restores.lock().unwrap().push((
            project.to_string(),
            instance.to_string(),
            context.clone(),
        ));
        Ok(self.started("restore-op"))
    }

    async fn get_operation(&self, _project: &str, operation: &str) -> Result<Operation, ApiError> {
        self.record(format!("get_operation {operation}"));
        let mut statuses = self.statuses.lock().unwrap();
        let status = match statuses.get_mut(operation) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => "DONE".to_string(),
        };
        Ok(Operation {
            name: operation.to_string(),
            status,
            ..Operation::default()
        })
    }
}
