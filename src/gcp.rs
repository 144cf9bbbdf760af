use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{
    BackupRun, BackupRunList, CreateBackupRequest, GcpErrorEnvelope, Operation,
    RestoreBackupContext, RestoreRequest, SqlInstance,
};

pub const DEFAULT_API_ENDPOINT: &str = "https://sqladmin.googleapis.com/v1";
/// Upper bound for a single Admin API request, including reading the body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The Cloud SQL Admin calls sledge issues.
///
/// Every mutating call hands back the [`Operation`] the service started;
/// callers wait on it through the poller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SqlAdmin: Send + Sync {
    async fn create_backup(
        &self,
        project: &str,
        instance: &str,
        description: &str,
    ) -> Result<Operation, ApiError>;

    /// All backup runs of `instance`, in the order the service lists them.
    async fn list_backups(&self, project: &str, instance: &str) -> Result<Vec<BackupRun>, ApiError>;

    async fn get_instance(&self, project: &str, instance: &str) -> Result<SqlInstance, ApiError>;

    async fn create_instance(
        &self,
        project: &str,
        instance: &SqlInstance,
    ) -> Result<Operation, ApiError>;

    async fn patch_instance(
        &self,
        project: &str,
        name: &str,
        instance: &SqlInstance,
    ) -> Result<Operation, ApiError>;

    async fn delete_instance(&self, project: &str, instance: &str) -> Result<Operation, ApiError>;

    async fn restore_backup(
        &self,
        project: &str,
        instance: &str,
        context: &RestoreBackupContext,
    ) -> Result<Operation, ApiError>;

    async fn get_operation(&self, project: &str, operation: &str) -> Result<Operation, ApiError>;
}

/// REST client for the Admin API.
pub struct GcpClient {
    client: Client,
    endpoint: String,
    static_token: Option<String>,
    credentials: Option<PathBuf>,
}

impl GcpClient {
    pub fn new(endpoint: &str, static_token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            static_token,
            credentials: None,
        })
    }

    /// Have gcloud mint tokens from this service-account key file instead of
    /// the active account.
    pub fn with_credentials(mut self, key_file: Option<PathBuf>) -> Self {
        self.credentials = key_file;
        self
    }

    async fn get_access_token(&self) -> Result<String, ApiError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        let mut gcloud = AsyncCommand::new("gcloud");
        gcloud.args(["auth", "print-access-token"]);
        if let Some(key_file) = &self.credentials {
            gcloud.env("CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE", key_file);
        }
        let output = gcloud
            .output()
            .await
            .map_err(|e| ApiError::Auth(format!("failed to run gcloud: {e}")))?;

        if !output.status.success() {
            return Err(ApiError::Auth(format!(
                "gcloud auth print-access-token failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|e| ApiError::Auth(e.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let token = self.get_access_token().await?;
        let response = request.bearer_auth(&token).send().await?;
        decode(response).await
    }
}

/// Turn a reply into `T`, or into `ApiError::Remote` carrying the service's message.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Remote {
            status: status.as_u16(),
            message: remote_message(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// A mutating call is only useful if the service named the operation it started.
pub(crate) fn started(op: Operation, request: &str) -> Result<Operation, ApiError> {
    if op.short_name().trim().is_empty() {
        return Err(ApiError::Decode(format!(
            "no operation ID returned from {request} request"
        )));
    }
    Ok(op)
}

pub(crate) fn remote_message(body: &str) -> String {
    serde_json::from_str::<GcpErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl SqlAdmin for GcpClient {
    async fn create_backup(
        &self,
        project: &str,
        instance: &str,
        description: &str,
    ) -> Result<Operation, ApiError> {
        let url = self.url(&format!(
            "projects/{project}/instances/{instance}/backupRuns"
        ));
        debug!(%url, description, "inserting backup run");
        let body = CreateBackupRequest { description };
        started(self.send(self.client.post(&url).json(&body)).await?, "backup")
    }

    async fn list_backups(&self, project: &str, instance: &str) -> Result<Vec<BackupRun>, ApiError> {
        let url = self.url(&format!(
            "projects/{project}/instances/{instance}/backupRuns"
        ));
        let mut runs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: BackupRunList = self.send(request).await?;
            debug!(%url, count = page.items.len(), "listed backup runs page");
            runs.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(runs)
    }

    async fn get_instance(&self, project: &str, instance: &str) -> Result<SqlInstance, ApiError> {
        let url = self.url(&format!("projects/{project}/instances/{instance}"));
        self.send(self.client.get(&url)).await
    }

    async fn create_instance(
        &self,
        project: &str,
        instance: &SqlInstance,
    ) -> Result<Operation, ApiError> {
        instance.validate_for_create()?;
        let url = self.url(&format!("projects/{project}/instances"));
        debug!(%url, name = %instance.name, region = %instance.region, "inserting instance");
        started(self.send(self.client.post(&url).json(instance)).await?, "insert")
    }

    async fn patch_instance(
        &self,
        project: &str,
        name: &str,
        instance: &SqlInstance,
    ) -> Result<Operation, ApiError> {
        let url = self.url(&format!("projects/{project}/instances/{name}"));
        started(self.send(self.client.patch(&url).json(instance)).await?, "patch")
    }

    async fn delete_instance(&self, project: &str, instance: &str) -> Result<Operation, ApiError> {
        let url = self.url(&format!("projects/{project}/instances/{instance}"));
        started(self.send(self.client.delete(&url)).await?, "delete")
    }

    async fn restore_backup(
        &self,
        project: &str,
        instance: &str,
        context: &RestoreBackupContext,
    ) -> Result<Operation, ApiError> {
        let url = self.url(&format!(
            "projects/{project}/instances/{instance}/restoreBackup"
        ));
        let body = RestoreRequest {
            restore_backup_context: context.clone(),
        };
        debug!(%url, backup_run_id = context.backup_run_id, "restoring backup");
        started(self.send(self.client.post(&url).json(&body)).await?, "restore")
    }

    async fn get_operation(&self, project: &str, operation: &str) -> Result<Operation, ApiError> {
        let url = self.url(&format!("projects/{project}/operations/{operation}"));
        self.send(self.client.get(&url)).await
    }
}
