use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

pub const STATUS_DONE: &str = "DONE";

/// A Cloud SQL instance as returned by `instances.get` and sent to
/// `instances.insert` / `instances.patch`.
///
/// Only the fields sledge reasons about are typed; everything else the
/// service returns is kept in `other` so it survives a read-modify-write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlInstance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl SqlInstance {
    /// Request body for provisioning a new instance that mirrors `source`'s
    /// engine version and settings in another place.
    pub fn cloned_from(source: &SqlInstance, project: &str, name: &str, region: &str) -> Self {
        Self {
            name: name.to_string(),
            project: project.to_string(),
            region: region.to_string(),
            database_version: source.database_version.clone(),
            settings: source.settings.clone(),
            ..Self::default()
        }
    }

    /// An insert request must name the instance and where it lives.
    pub fn validate_for_create(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("instance name is empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(ApiError::InvalidRequest(format!(
                "region of instance {} is empty",
                self.name
            )));
        }
        Ok(())
    }

    pub fn tier(&self) -> Option<&str> {
        self.settings.as_ref().map(|s| s.tier.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tier: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Settings {
    pub fn with_tier(tier: &str) -> Self {
        Self {
            tier: tier.to_string(),
            other: Map::new(),
        }
    }
}

/// One entry of `backupRuns.list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRun {
    #[serde(with = "int64")]
    pub id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub backup_type: String,
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRunList {
    #[serde(default)]
    pub items: Vec<BackupRun>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A long-running operation tracked by the service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<OperationErrors>,
}

impl Operation {
    pub fn is_done(&self) -> bool {
        self.status == STATUS_DONE
    }

    /// Messages reported by a finished operation, empty on success.
    pub fn error_details(&self) -> Vec<String> {
        self.error
            .as_ref()
            .map(|e| {
                e.errors
                    .iter()
                    .map(|err| match (&err.code, &err.message) {
                        (Some(code), Some(msg)) => format!("{code}: {msg}"),
                        (Some(code), None) => code.clone(),
                        (None, Some(msg)) => msg.clone(),
                        (None, None) => "unknown error".to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Operation names may come back as a full resource path.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationErrors {
    #[serde(default)]
    pub errors: Vec<OperationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreRequest {
    #[serde(rename = "restoreBackupContext")]
    pub restore_backup_context: RestoreBackupContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreBackupContext {
    #[serde(rename = "backupRunId", with = "int64")]
    pub backup_run_id: i64,
    pub project: String,
    #[serde(rename = "instanceId")]
    pub instance_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBackupRequest<'a> {
    pub description: &'a str,
}

/// Google's JSON error envelope: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct GcpErrorEnvelope {
    pub error: GcpError,
}

#[derive(Debug, Deserialize)]
pub struct GcpError {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
}

/// int64 values travel as JSON strings in the Admin API; accept both forms.
mod int64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(value: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Num(n) => Ok(n),
            Repr::Str(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backup_run_id_accepts_string_and_number() {
        let from_str: BackupRun =
            serde_json::from_value(json!({"id": "1712345", "description": "x"})).unwrap();
        let from_num: BackupRun =
            serde_json::from_value(json!({"id": 1712345, "description": "x"})).unwrap();
        assert_eq!(from_str.id, 1712345);
        assert_eq!(from_num.id, 1712345);
    }

    #[test]
    fn clone_keeps_unknown_settings() {
        let source: SqlInstance = serde_json::from_value(json!({
            "name": "src",
            "region": "us-central1",
            "databaseVersion": "MYSQL_8_0",
            "connectionName": "p1:us-central1:src",
            "settings": {
                "tier": "db-f1-micro",
                "backupConfiguration": {"enabled": true},
                "dataDiskSizeGb": "10"
            }
        }))
        .unwrap();

        let target = SqlInstance::cloned_from(&source, "p2", "dst", "europe-west1");
        let body = serde_json::to_value(&target).unwrap();

        assert_eq!(body["name"], "dst");
        assert_eq!(body["project"], "p2");
        assert_eq!(body["region"], "europe-west1");
        assert_eq!(body["databaseVersion"], "MYSQL_8_0");
        assert_eq!(body["settings"]["tier"], "db-f1-micro");
        assert_eq!(body["settings"]["backupConfiguration"]["enabled"], true);
        assert!(body.get("connectionName").is_none());
    }

    #[test]
    fn create_requires_name_and_region() {
        let mut inst = SqlInstance {
            name: "dst".into(),
            ..SqlInstance::default()
        };
        assert!(inst.validate_for_create().is_err());
        inst.region = "europe-west1".into();
        assert!(inst.validate_for_create().is_ok());
        inst.name = " ".into();
        assert!(inst.validate_for_create().is_err());
    }

    #[test]
    fn operation_error_details() {
        let op: Operation = serde_json::from_value(json!({
            "name": "projects/p1/operations/abc",
            "status": "DONE",
            "error": {"errors": [{"code": "INTERNAL_ERROR", "message": "boom"}]}
        }))
        .unwrap();
        assert!(op.is_done());
        assert_eq!(op.short_name(), "abc");
        assert_eq!(op.error_details(), vec!["INTERNAL_ERROR: boom".to_string()]);
    }

    #[test]
    fn restore_context_wire_shape() {
        let req = RestoreRequest {
            restore_backup_context: RestoreBackupContext {
                backup_run_id: 42,
                project: "p1".into(),
                instance_id: "src".into(),
            },
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({"restoreBackupContext": {"backupRunId": "42", "project": "p1", "instanceId": "src"}})
        );
    }
}
