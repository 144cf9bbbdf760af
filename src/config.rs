//! Application configuration, loaded once in `main` and passed down.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::gcp::DEFAULT_API_ENDPOINT;
use crate::poller::PollSettings;

pub const DEFAULT_REGION: &str = "us-central1";
const CONFIG_FILE_NAME: &str = ".sledge.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub project_id: Option<String>,
    pub default_region: String,
    pub access_token: Option<String>,
    /// Service-account key file handed to gcloud when no static token is set.
    pub credentials: Option<PathBuf>,
    pub api_endpoint: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub poll: PollSettings,
    /// File the values were read from, if any.
    pub source: Option<PathBuf>,
    /// Problems found while loading, reported once logging is up.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            default_region: DEFAULT_REGION.to_string(),
            access_token: None,
            credentials: None,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            poll: PollSettings::default(),
            source: None,
            warnings: Vec::new(),
        }
    }
}

/// On-disk shape of `~/.sledge.yaml`; every key is optional.
///
/// Keys sledge does not read (older per-command sections such as `migrate:`)
/// are kept aside so they can be reported instead of failing the command.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    project_id: Option<String>,
    default_region: Option<String>,
    access_token: Option<String>,
    credentials: Option<String>,
    api_endpoint: Option<String>,
    log_level: Option<String>,
    log_format: Option<String>,
    poll_interval: Option<String>,
    poll_timeout: Option<String>,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).with_context(|| format!("invalid duration for {key}: {value}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Defaults, then the config file, then `SLEDGE_*` environment variables.
    ///
    /// An explicit `path` must exist and parse; a broken default
    /// `~/.sledge.yaml` is reported and skipped.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = match path {
            Some(p) => Some((p.to_path_buf(), true)),
            None => dirs::home_dir()
                .map(|home| home.join(CONFIG_FILE_NAME))
                .filter(|p| p.exists())
                .map(|p| (p, false)),
        };
        Self::load_from(file, env)
    }

    /// `file` pairs a path with whether the user named it explicitly.
    pub(crate) fn load_from(
        file: Option<(PathBuf, bool)>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = AppConfig::default();

        if let Some((file, explicit)) = file {
            match config.read_file(&file) {
                Ok(()) => {
                    debug!(path = %file.display(), "loaded config file");
                    config.source = Some(file);
                }
                Err(e) if !explicit => {
                    config = AppConfig::default();
                    config
                        .warnings
                        .push(format!("ignoring config file {}: {e:#}", file.display()));
                }
                Err(e) => return Err(e),
            }
        }

        config.apply(FileConfig {
            project_id: env("SLEDGE_PROJECT_ID"),
            default_region: env("SLEDGE_DEFAULT_REGION"),
            access_token: env("SLEDGE_ACCESS_TOKEN"),
            credentials: env("SLEDGE_CREDENTIALS"),
            api_endpoint: env("SLEDGE_API_ENDPOINT"),
            log_level: env("SLEDGE_LOG_LEVEL"),
            log_format: env("SLEDGE_LOG_FORMAT"),
            poll_interval: env("SLEDGE_POLL_INTERVAL"),
            poll_timeout: env("SLEDGE_POLL_TIMEOUT"),
            unknown: BTreeMap::new(),
        })?;

        Ok(config)
    }

    fn read_file(&mut self, file: &Path) -> Result<()> {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("reading config file {}", file.display()))?;
        let parsed: FileConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", file.display()))?;
        if !parsed.unknown.is_empty() {
            let keys: Vec<&str> = parsed.unknown.keys().map(String::as_str).collect();
            self.warnings.push(format!(
                "config file {} has keys sledge does not use: {}",
                file.display(),
                keys.join(", ")
            ));
        }
        self.apply(parsed)
    }

    fn apply(&mut self, file: FileConfig) -> Result<()> {
        if let Some(v) = non_empty(file.project_id) {
            self.project_id = Some(v);
        }
        if let Some(v) = non_empty(file.default_region) {
            self.default_region = v;
        }
        if let Some(v) = non_empty(file.access_token) {
            self.access_token = Some(v);
        }
        if let Some(v) = non_empty(file.credentials) {
            self.credentials = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty(file.api_endpoint) {
            self.api_endpoint = v;
        }
        if let Some(v) = non_empty(file.log_level) {
            self.log_level = v;
        }
        if let Some(v) = non_empty(file.log_format) {
            self.log_format = v.parse()?;
        }
        if let Some(v) = non_empty(file.poll_interval) {
            self.poll.interval = parse_duration("poll_interval", &v)?;
        }
        if let Some(v) = non_empty(file.poll_timeout) {
            self.poll.timeout = parse_duration("poll_timeout", &v)?;
        }
        Ok(())
    }

    /// `value` if given, else the configured project.
    pub fn project_or_default(&self, value: Option<String>) -> Option<String> {
        non_empty(value).or_else(|| self.project_id.clone())
    }
}
