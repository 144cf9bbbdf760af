//! The `sledge` subcommands. All but `migrate` are a single Admin API call,
//! optionally followed by waiting for the operation it started.

pub mod backup;
pub mod create;
pub mod delete;
pub mod describe;
pub mod migrate;
pub mod restore;
pub mod upgrade;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppConfig;
use crate::gcp::SqlAdmin;
use crate::poller::OperationPoller;
use crate::types::Operation;

/// Everything a command needs besides its own arguments.
pub struct CommandContext<'a> {
    pub api: &'a dyn SqlAdmin,
    pub config: &'a AppConfig,
    pub dry_run: bool,
    pub cancel: CancellationToken,
}

impl<'a> CommandContext<'a> {
    pub fn new(api: &'a dyn SqlAdmin, config: &'a AppConfig, dry_run: bool) -> Self {
        Self {
            api,
            config,
            dry_run,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The `--project` flag, or the configured default project.
    pub fn project(&self, flag: Option<String>, name: &str) -> Result<String> {
        match self.config.project_or_default(flag) {
            Some(project) => Ok(project),
            None => bail!("--{name} is required (or set project_id in the config file)"),
        }
    }

    /// Report the started operation and, when asked, wait for it.
    pub async fn finish(&self, project: &str, op: &Operation, wait: bool, what: &str) -> Result<()> {
        info!(operation = op.short_name(), "{what} initiated");
        if !wait {
            return Ok(());
        }
        OperationPoller::new(self.api, self.config.poll, self.cancel.clone())
            .wait(project, op.short_name())
            .await
            .with_context(|| format!("{what} did not complete"))?;
        info!(operation = op.short_name(), "{what} complete");
        Ok(())
    }
}

pub(crate) fn require(value: &str, flag: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("--{flag} is required");
    }
    Ok(())
}
