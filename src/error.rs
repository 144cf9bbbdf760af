//! Error types for talking to the Cloud SQL Admin API and for the
//! multi-step migration workflow.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

fn fmt_duration(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

fn join_details(details: &[String]) -> String {
    details.join("; ")
}

/// A failed call against the Admin API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("remote error [{status}]: {message}")]
    Remote { status: u16, message: String },

    /// The request never got a usable answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// No access token could be obtained.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The request was rejected locally before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Message text as reported by the service, or the reason a request was
    /// refused locally, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Remote { message, .. } | ApiError::InvalidRequest(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Why waiting on an operation stopped without success.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("operation {operation} did not complete before timeout of {}", fmt_duration(.timeout))]
    Timeout { operation: String, timeout: Duration },

    #[error("operation {operation} finished with errors: {}", join_details(.details))]
    OperationFailed {
        operation: String,
        details: Vec<String>,
    },

    #[error("failed to get operation {operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: ApiError,
    },

    #[error("stopped waiting for operation {operation}: cancelled")]
    Cancelled { operation: String },
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("could not find the backup run with description {description:?}")]
    NotFound { description: String },

    #[error("failed to list backup runs: {0}")]
    Remote(#[source] ApiError),
}

/// The workflow step a migration failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    Validate,
    Backup,
    Locate,
    FetchSource,
    Provision,
    Restore,
}

impl MigrationStep {
    pub const ALL: [MigrationStep; 6] = [
        MigrationStep::Validate,
        MigrationStep::Backup,
        MigrationStep::Locate,
        MigrationStep::FetchSource,
        MigrationStep::Provision,
        MigrationStep::Restore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MigrationStep::Validate => "validate",
            MigrationStep::Backup => "backup",
            MigrationStep::Locate => "locate",
            MigrationStep::FetchSource => "fetch-source",
            MigrationStep::Provision => "provision",
            MigrationStep::Restore => "restore",
        }
    }

    /// Whether finishing this step leaves something behind in the project.
    fn has_side_effects(self) -> bool {
        matches!(self, MigrationStep::Backup | MigrationStep::Provision)
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum MigrationCause {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    Remote(#[source] ApiError),

    #[error("{0}")]
    Transport(#[source] ApiError),

    #[error("operation {operation} finished with errors: {}", join_details(.details))]
    OperationFailed {
        operation: String,
        details: Vec<String>,
    },

    #[error("operation {operation} did not complete before timeout of {}", fmt_duration(.timeout))]
    Timeout { operation: String, timeout: Duration },

    #[error("no backup run with description {description:?} on the source instance")]
    NotFound { description: String },

    #[error("cross-region restore may not be supported for your DB version or region: {message}")]
    CrossRegionUnsupported { message: String },

    #[error("cancelled while waiting for operation {operation}")]
    Cancelled { operation: String },

    /// Cancelled between steps, before this step issued any call.
    #[error("cancelled before the step started")]
    CancelledBeforeStart,
}

impl From<PollError> for MigrationCause {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Timeout { operation, timeout } => {
                MigrationCause::Timeout { operation, timeout }
            }
            PollError::OperationFailed { operation, details } => {
                MigrationCause::OperationFailed { operation, details }
            }
            PollError::Transport { source, .. } => MigrationCause::Transport(source),
            PollError::Cancelled { operation } => MigrationCause::Cancelled { operation },
        }
    }
}

impl From<LocateError> for MigrationCause {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound { description } => MigrationCause::NotFound { description },
            LocateError::Remote(e) => MigrationCause::Remote(e),
        }
    }
}

/// A migration that stopped at `step`.
///
/// Nothing is rolled back: whatever earlier steps created stays in place,
/// see [`MigrationError::completed_steps`].
#[derive(Debug, Error)]
#[error("migration failed at step {step}: {cause}")]
pub struct MigrationError {
    pub step: MigrationStep,
    #[source]
    pub cause: MigrationCause,
}

impl MigrationError {
    pub fn new(step: MigrationStep, cause: impl Into<MigrationCause>) -> Self {
        Self {
            step,
            cause: cause.into(),
        }
    }

    /// Steps that completed before the failure.
    pub fn completed_steps(&self) -> Vec<MigrationStep> {
        MigrationStep::ALL
            .into_iter()
            .take_while(|s| *s != self.step)
            .collect()
    }

    /// Completed steps whose results now exist remotely (the on-demand backup,
    /// the target instance), plus the failed step when its operation was
    /// started and may still finish out-of-band.
    pub fn leftovers(&self) -> Vec<MigrationStep> {
        let mut steps: Vec<_> = self
            .completed_steps()
            .into_iter()
            .filter(|s| s.has_side_effects())
            .collect();
        if self.failed_step_may_linger() {
            steps.push(self.step);
        }
        steps
    }

    fn failed_step_may_linger(&self) -> bool {
        match self.step {
            MigrationStep::Backup => matches!(
                self.cause,
                MigrationCause::Timeout { .. }
                    | MigrationCause::Cancelled { .. }
                    | MigrationCause::Transport(_)
            ),
            // A provision that ran and failed can still leave a broken instance.
            MigrationStep::Provision => !matches!(
                self.cause,
                MigrationCause::Remote(_)
                    | MigrationCause::Validation(_)
                    | MigrationCause::CancelledBeforeStart
            ),
            _ => false,
        }
    }
}
