use std::time::Duration;

use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::PollError;
use crate::gcp::SqlAdmin;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Waits for Admin API operations to finish.
pub struct OperationPoller<'a> {
    api: &'a dyn SqlAdmin,
    settings: PollSettings,
    cancel: CancellationToken,
}

impl<'a> OperationPoller<'a> {
    pub fn new(api: &'a dyn SqlAdmin, settings: PollSettings, cancel: CancellationToken) -> Self {
        Self {
            api,
            settings,
            cancel,
        }
    }

    /// Poll `operation` every `interval` until it is `DONE` or `timeout`
    /// has passed since the call started.
    ///
    /// A failed status fetch ends the wait immediately. Neither the deadline
    /// nor cancellation waits for an in-flight fetch to return. Cancelling the
    /// token only stops the local wait; the operation keeps running remotely.
    pub async fn wait(&self, project: &str, operation: &str) -> Result<(), PollError> {
        let PollSettings { interval, timeout } = self.settings;
        let deadline = Instant::now() + timeout;

        loop {
            // The deadline and the token also bound a status fetch that stalls.
            let fetch = timeout_at(deadline, self.api.get_operation(project, operation));
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(PollError::Cancelled { operation: operation.to_string() });
                }
                fetched = fetch => fetched,
            };
            let op = match fetched {
                Ok(result) => result.map_err(|source| PollError::Transport {
                    operation: operation.to_string(),
                    source,
                })?,
                Err(_) => {
                    return Err(PollError::Timeout {
                        operation: operation.to_string(),
                        timeout,
                    })
                }
            };

            if op.is_done() {
                let details = op.error_details();
                if !details.is_empty() {
                    return Err(PollError::OperationFailed {
                        operation: operation.to_string(),
                        details,
                    });
                }
                info!(operation, "operation finished");
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PollError::Timeout {
                    operation: operation.to_string(),
                    timeout,
                });
            }
            debug!(operation, status = %op.status, "operation still running");

            let pause = interval.min(deadline - now);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(PollError::Cancelled { operation: operation.to_string() });
                }
                _ = sleep(pause) => {}
            }

            if Instant::now() >= deadline {
                return Err(PollError::Timeout {
                    operation: operation.to_string(),
                    timeout,
                });
            }
        }
    }
}
