use std::io;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that end a container lifecycle operation.
///
/// None of these are retried by the controller itself. The only bounded
/// retries (health-check polling and the single recreate after a 404) are
/// handled before an error of this type is produced.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A call to the provisioning service failed.
    ///
    /// Returned for creation and explicit deletion failures: transport errors,
    /// unexpected status codes and malformed responses.
    #[error("Revizor request failed: {0}")]
    Client(#[from] revizor_client::Error),

    /// The container never became ready within its retry budget.
    ///
    /// The container has already been deleted when this error is returned.
    #[error("Cannot create container {container_id}: not ready after {attempts} health checks")]
    PollingExhausted {
        container_id: String,
        attempts: u32,
        last_status: Option<u16>,
    },

    /// Deleting a container that failed to become ready did not succeed.
    ///
    /// The container may still exist on the provisioning side and needs
    /// manual cleanup.
    #[error("Failed to delete container {container_id} after it did not become ready: {source}")]
    RollbackFailed {
        container_id: String,
        #[source]
        source: revizor_client::Error,
    },

    /// The container outputs could not be written to the automation pipeline.
    #[error("Failed to report container outputs: {0}")]
    Report(#[from] io::Error),
}

impl LifecycleError {
    /// The container the error refers to, when one was created.
    pub fn container_id(&self) -> Option<&str> {
        match self {
            LifecycleError::PollingExhausted { container_id, .. }
            | LifecycleError::RollbackFailed { container_id, .. } => Some(container_id),
            _ => None,
        }
    }
}
