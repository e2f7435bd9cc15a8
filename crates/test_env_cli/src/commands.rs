//! Command implementations for the test-env CLI.
//!
//! - `create`: provision a container and wait until it is ready
//! - `delete`: remove a container by ID

use test_env_core::{CreateOutcome, LifecycleController};
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// Creates a container and waits until it is ready.
///
/// The container ID and hostname are published through the configured output
/// sinks as soon as the container exists.
///
/// # Errors
///
/// * `Error::Runtime` - the HTTP clients cannot be set up
/// * `Error::Lifecycle` - creation, polling, rollback or output reporting failed
pub async fn create(config: &AppConfig) -> Result<CreateOutcome, Error> {
    let controller = LifecycleController::new(
        config.revizor_client()?,
        config.health_check_client()?,
        config.lifecycle_policy(),
    );

    let payload = config.creation_payload();
    let outcome = controller.create(&payload, &config.output_sink()).await?;

    info!(
        container_id = %outcome.container.id,
        hostname = %outcome.hostname,
        creation_attempts = outcome.creation_attempts,
        health_checks = outcome.health_checks,
        "Container created"
    );
    Ok(outcome)
}

/// Deletes the container with the given ID.
///
/// # Errors
///
/// * `Error::Runtime` - the HTTP clients cannot be set up
/// * `Error::Lifecycle` - the ID is empty or Revizor did not accept the deletion
pub async fn delete(config: &AppConfig, container_id: &str) -> Result<(), Error> {
    let controller = LifecycleController::new(
        config.revizor_client()?,
        config.health_check_client()?,
        config.lifecycle_policy(),
    );

    controller.delete(container_id).await?;
    Ok(())
}
