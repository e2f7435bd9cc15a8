//! Container lifecycle state machine.
//!
//! A `create` runs through `Creating → Polling → {Ready, RollingBack}` and,
//! after a rollback, either `Recreating` (back to `Creating`, at most once) or
//! `Failed`. Every step waits for the previous one to finish; nothing runs
//! concurrently.

use std::fmt;

use revizor_client::{validate_container_id, Container, CreateContainerPayload};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::errors::LifecycleError;
use crate::outputs::{report_container, OutputSink};
use crate::policy::LifecyclePolicy;
use crate::{ContainerProvisioner, ReadinessProbe};

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

/// States of a `create` operation, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Creating,
    Polling,
    Ready,
    RollingBack,
    Recreating,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Creating => "creating",
            LifecycleState::Polling => "polling",
            LifecycleState::Ready => "ready",
            LifecycleState::RollingBack => "rolling_back",
            LifecycleState::Recreating => "recreating",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A container that passed its readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub container: Container,
    pub hostname: String,
    /// Number of creation calls issued, 2 when the container was recreated
    pub creation_attempts: u32,
    /// Health checks needed by the final container
    pub health_checks: u32,
}

enum PollResult {
    Ready {
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_status: Option<u16>,
    },
}

/// Drives container creation, readiness polling, rollback and deletion.
pub struct LifecycleController<P, R> {
    provisioner: P,
    probe: R,
    policy: LifecyclePolicy,
}

impl<P, R> LifecycleController<P, R>
where
    P: ContainerProvisioner,
    R: ReadinessProbe,
{
    pub fn new(provisioner: P, probe: R, policy: LifecyclePolicy) -> Self {
        Self {
            provisioner,
            probe,
            policy,
        }
    }

    /// Creates a container and waits until it is ready for use.
    ///
    /// The container ID and hostname are reported to `sink` right after the
    /// creation call succeeds, before polling starts, so a handle exists even
    /// when the run fails later on.
    ///
    /// A container that does not become ready within the retry budget is
    /// deleted. When the policy allows it (last health check answered 404,
    /// first attempt) the whole creation is repeated once.
    ///
    /// # Errors
    ///
    /// * `LifecycleError::Client` - the creation call failed; never retried
    /// * `LifecycleError::Report` - the outputs could not be published; the
    ///   container is deleted before returning
    /// * `LifecycleError::RollbackFailed` - the unready container could not be deleted
    /// * `LifecycleError::PollingExhausted` - the container never became ready
    pub async fn create(
        &self,
        payload: &CreateContainerPayload,
        sink: &dyn OutputSink,
    ) -> Result<CreateOutcome, LifecycleError> {
        let mut creation_attempt = 1;

        loop {
            debug!(
                state = %LifecycleState::Creating,
                creation_attempt = creation_attempt,
                "Entering state"
            );
            info!(
                options = %serde_json::to_string(payload).unwrap_or_default(),
                "Creating the container"
            );

            let container = self.provisioner.create_container(payload).await?;
            let hostname = self.probe.hostname(&container);
            if let Err(e) = report_container(sink, &container, &hostname) {
                error!(
                    container_id = %container.id,
                    error = %e,
                    "Failed to publish container outputs, deleting the container"
                );
                self.roll_back(&container).await?;
                return Err(LifecycleError::Report(e));
            }

            match self.wait_until_ready(&container).await {
                PollResult::Ready { attempts } => {
                    debug!(
                        state = %LifecycleState::Ready,
                        container_id = %container.id,
                        "Entering state"
                    );
                    info!(
                        container_id = %container.id,
                        hostname = %hostname,
                        "The container is ready for use"
                    );
                    return Ok(CreateOutcome {
                        container,
                        hostname,
                        creation_attempts: creation_attempt,
                        health_checks: attempts,
                    });
                }
                PollResult::Exhausted {
                    attempts,
                    last_status,
                } => {
                    self.roll_back(&container).await?;

                    if self.policy.should_recreate(creation_attempt, last_status) {
                        warn!(
                            state = %LifecycleState::Recreating,
                            container_id = %container.id,
                            "The container could not be found, creating it again"
                        );
                        creation_attempt += 1;
                        continue;
                    }

                    error!(
                        state = %LifecycleState::Failed,
                        container_id = %container.id,
                        attempts = attempts,
                        last_status = ?last_status,
                        "The container did not become ready"
                    );
                    return Err(LifecycleError::PollingExhausted {
                        container_id: container.id,
                        attempts,
                        last_status,
                    });
                }
            }
        }
    }

    /// Deletes a container by ID.
    ///
    /// An empty or malformed ID is rejected without contacting the
    /// provisioning service.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Client` for an empty or malformed ID, a
    /// transport failure or any status other than `202 Accepted`.
    pub async fn delete(&self, container_id: &str) -> Result<(), LifecycleError> {
        validate_container_id(container_id)?;
        self.provisioner.delete_container(container_id).await?;
        Ok(())
    }

    async fn wait_until_ready(&self, container: &Container) -> PollResult {
        let budget = self.policy.budget;
        debug!(
            state = %LifecycleState::Polling,
            container_id = %container.id,
            max_attempts = budget.max_attempts(),
            delay_ms = budget.delay().as_millis() as u64,
            "Entering state"
        );

        let mut last_status = None;
        for attempt in 1..=budget.max_attempts() {
            let outcome = self.probe.check(container).await;
            if outcome.ready {
                return PollResult::Ready { attempts: attempt };
            }

            last_status = outcome.status_code;
            let cause = outcome
                .cause
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!(
                container_id = %container.id,
                attempt = attempt,
                max_attempts = budget.max_attempts(),
                status = ?outcome.status_code,
                error = %cause,
                "Health check failed"
            );

            if attempt < budget.max_attempts() {
                sleep(budget.delay()).await;
            }
        }

        PollResult::Exhausted {
            attempts: budget.max_attempts(),
            last_status,
        }
    }

    async fn roll_back(&self, container: &Container) -> Result<(), LifecycleError> {
        debug!(
            state = %LifecycleState::RollingBack,
            container_id = %container.id,
            "Entering state"
        );
        self.provisioner
            .delete_container(&container.id)
            .await
            .map_err(|source| LifecycleError::RollbackFailed {
                container_id: container.id.clone(),
                source,
            })
    }
}
