//! # Test Env Core
//!
//! This crate provides the lifecycle logic for ephemeral test-environment
//! containers: it creates a container through the Revizor provisioning
//! service, polls the container's health endpoint until it is ready, and
//! deletes it again when it never becomes ready.
//!
//! ## Main Components
//!
//! - [`LifecycleController`]: the create/delete state machine
//! - [`LifecyclePolicy`] and [`RetryBudget`]: polling budget and recreate rule
//! - [`ContainerProvisioner`] and [`ReadinessProbe`]: seams to the two HTTP services
//! - [`OutputSink`]: where container ID and hostname are published
//!
//! ## Example
//!
//! ```rust,no_run
//! use revizor_client::{CreateContainerPayload, HealthCheckClient, HealthCheckConfig, RevizorClient};
//! use secrecy::SecretString;
//! use test_env_core::{LifecycleController, LifecyclePolicy, StdoutSink};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let revizor = RevizorClient::new(
//!     Url::parse("https://revizor.example.com")?,
//!     SecretString::from("revizor-token".to_string()),
//! )?;
//! let health = HealthCheckClient::new(HealthCheckConfig::new(SecretString::from(
//!     "platform-token".to_string(),
//! )))?;
//!
//! let controller = LifecycleController::new(revizor, health, LifecyclePolicy::default());
//! let outcome = controller
//!     .create(&CreateContainerPayload::new(true), &StdoutSink)
//!     .await?;
//! println!("{} is ready", outcome.hostname);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use revizor_client::{
    Container, CreateContainerPayload, HealthCheckClient, HealthCheckOutcome, RevizorClient,
};

pub mod controller;
pub use controller::{CreateOutcome, LifecycleController, LifecycleState};

pub mod errors;
pub use errors::LifecycleError;

pub mod outputs;
pub use outputs::{report_container, CompositeSink, GithubOutputFile, OutputSink, StdoutSink};

pub mod policy;
pub use policy::{LifecyclePolicy, RetryBudget};

/// Creates and deletes containers on the provisioning service.
#[async_trait]
pub trait ContainerProvisioner: Send + Sync {
    /// Creates a container; any failure is fatal for the invocation.
    async fn create_container(
        &self,
        payload: &CreateContainerPayload,
    ) -> Result<Container, revizor_client::Error>;

    /// Deletes a container; only an accepted deletion counts as success.
    async fn delete_container(&self, container_id: &str) -> Result<(), revizor_client::Error>;
}

/// Checks whether a container is ready for use.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Hostname the container is served under.
    fn hostname(&self, container: &Container) -> String;

    /// Runs one readiness check. Failures are part of the outcome, not errors.
    async fn check(&self, container: &Container) -> HealthCheckOutcome;
}

#[async_trait]
impl ContainerProvisioner for RevizorClient {
    async fn create_container(
        &self,
        payload: &CreateContainerPayload,
    ) -> Result<Container, revizor_client::Error> {
        RevizorClient::create_container(self, payload).await
    }

    async fn delete_container(&self, container_id: &str) -> Result<(), revizor_client::Error> {
        RevizorClient::delete_container(self, container_id).await
    }
}

#[async_trait]
impl ReadinessProbe for HealthCheckClient {
    fn hostname(&self, container: &Container) -> String {
        HealthCheckClient::hostname(self, container)
    }

    async fn check(&self, container: &Container) -> HealthCheckOutcome {
        HealthCheckClient::check(self, container).await
    }
}
