//! Health-check client for provisioned containers.
//!
//! Every container serves the platform API under its own hostname,
//! `{container_id}.{platform_domain}`. A container counts as ready once its
//! ping endpoint answers with one of the configured healthy status codes.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;

use crate::models::{validate_container_id, Container, HealthCheckOutcome};
use crate::Error;

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;

pub const DEFAULT_PLATFORM_DOMAIN: &str = "test-env.scalr.com";
pub const DEFAULT_PING_PATH: &str = "/api/iacp/v3/ping";
pub const DEFAULT_HEALTHY_STATUSES: [u16; 2] = [200, 204];
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Header used by some deployments to select the API profile.
pub const PROFILE_HEADER: &str = "Prefer";

/// Settings for probing a container's readiness.
#[derive(Debug)]
pub struct HealthCheckConfig {
    /// Domain the container hostnames live under
    pub platform_domain: String,
    /// URL scheme of the ping endpoint, `https` outside of tests
    pub scheme: String,
    /// Path of the ping endpoint on the container host
    pub ping_path: String,
    /// Status codes that mean the container is ready
    pub healthy_statuses: Vec<u16>,
    /// Bearer token for the platform API
    pub token: SecretString,
    /// Optional profile selected through the `Prefer` header
    pub profile: Option<String>,
    /// Per-request timeout of a single ping
    pub timeout: Duration,
}

impl HealthCheckConfig {
    /// Creates a configuration with the default domain, path and statuses.
    pub fn new(token: SecretString) -> Self {
        Self {
            platform_domain: DEFAULT_PLATFORM_DOMAIN.to_string(),
            scheme: "https".to_string(),
            ping_path: DEFAULT_PING_PATH.to_string(),
            healthy_statuses: DEFAULT_HEALTHY_STATUSES.to_vec(),
            token,
            profile: None,
            timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
        }
    }
}

/// Probes the ping endpoint of provisioned containers.
#[derive(Debug)]
pub struct HealthCheckClient {
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl HealthCheckClient {
    /// # Errors
    ///
    /// Returns `Error::HttpClient` if the HTTP client cannot be initialized.
    pub fn new(config: HealthCheckConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self::with_http_client(config, client))
    }

    /// Uses an existing `reqwest::Client`. `config.timeout` still applies to every ping.
    pub fn with_http_client(config: HealthCheckConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// The hostname the container is reachable under.
    pub fn hostname(&self, container: &Container) -> String {
        container.hostname(&self.config.platform_domain)
    }

    /// URL of the container's ping endpoint.
    ///
    /// # Errors
    ///
    /// * `Error::EmptyContainerId` or `Error::InvalidContainerId` - the ID
    ///   would not stay a single label of the platform domain
    /// * `Error::InvalidUrl` - the configured scheme, domain or path is malformed
    pub fn ping_url(&self, container: &Container) -> Result<Url, Error> {
        validate_container_id(&container.id)?;
        let raw = format!(
            "{}://{}{}",
            self.config.scheme,
            self.hostname(container),
            self.config.ping_path
        );
        Url::parse(&raw).map_err(|source| Error::InvalidUrl { url: raw, source })
    }

    /// Performs a single readiness probe.
    ///
    /// Never fails: transport errors and unhealthy statuses are reported as a
    /// not-ready outcome so the caller can count the attempt and move on.
    #[instrument(skip(self, container), fields(container_id = %container.id))]
    pub async fn check(&self, container: &Container) -> HealthCheckOutcome {
        let url = match self.ping_url(container) {
            Ok(url) => url,
            Err(e) => return HealthCheckOutcome::not_ready(None, e),
        };

        let mut request = self
            .client
            .get(url.clone())
            .timeout(self.config.timeout)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.config.token.expose_secret()),
            );
        if let Some(profile) = &self.config.profile {
            request = request.header(PROFILE_HEADER, format!("profile={profile}"));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                debug!(url = %url, "Ping request did not complete");
                return HealthCheckOutcome::not_ready(
                    None,
                    Error::Transport {
                        url: url.to_string(),
                        source,
                    },
                );
            }
        };

        let status = response.status().as_u16();
        if self.config.healthy_statuses.contains(&status) {
            debug!(status = status, "Ping succeeded");
            HealthCheckOutcome::ready(status)
        } else {
            HealthCheckOutcome::not_ready(
                Some(status),
                Error::UnexpectedStatus {
                    operation: "Health check",
                    status,
                },
            )
        }
    }
}
