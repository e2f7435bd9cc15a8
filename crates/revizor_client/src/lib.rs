//! Crate for interacting with the Revizor test-environment API.
//!
//! This crate provides a client for the Revizor provisioning service, which
//! creates and deletes test-environment containers, and a client for the
//! health-check endpoint every provisioned container exposes.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod health;
pub use health::{HealthCheckClient, HealthCheckConfig};

pub mod models;
pub use models::{validate_container_id, Container, CreateContainerPayload, HealthCheckOutcome};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Path of the container collection on the Revizor API.
pub const CONTAINERS_PATH: &str = "/api/containers/";

/// Creating a container can legitimately take minutes on the server side.
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(800);

const USER_AGENT: &str = concat!("test-env/", env!("CARGO_PKG_VERSION"));

/// A client for the Revizor provisioning service, authenticated with an API token.
#[derive(Debug)]
pub struct RevizorClient {
    base_url: Url,
    token: SecretString,
    create_timeout: Duration,
    client: reqwest::Client,
}

impl RevizorClient {
    /// Creates a client for the Revizor instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::HttpClient` if the HTTP client cannot be initialized.
    pub fn new(base_url: Url, token: SecretString) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self::with_http_client(base_url, token, client))
    }

    /// Creates a client that sends its requests through an existing `reqwest::Client`.
    pub fn with_http_client(base_url: Url, token: SecretString, client: reqwest::Client) -> Self {
        Self {
            base_url,
            token,
            create_timeout: DEFAULT_CREATE_TIMEOUT,
            client,
        }
    }

    /// Overrides the timeout applied to the container creation call.
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Builds an authenticated request against the Revizor API.
    ///
    /// The `Authorization: Token <token>` header is always set. When a payload
    /// is given it is encoded as JSON and the content type is set accordingly;
    /// otherwise the body is left empty. No network I/O happens here.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method of the request
    /// * `path` - Path relative to the configured base URL, e.g. `/api/containers/`
    /// * `payload` - Optional request body
    ///
    /// # Errors
    ///
    /// * `Error::InvalidUrl` - the base URL and path do not form a valid URL
    /// * `Error::Serialization` - the payload cannot be encoded as JSON
    /// * `Error::InvalidRequest` - the request cannot be assembled
    pub fn build_request<T>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&T>,
    ) -> Result<reqwest::Request, Error>
    where
        T: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut builder = self.client.request(method, url).header(
            AUTHORIZATION,
            format!("Token {}", self.token.expose_secret()),
        );

        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload).map_err(Error::Serialization)?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        builder.build().map_err(Error::InvalidRequest)
    }

    /// Creates a new container and returns its identifier.
    ///
    /// # Errors
    ///
    /// Every failure is fatal for the invocation:
    /// * `Error::Transport` - no response, including the creation timeout
    /// * `Error::UnexpectedStatus` - any status other than `201 Created`
    /// * `Error::InvalidResponse` - the body is not `{"container_id": "<id>"}`
    #[instrument(skip(self, payload))]
    pub async fn create_container(
        &self,
        payload: &CreateContainerPayload,
    ) -> Result<Container, Error> {
        let mut request = self.build_request(Method::POST, CONTAINERS_PATH, Some(payload))?;
        *request.timeout_mut() = Some(self.create_timeout);

        let url = request.url().to_string();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %body,
                "Revizor rejected the container creation request"
            );
            return Err(Error::UnexpectedStatus {
                operation: "Container creation",
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| Error::Transport { url, source })?;
        if body.is_empty() {
            return Err(Error::InvalidResponse(
                "the response body is empty".to_string(),
            ));
        }

        let container: Container = serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        let container = Container::new(container.id).map_err(|e| {
            Error::InvalidResponse(format!("the response carries an unusable container ID: {e}"))
        })?;

        info!(container_id = %container.id, "The container has been created");
        Ok(container)
    }

    /// Deletes a container.
    ///
    /// Only `202 Accepted` counts as success. Deleting an ID the service no
    /// longer knows is reported with whatever status Revizor returns.
    ///
    /// # Errors
    ///
    /// * `Error::EmptyContainerId` - `container_id` is empty; no request is sent
    /// * `Error::InvalidContainerId` - `container_id` is not a plain ID; no request is sent
    /// * `Error::Transport` - no response
    /// * `Error::UnexpectedStatus` - any status other than `202 Accepted`
    #[instrument(skip(self), fields(container_id = %container_id))]
    pub async fn delete_container(&self, container_id: &str) -> Result<(), Error> {
        validate_container_id(container_id)?;

        info!("Deleting the container");
        let path = format!("{CONTAINERS_PATH}{container_id}/");
        let request = self.build_request::<()>(Method::DELETE, &path, None)?;

        let url = request.url().to_string();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| Error::Transport { url, source })?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            debug!(status = status.as_u16(), "Unexpected deletion status");
            return Err(Error::UnexpectedStatus {
                operation: "Container deletion",
                status: status.as_u16(),
            });
        }

        info!("The container was successfully deleted");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|source| Error::InvalidUrl { url: raw, source })
    }
}
