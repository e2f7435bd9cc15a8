//! # Models
//!
//! Wire models exchanged with the Revizor provisioning service and the
//! per-container health-check endpoint.

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A provisioned test-environment container.
///
/// The ID is assigned by Revizor and is the only client-side state kept about
/// a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Container {
    /// The opaque container identifier
    #[serde(rename = "container_id")]
    pub id: String,
}

impl Container {
    /// Wraps a container ID after checking it with [`validate_container_id`].
    ///
    /// # Errors
    ///
    /// * `Error::EmptyContainerId` - `id` is empty or whitespace
    /// * `Error::InvalidContainerId` - `id` is not a single hostname label
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        validate_container_id(&id)?;
        Ok(Self { id })
    }

    /// The hostname the container is served under on the given platform domain.
    pub fn hostname(&self, platform_domain: &str) -> String {
        format!("{}.{}", self.id, platform_domain)
    }
}

/// Longest ID that still fits in a single DNS label.
const MAX_CONTAINER_ID_LEN: usize = 63;

/// Checks that `id` can be used both as a URL path segment and as the first
/// label of the container hostname.
///
/// # Errors
///
/// * `Error::EmptyContainerId` - `id` is empty or whitespace
/// * `Error::InvalidContainerId` - `id` contains anything but ASCII letters,
///   digits and `-`, or is longer than a DNS label
pub fn validate_container_id(id: &str) -> Result<(), Error> {
    if id.trim().is_empty() {
        return Err(Error::EmptyContainerId);
    }
    let valid = id.len() <= MAX_CONTAINER_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if !valid {
        return Err(Error::InvalidContainerId(id.to_string()));
    }
    Ok(())
}

/// Payload sent to `POST /api/containers/`.
///
/// Optional fields are only serialized when they carry a value; `skip_ui` is
/// always present. The `with_*` setters ignore empty strings, so a payload
/// built from unset configuration stays sparse.
///
/// # Examples
///
/// ```
/// use revizor_client::models::CreateContainerPayload;
///
/// let payload = CreateContainerPayload::new(true)
///     .with_fatmouse_branch("feature/api")
///     .with_scalr_branch("");
///
/// let json = serde_json::to_value(&payload).unwrap();
/// assert_eq!(json["fatmouse_branch"], "feature/api");
/// assert!(json.get("scalr_branch").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateContainerPayload {
    /// Whether the container is provisioned without the UI
    pub skip_ui: bool,

    /// Branch override for the API service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatmouse_branch: Option<String>,

    /// Branch override for the database service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalr_branch: Option<String>,

    /// Free-text notes shown next to the container in Revizor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Whether Revizor should refresh Python requirements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_python: Option<bool>,
}

impl CreateContainerPayload {
    pub fn new(skip_ui: bool) -> Self {
        Self {
            skip_ui,
            ..Default::default()
        }
    }

    pub fn with_fatmouse_branch(mut self, branch: impl Into<String>) -> Self {
        self.fatmouse_branch = non_empty(branch.into());
        self
    }

    pub fn with_scalr_branch(mut self, branch: impl Into<String>) -> Self {
        self.scalr_branch = non_empty(branch.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = non_empty(notes.into());
        self
    }

    pub fn with_update_python(mut self, update_python: Option<bool>) -> Self {
        self.update_python = update_python;
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Result of a single readiness poll against a container.
///
/// Produced once per attempt and never stored beyond the polling loop.
#[derive(Debug)]
pub struct HealthCheckOutcome {
    /// Whether the container answered with a healthy status
    pub ready: bool,
    /// Status code of the response, `None` when no response arrived
    pub status_code: Option<u16>,
    /// Why the attempt was not successful
    pub cause: Option<Error>,
}

impl HealthCheckOutcome {
    pub fn ready(status_code: u16) -> Self {
        Self {
            ready: true,
            status_code: Some(status_code),
            cause: None,
        }
    }

    pub fn not_ready(status_code: Option<u16>, cause: Error) -> Self {
        Self {
            ready: false,
            status_code,
            cause: Some(cause),
        }
    }

    /// True when the endpoint answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}
