//! Error types for Revizor client operations.
//!
//! This module defines the error types that can occur when talking to the
//! Revizor provisioning service or to a container's health-check endpoint.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during Revizor client operations.
///
/// Every variant is terminal for the call that produced it. Whether a caller
/// treats it as fatal (creation, deletion) or as a single failed attempt
/// (health checks) is decided one level up.
///
/// ## Examples
///
/// ```rust,ignore
/// use revizor_client::Error;
///
/// match client.delete_container("abc123").await {
///     Ok(()) => println!("deleted"),
///     Err(Error::UnexpectedStatus { status, .. }) => eprintln!("rejected with {status}"),
///     Err(err) => eprintln!("other error: {err}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request URL could not be built.
    ///
    /// Raised when the configured base URL combined with a request path, or a
    /// derived container hostname, does not form a valid URL.
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request payload could not be encoded as JSON.
    #[error("Failed to serialize request payload: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request could not be assembled, e.g. a token with invalid header characters.
    #[error("Failed to build request: {0}")]
    InvalidRequest(#[source] reqwest::Error),

    /// The underlying HTTP client could not be initialized.
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The request never produced a response.
    ///
    /// Covers DNS failures, refused connections and timeouts.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a status code the operation does not accept.
    #[error("{operation} returned unexpected status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    /// The response body does not have the expected shape.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// A container operation was requested without a container ID.
    #[error("The container ID is not specified")]
    EmptyContainerId,

    /// A container ID is not a single hostname label.
    ///
    /// Container IDs become part of request paths and hostnames, so only
    /// ASCII letters, digits and `-` are accepted.
    #[error("Invalid container ID '{0}'")]
    InvalidContainerId(String),
}

impl Error {
    /// Returns the HTTP status carried by the error, if the service answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
