use test_env_core::LifecycleError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Exit status of a successful command.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status when a command failed while talking to Revizor or a container.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status for usage and configuration errors.
pub const EXIT_USAGE: i32 = 2;

/// Errors that can occur in the test-env CLI application.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error occurred while reading the environment.
    ///
    /// This error is returned before any network activity when a required
    /// variable is missing or empty, or a tuning value cannot be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A container lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The HTTP clients could not be set up.
    #[error("Failed to initialize: {0}")]
    Runtime(#[from] revizor_client::Error),
}

impl Error {
    /// The process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => EXIT_USAGE,
            Error::Lifecycle(_) | Error::Runtime(_) => EXIT_FAILURE,
        }
    }
}
