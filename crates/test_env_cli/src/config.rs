//! Configuration for the test-env CLI.
//!
//! All configuration comes from environment variables and is read once at
//! startup. Missing or empty required values, and tuning values that cannot be
//! parsed, fail before any network activity.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use revizor_client::health::{
    DEFAULT_HEALTHY_STATUSES, DEFAULT_HEALTH_CHECK_TIMEOUT, DEFAULT_PING_PATH,
    DEFAULT_PLATFORM_DOMAIN,
};
use revizor_client::{
    CreateContainerPayload, HealthCheckClient, HealthCheckConfig, RevizorClient,
    DEFAULT_CREATE_TIMEOUT,
};
use secrecy::{ExposeSecret, SecretString};
use test_env_core::policy::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use test_env_core::{CompositeSink, GithubOutputFile, LifecyclePolicy, RetryBudget, StdoutSink};
use tracing::debug;
use url::Url;

use crate::errors::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

pub const REVIZOR_URL_VAR: &str = "REVIZOR_URL";
pub const REVIZOR_TOKEN_VAR: &str = "REVIZOR_TOKEN";
pub const SCALR_TOKEN_VAR: &str = "SCALR_TOKEN";

/// Settings of a single CLI invocation.
#[derive(Debug)]
pub struct AppConfig {
    /// Base URL of the Revizor provisioning service
    pub revizor_url: Url,
    pub revizor_token: SecretString,
    /// Token for the platform API served by each container
    pub platform_token: SecretString,

    /// Branch of the API sources to deploy (`API_BRANCH`)
    pub api_branch: Option<String>,
    /// Branch of the database sources to deploy (`DB_BRANCH`)
    pub db_branch: Option<String>,
    /// Python requirements switch (`PY_REQ`)
    pub python_requirements: Option<String>,
    /// Upstream identifier recorded in the container notes (`UPSTREAM_ID`)
    pub upstream_id: Option<String>,

    pub platform_domain: String,
    pub health_check_scheme: String,
    pub health_check_path: String,
    pub healthy_statuses: Vec<u16>,
    pub health_check_timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub create_timeout: Duration,
    pub retry_on_not_found: bool,
    /// Profile selected through the `Prefer` header of health checks
    pub profile: Option<String>,
    /// GitHub Actions output file (`GITHUB_OUTPUT`)
    pub github_output: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// Required environment variables:
    /// - `REVIZOR_URL`: base URL of the provisioning service
    /// - `REVIZOR_TOKEN`: provisioning service API token
    /// - `SCALR_TOKEN`: platform API token used for health checks
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a required variable is missing or empty,
    /// or an optional tuning variable holds an invalid value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated exactly like absent ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key)
                .ok_or_else(|| Error::Config(format!("No required environment variable: {key}")))
        };

        let revizor_url = required(REVIZOR_URL_VAR)?;
        let revizor_url = Url::parse(&revizor_url).map_err(|e| {
            Error::Config(format!("{REVIZOR_URL_VAR} is not a valid URL '{revizor_url}': {e}"))
        })?;
        let revizor_token = SecretString::from(required(REVIZOR_TOKEN_VAR)?);
        let platform_token = SecretString::from(required(SCALR_TOKEN_VAR)?);

        let max_attempts = parse_or(
            var("TE_HEALTH_CHECK_MAX_ATTEMPTS"),
            "TE_HEALTH_CHECK_MAX_ATTEMPTS",
            DEFAULT_MAX_ATTEMPTS,
        )?;
        if max_attempts == 0 {
            return Err(Error::Config(
                "TE_HEALTH_CHECK_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let healthy_statuses = match var("TE_HEALTHY_STATUSES") {
            Some(value) => parse_statuses(&value)?,
            None => DEFAULT_HEALTHY_STATUSES.to_vec(),
        };

        let health_check_scheme =
            var("TE_HEALTH_CHECK_SCHEME").unwrap_or_else(|| "https".to_string());
        if health_check_scheme != "https" && health_check_scheme != "http" {
            return Err(Error::Config(format!(
                "TE_HEALTH_CHECK_SCHEME must be 'http' or 'https', got '{health_check_scheme}'"
            )));
        }

        let config = Self {
            revizor_url,
            revizor_token,
            platform_token,
            api_branch: var("API_BRANCH"),
            db_branch: var("DB_BRANCH"),
            python_requirements: var("PY_REQ"),
            upstream_id: var("UPSTREAM_ID"),
            platform_domain: var("TE_PLATFORM_DOMAIN")
                .unwrap_or_else(|| DEFAULT_PLATFORM_DOMAIN.to_string()),
            health_check_scheme,
            health_check_path: var("TE_HEALTH_CHECK_PATH")
                .unwrap_or_else(|| DEFAULT_PING_PATH.to_string()),
            healthy_statuses,
            health_check_timeout: parse_secs(
                var("TE_HEALTH_CHECK_TIMEOUT_SECS"),
                "TE_HEALTH_CHECK_TIMEOUT_SECS",
                DEFAULT_HEALTH_CHECK_TIMEOUT,
            )?,
            max_attempts,
            retry_delay: parse_secs(
                var("TE_HEALTH_CHECK_DELAY_SECS"),
                "TE_HEALTH_CHECK_DELAY_SECS",
                DEFAULT_RETRY_DELAY,
            )?,
            create_timeout: parse_secs(
                var("TE_CREATE_TIMEOUT_SECS"),
                "TE_CREATE_TIMEOUT_SECS",
                DEFAULT_CREATE_TIMEOUT,
            )?,
            retry_on_not_found: match var("TE_RETRY_ON_NOT_FOUND") {
                Some(value) => parse_bool(&value, "TE_RETRY_ON_NOT_FOUND")?,
                None => true,
            },
            profile: var("SCALR_PROFILE"),
            github_output: var("GITHUB_OUTPUT").map(PathBuf::from),
        };

        debug!(
            revizor_url = %config.revizor_url,
            platform_domain = %config.platform_domain,
            max_attempts = config.max_attempts,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Builds the body of the container creation request.
    ///
    /// The UI is never deployed. Branches and notes are only sent when set;
    /// `update_python` is sent whenever `PY_REQ` is set and is true only for
    /// the value `yes`.
    pub fn creation_payload(&self) -> CreateContainerPayload {
        let mut payload = CreateContainerPayload::new(true).with_update_python(
            self.python_requirements
                .as_deref()
                .map(|value| value == "yes"),
        );
        if let Some(branch) = &self.api_branch {
            payload = payload.with_fatmouse_branch(branch.as_str());
        }
        if let Some(branch) = &self.db_branch {
            payload = payload.with_scalr_branch(branch.as_str());
        }
        if let Some(upstream_id) = &self.upstream_id {
            payload = payload.with_notes(format!("Provider upstream #{upstream_id}"));
        }
        payload
    }

    /// # Errors
    ///
    /// Returns `Error::Runtime` if the HTTP client cannot be initialized.
    pub fn revizor_client(&self) -> Result<RevizorClient, Error> {
        Ok(
            RevizorClient::new(self.revizor_url.clone(), copy_secret(&self.revizor_token))?
                .with_create_timeout(self.create_timeout),
        )
    }

    pub fn health_check_config(&self) -> HealthCheckConfig {
        HealthCheckConfig {
            platform_domain: self.platform_domain.clone(),
            scheme: self.health_check_scheme.clone(),
            ping_path: self.health_check_path.clone(),
            healthy_statuses: self.healthy_statuses.clone(),
            token: copy_secret(&self.platform_token),
            profile: self.profile.clone(),
            timeout: self.health_check_timeout,
        }
    }

    /// # Errors
    ///
    /// Returns `Error::Runtime` if the HTTP client cannot be initialized.
    pub fn health_check_client(&self) -> Result<HealthCheckClient, Error> {
        Ok(HealthCheckClient::new(self.health_check_config())?)
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy::new(
            RetryBudget::new(self.max_attempts, self.retry_delay),
            self.retry_on_not_found,
        )
    }

    /// Outputs always go to stdout, and to the GitHub Actions file when set.
    pub fn output_sink(&self) -> CompositeSink {
        let sink = CompositeSink::new().with_sink(StdoutSink);
        match &self.github_output {
            Some(path) => sink.with_sink(GithubOutputFile::new(path)),
            None => sink,
        }
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, Error> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value '{value}'"))),
        None => Ok(default),
    }
}

fn parse_secs(value: Option<String>, key: &str, default: Duration) -> Result<Duration, Error> {
    parse_or(value, key, default.as_secs()).map(Duration::from_secs)
}

fn parse_bool(value: &str, key: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key} has an invalid value '{value}'"))),
    }
}

fn parse_statuses(value: &str) -> Result<Vec<u16>, Error> {
    let statuses = value
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| match code.parse::<u16>() {
            Ok(status) if (100..=599).contains(&status) => Ok(status),
            _ => Err(Error::Config(format!(
                "TE_HEALTHY_STATUSES contains an invalid status code '{code}'"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if statuses.is_empty() {
        return Err(Error::Config(
            "TE_HEALTHY_STATUSES must list at least one status code".to_string(),
        ));
    }
    Ok(statuses)
}
