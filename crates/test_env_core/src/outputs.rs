//! Outputs handed back to the invoking automation pipeline.
//!
//! Outputs are `name=value` lines. They are printed on stdout, which carries
//! nothing else, and appended to the file named by `GITHUB_OUTPUT` when the
//! tool runs inside a GitHub Actions job.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use revizor_client::Container;
use tracing::debug;

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod tests;

pub const CONTAINER_ID_OUTPUT: &str = "container_id";
pub const HOSTNAME_OUTPUT: &str = "hostname";

/// Destination for structured outputs.
pub trait OutputSink: Send + Sync {
    /// Publishes a single named output.
    fn set_output(&self, name: &str, value: &str) -> io::Result<()>;
}

/// Writes `name=value` lines to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{name}={value}")?;
        stdout.flush()
    }
}

/// Appends `name=value` lines to a GitHub Actions output file.
#[derive(Debug)]
pub struct GithubOutputFile {
    path: PathBuf,
}

impl GithubOutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputSink for GithubOutputFile {
    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{name}={value}")
    }
}

/// Fans every output out to several sinks, stopping at the first failure.
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Box<dyn OutputSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl OutputSink for CompositeSink {
    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        for sink in &self.sinks {
            sink.set_output(name, value)?;
        }
        Ok(())
    }
}

/// Publishes the ID and hostname of a freshly created container.
pub fn report_container(
    sink: &dyn OutputSink,
    container: &Container,
    hostname: &str,
) -> io::Result<()> {
    debug!(
        container_id = %container.id,
        hostname = hostname,
        "Publishing container outputs"
    );
    sink.set_output(CONTAINER_ID_OUTPUT, &container.id)?;
    sink.set_output(HOSTNAME_OUTPUT, hostname)
}
