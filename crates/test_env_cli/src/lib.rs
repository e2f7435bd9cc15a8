//! test-env CLI library exports for integration testing.
//!
//! This module exposes configuration loading and the command implementations
//! behind the `test-env` binary.

pub mod commands;
pub mod config;
pub mod errors;
