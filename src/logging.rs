//! Diagnostic logging to stderr.
//!
//! Command output owns stdout, so everything tracing emits goes to stderr.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::error::{Result, VinfraError};

/// Environment variable with a tracing filter directive, e.g. `vinfra=debug`
pub const LOG_ENV: &str = "VINFRA_LOG";

const DEFAULT_FILTER: &str = "warn";
const DEBUG_FILTER: &str = "vinfra=debug,warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: String,
    pub ansi: bool,
}

impl LoggingConfig {
    /// `--debug` wins, then `VINFRA_LOG`, then `RUST_LOG`, then warnings only
    pub fn from_environment(debug: bool) -> Self {
        let filter = if debug {
            DEBUG_FILTER.to_string()
        } else {
            std::env::var(LOG_ENV)
                .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILTER.to_string())
        };

        LoggingConfig {
            filter,
            ansi: std::io::stderr().is_terminal(),
        }
    }

    pub fn init(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.filter).map_err(|e| {
            VinfraError::Validation(format!("Invalid log filter '{}': {}", self.filter, e))
        })?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(self.ansi)
            .try_init()
            .map_err(|e| VinfraError::Client(format!("Failed to initialize logging: {}", e)))
    }
}
