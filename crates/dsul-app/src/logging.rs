//! Logging initialisation for the binaries

use std::io::{self, IsTerminal};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the log subscriber
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install log subscriber: {0}")]
    Subscriber(String),
}

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(verbose: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Build the filter: `RUST_LOG` wins over the command line flags
pub fn filter(verbose: bool, debug: bool) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive(verbose, debug))
            .map_err(|e| LoggingError::Filter(e.to_string())),
    }
}

/// Install the global subscriber writing to stderr
pub fn init(verbose: bool, debug: bool) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose, debug)?)
        .with_target(debug)
        .with_writer(io::stderr)
        // No colour codes when stderr is redirected
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))
}
