//! Error types for browser operations.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a browser driver or the lifecycle manager.
#[derive(Debug, Error, Clone)]
pub enum BrowserError {
    /// The browser process could not be started.
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// No shared browser exists yet.
    #[error("Browser has not been launched")]
    NotLaunched,

    /// The element could not be found on the page.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A bounded wait elapsed.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Any other driver/protocol failure.
    #[error("Driver error: {0}")]
    Driver(String),
}

/// Failure of a single element activation.
#[derive(Debug, Error, Clone)]
pub enum LocateError {
    /// The final click failed.
    #[error("Failed to activate '{reference}': {source}")]
    Activation {
        reference: String,
        #[source]
        source: BrowserError,
    },

    /// The same reference failed too many times in a row.
    #[error("Giving up on '{reference}' after {attempts} consecutive failures: {source}")]
    StepFailed {
        reference: String,
        attempts: u32,
        #[source]
        source: BrowserError,
    },
}

impl LocateError {
    /// The reference the caller tried to activate.
    pub fn reference(&self) -> &str {
        match self {
            Self::Activation { reference, .. } | Self::StepFailed { reference, .. } => reference,
        }
    }

    /// Whether the agent should stop retrying this step.
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::StepFailed { .. })
    }
}
