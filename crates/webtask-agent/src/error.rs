//! Error types for agent execution.

use thiserror::Error;
use webtask_browser::LocateError;

/// Errors that end an agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key configured for the language model.
    #[error("LLM API key is not configured")]
    MissingApiKey,

    /// Failed to spawn the agent process.
    #[error("Failed to spawn agent process: {0}")]
    SpawnError(#[from] std::io::Error),

    /// Agent process exited with an error.
    #[error("Agent process exited with error: {0}")]
    ProcessError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Protocol error during communication.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The agent finished but reported failure.
    #[error("Agent reported failure: {0}")]
    Reported(String),

    /// The run observed a stop request.
    #[error("Stopped on request")]
    Stopped,
}

/// Failure of a tool call made by the agent.
///
/// These go back to the agent as step failures; they do not end the run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("Stop requested")]
    Cancelled,
}

impl ToolError {
    /// Whether the agent should abandon the current step.
    pub fn is_step_failure(&self) -> bool {
        match self {
            Self::Locate(e) => e.is_step_failure(),
            Self::Cancelled => true,
        }
    }
}
