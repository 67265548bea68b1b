//! The agent seam and the line protocol spoken over a child's stdio.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{trace, warn};

use crate::error::{AgentError, ToolError};
use crate::types::{AgentMessage, AgentOutcome, AgentRequest};

/// Browser operations offered to a running agent.
#[async_trait]
pub trait AgentTools: Send + Sync {
    /// Click the element the agent refers to.
    async fn activate(&self, reference: &str) -> Result<(), ToolError>;

    /// Record a progress line from the agent.
    async fn note(&self, message: &str);
}

/// Runs a task to completion.
///
/// Implementations must watch `request.cancel` and return
/// [`AgentError::Stopped`] once it fires.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(
        &self,
        request: AgentRequest,
        tools: Arc<dyn AgentTools>,
    ) -> Result<AgentOutcome, AgentError>;
}

/// Write one message as a JSON line and flush.
pub(crate) async fn send_json<W, T>(writer: &mut W, message: &T) -> Result<(), AgentError>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let json = serde_json::to_string(message)?;
    trace!("Sending to stdin: {}", json);
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next message, skipping blank and unparseable lines.
///
/// Returns `None` at EOF. Cancel safe, so it can race a stop signal.
pub(crate) async fn next_message<R>(lines: &mut Lines<R>) -> Result<Option<AgentMessage>, AgentError>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        trace!("Raw stdout: {}", trimmed);

        match serde_json::from_str::<AgentMessage>(trimmed) {
            Ok(message) => return Ok(Some(message)),
            Err(e) => {
                warn!(error = %e, raw_len = trimmed.len(), "Failed to parse agent message");
            }
        }
    }
    Ok(None)
}
