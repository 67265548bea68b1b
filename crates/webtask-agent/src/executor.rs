//! Subprocess agent executor.
//!
//! [`CommandAgent`] spawns an agent process per run, sends it a `start`
//! message and then serves its `activate` / `log` requests until the
//! process exits.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::protocol::{next_message, send_json, Agent, AgentTools};
use crate::types::{AgentMessage, AgentOutcome, AgentRequest, HostMessage};

/// Runs an external agent program over a JSON line protocol.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    /// Program to execute, looked up on PATH if not absolute.
    program: String,

    args: Vec<String>,

    /// Additional environment variables.
    env_vars: Vec<(String, String)>,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandAgent {
    fn default() -> Self {
        Self::new("browser-agent")
    }
}

/// Send to the child if its stdin is still open.
async fn send(stdin: &mut Option<ChildStdin>, message: &HostMessage) {
    if let Some(writer) = stdin.as_mut() {
        if let Err(e) = send_json(writer, message).await {
            debug!(error = %e, "Agent stdin closed");
            *stdin = None;
        }
    }
}

#[async_trait]
impl Agent for CommandAgent {
    async fn run(
        &self,
        request: AgentRequest,
        tools: Arc<dyn AgentTools>,
    ) -> Result<AgentOutcome, AgentError> {
        info!(
            program = %self.program,
            model = %request.llm.model(),
            max_steps = request.max_steps,
            "Spawning agent process"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out run drops this future; the process must not outlive it.
            .kill_on_drop(true);
        for (key, value) in request.llm.env_vars() {
            cmd.env(key, value);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!(error = %e, program = %self.program, "Failed to spawn agent process");
            e
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::ProtocolError("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::ProtocolError("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::ProtocolError("Failed to get stderr".to_string()))?;

        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            warn!(stderr = %trimmed, "Agent stderr");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Error reading agent stderr");
                        break;
                    }
                }
            }
        });

        let mut stdin = Some(stdin);
        let start = HostMessage::Start {
            task: request.task.clone(),
            max_steps: request.max_steps,
            max_actions_per_step: request.max_actions_per_step,
            browser_endpoint: request.browser_endpoint.clone(),
        };
        if let Some(writer) = stdin.as_mut() {
            send_json(writer, &start).await?;
        }

        let mut lines = BufReader::new(stdout).lines();
        let mut steps = 0u32;
        let mut result: Option<(bool, Option<serde_json::Value>)> = None;
        let mut stop_sent = false;

        loop {
            let message = tokio::select! {
                biased;
                _ = request.cancel.cancelled(), if !stop_sent => {
                    stop_sent = true;
                    info!("Stop requested, asking agent to finish");
                    send(&mut stdin, &HostMessage::Stop).await;
                    continue;
                }
                message = next_message(&mut lines) => message?,
            };

            let Some(message) = message else {
                debug!(steps, "Agent stdout closed (EOF)");
                break;
            };
            debug!(message_type = message.kind(), "Agent message");

            match message {
                AgentMessage::Step { number, thought } => {
                    steps = steps.max(number);
                    let line = match thought {
                        Some(thought) => format!("Step {number}: {thought}"),
                        None => format!("Step {number}"),
                    };
                    tools.note(&line).await;
                }
                AgentMessage::Activate { id, reference } => {
                    let reply = match tools.activate(&reference).await {
                        Ok(()) => HostMessage::ActivateResult {
                            id,
                            ok: true,
                            error: None,
                            give_up: false,
                        },
                        Err(e) => HostMessage::ActivateResult {
                            id,
                            ok: false,
                            give_up: e.is_step_failure(),
                            error: Some(e.to_string()),
                        },
                    };
                    send(&mut stdin, &reply).await;
                }
                AgentMessage::Log { message } => tools.note(&message).await,
                AgentMessage::Result { success, summary } => {
                    info!(success, steps, "Agent reported result");
                    result = Some((success, summary));
                    // Nothing more to say to the agent.
                    stdin = None;
                }
            }
        }

        drop(stdin);
        let status = child.wait().await?;
        let exit_code = status.code().unwrap_or(-1);
        info!(exit_code, success = status.success(), "Agent process exited");

        if request.cancel.is_cancelled() {
            return Err(AgentError::Stopped);
        }
        if !status.success() {
            return Err(AgentError::ProcessError(format!(
                "{} exited with code {}",
                self.program, exit_code
            )));
        }

        match result {
            Some((true, summary)) => Ok(AgentOutcome { steps, summary }),
            Some((false, summary)) => Err(AgentError::Reported(
                summary
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "no summary".to_string()),
            )),
            None => Err(AgentError::ProtocolError(
                "agent exited without a result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_builder() {
        let agent = CommandAgent::new("python3")
            .with_args(["-m", "browser_agent"])
            .with_env("PYTHONUNBUFFERED", "1");

        assert_eq!(agent.program(), "python3");
        assert_eq!(agent.args, vec!["-m".to_string(), "browser_agent".to_string()]);
        assert_eq!(agent.env_vars.len(), 1);
    }

    #[test]
    fn test_default_executor() {
        assert_eq!(CommandAgent::default().program(), "browser-agent");
    }
}
