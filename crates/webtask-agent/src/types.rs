//! Wire messages and request/outcome types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::LlmClient;

/// Message written by the agent process, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// The agent started a reasoning step.
    Step {
        number: u32,
        #[serde(default)]
        thought: Option<String>,
    },

    /// The agent wants an element clicked. Answered with
    /// [`HostMessage::ActivateResult`] carrying the same `id`.
    Activate { id: String, reference: String },

    /// Free-form progress line for the activity log.
    Log { message: String },

    /// Final message of a run.
    Result {
        success: bool,
        #[serde(default)]
        summary: Option<Value>,
    },
}

impl AgentMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Step { .. } => "step",
            Self::Activate { .. } => "activate",
            Self::Log { .. } => "log",
            Self::Result { .. } => "result",
        }
    }
}

/// Message written to the agent's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Start {
        task: String,
        max_steps: u32,
        max_actions_per_step: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        browser_endpoint: Option<String>,
    },

    ActivateResult {
        id: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Set when the agent should abandon the current step.
        #[serde(default)]
        give_up: bool,
    },

    Stop,
}

/// Everything an agent needs for one attempt.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Full prompt, including the execution preamble.
    pub task: String,
    pub max_steps: u32,
    pub max_actions_per_step: u32,
    pub llm: LlmClient,
    /// DevTools endpoint of the shared browser, when the driver exposes one.
    pub browser_endpoint: Option<String>,
    pub cancel: CancellationToken,
}

impl AgentRequest {
    pub fn new(task: impl Into<String>, llm: LlmClient) -> Self {
        Self {
            task: task.into(),
            max_steps: 25,
            max_actions_per_step: 4,
            llm,
            browser_endpoint: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_limits(mut self, max_steps: u32, max_actions_per_step: u32) -> Self {
        self.max_steps = max_steps;
        self.max_actions_per_step = max_actions_per_step;
        self
    }

    pub fn with_browser_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.browser_endpoint = endpoint;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutcome {
    /// Reasoning steps the agent reported.
    pub steps: u32,
    pub summary: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_agent_messages() {
        let msg: AgentMessage =
            serde_json::from_str(r#"{"type":"activate","id":"7","reference":"Next Page"}"#)
                .unwrap();
        assert_eq!(
            msg,
            AgentMessage::Activate {
                id: "7".to_string(),
                reference: "Next Page".to_string()
            }
        );

        let msg: AgentMessage = serde_json::from_str(r#"{"type":"step","number":2}"#).unwrap();
        assert_eq!(msg.kind(), "step");

        let msg: AgentMessage =
            serde_json::from_str(r#"{"type":"result","success":true,"summary":{"pages":3}}"#)
                .unwrap();
        assert_eq!(
            msg,
            AgentMessage::Result {
                success: true,
                summary: Some(json!({"pages": 3}))
            }
        );
    }

    #[test]
    fn test_unknown_message_type_is_rejected() {
        assert!(serde_json::from_str::<AgentMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_serialize_host_messages() {
        let start = HostMessage::Start {
            task: "Open example.com".to_string(),
            max_steps: 25,
            max_actions_per_step: 4,
            browser_endpoint: None,
        };
        assert_eq!(
            serde_json::to_value(&start).unwrap(),
            json!({
                "type": "start",
                "task": "Open example.com",
                "max_steps": 25,
                "max_actions_per_step": 4
            })
        );

        let reply = HostMessage::ActivateResult {
            id: "1".to_string(),
            ok: false,
            error: Some("not found".to_string()),
            give_up: true,
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"type": "activate_result", "id": "1", "ok": false, "error": "not found", "give_up": true})
        );

        assert_eq!(
            serde_json::to_value(HostMessage::Stop).unwrap(),
            json!({"type": "stop"})
        );
    }
}
