//! Test doubles for agents and their tools.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{Agent, AgentError, AgentOutcome, AgentRequest, AgentTools, ToolError};

/// [`AgentTools`] that records calls instead of touching a browser.
#[derive(Debug, Default)]
pub struct RecordingTools {
    activations: Mutex<Vec<String>>,
    notes: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make activations of `reference` fail from now on.
    pub fn fail_on(&self, reference: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.into());
    }

    pub fn activations(&self) -> Vec<String> {
        self.activations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AgentTools for RecordingTools {
    async fn activate(&self, reference: &str) -> Result<(), ToolError> {
        self.activations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reference.to_string());
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(reference);
        if failing {
            Err(ToolError::Locate(webtask_browser::LocateError::Activation {
                reference: reference.to_string(),
                source: webtask_browser::BrowserError::ElementNotFound(reference.to_string()),
            }))
        } else {
            Ok(())
        }
    }

    async fn note(&self, message: &str) {
        self.notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// One scripted agent action.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Activate(String),
    Note(String),
    Sleep(Duration),
    /// Park until the test calls `notify_one`.
    WaitFor(Arc<Notify>),
    Fail(String),
    Panic,
}

/// [`Agent`] that plays back a fixed script on every run.
///
/// Cancellation is only observed between steps.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    script: Vec<ScriptStep>,
    prompts: Mutex<Vec<String>>,
    endpoints: Mutex<Vec<Option<String>>>,
}

impl ScriptedAgent {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Agent that finishes immediately.
    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn endpoints(&self) -> Vec<Option<String>> {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn runs(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn run(
        &self,
        request: AgentRequest,
        tools: Arc<dyn AgentTools>,
    ) -> Result<AgentOutcome, AgentError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.task.clone());
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.browser_endpoint.clone());

        let mut steps = 0;
        for step in &self.script {
            if request.cancel.is_cancelled() {
                return Err(AgentError::Stopped);
            }
            steps += 1;
            match step {
                ScriptStep::Activate(reference) => match tools.activate(reference).await {
                    Ok(()) => {}
                    Err(ToolError::Cancelled) => return Err(AgentError::Stopped),
                    Err(e) => tools.note(&format!("Step {steps} failed: {e}")).await,
                },
                ScriptStep::Note(message) => tools.note(message).await,
                ScriptStep::Sleep(duration) => tokio::time::sleep(*duration).await,
                ScriptStep::WaitFor(notify) => notify.notified().await,
                ScriptStep::Fail(message) => {
                    return Err(AgentError::ProcessError(message.clone()))
                }
                ScriptStep::Panic => panic!("scripted agent panic"),
            }
        }

        Ok(AgentOutcome {
            steps,
            summary: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmClient, LlmSettings};

    fn request() -> AgentRequest {
        let llm = LlmClient::new(LlmSettings {
            api_key: "k".to_string(),
            ..LlmSettings::default()
        })
        .unwrap();
        AgentRequest::new("Task: test", llm)
    }

    #[tokio::test]
    async fn test_scripted_agent_plays_script() {
        let agent = ScriptedAgent::new(vec![
            ScriptStep::Note("looking".to_string()),
            ScriptStep::Activate("Submit".to_string()),
        ]);
        let tools = Arc::new(RecordingTools::new());

        let outcome = agent.run(request(), tools.clone()).await.unwrap();

        assert_eq!(outcome.steps, 2);
        assert_eq!(tools.activations(), vec!["Submit".to_string()]);
        assert_eq!(agent.prompts(), vec!["Task: test".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_agent_stops_between_steps() {
        let agent = ScriptedAgent::new(vec![ScriptStep::Note("never".to_string())]);
        let tools = Arc::new(RecordingTools::new());
        let request = request();
        request.cancel.cancel();

        let err = agent.run(request, tools.clone()).await.unwrap_err();

        assert!(matches!(err, AgentError::Stopped));
        assert!(tools.notes().is_empty());
    }
}
