//! One agent attempt, from `running` to a terminal status.
//!
//! [`AgentExecutionPipeline::run`] never fails: every error ends as a
//! `failed` task and a log line, and the run lease is released on every
//! path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use webtask_agent::{Agent, AgentRequest, AgentTools, LlmClient, ToolError};
use webtask_browser::{BrowserLifecycleManager, ResilientLocator};
use webtask_core::{TaskId, TaskStatus};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::run_flag::RunLease;
use crate::store::TaskStore;

/// Instructions prepended to every task.
pub const PROMPT_PREAMBLE: &str = "\
You are an autonomous web-automation agent. Always think step by step, and before each action, explain your reasoning.
When you need to click an element, just specify its visible text (e.g., \"Submit\", \"Next Page\").
The browser will:
  1. Convert this text into a text= locator.
  2. Wait up to 5 seconds for it to appear.
  3. Scroll it into view.
  4. Click it.
If after three retries it's still not found, report failure.
At the end, generate a JSON summary of your actions and any fallback steps.";

/// Full prompt for a task description.
pub fn build_prompt(description: &str) -> String {
    format!("{PROMPT_PREAMBLE}\n\nTask: {description}")
}

/// Per-attempt parameters. Never persisted.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub task_id: TaskId,
    pub description: String,
    pub prompt: String,
    pub timeout: Duration,
    pub max_steps: u32,
    pub max_actions_per_step: u32,
}

impl ExecutionContext {
    pub fn new(task_id: TaskId, description: impl Into<String>, config: &Config) -> Self {
        let description = description.into();
        Self {
            task_id,
            prompt: build_prompt(&description),
            description,
            timeout: config.agent_timeout(),
            max_steps: config.agent_max_steps,
            max_actions_per_step: config.agent_max_actions,
        }
    }
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Done,
    TimedOut(Duration),
    Failed(String),
}

impl AttemptOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Done => TaskStatus::Done,
            Self::TimedOut(_) | Self::Failed(_) => TaskStatus::Failed,
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("status → done"),
            Self::TimedOut(bound) => write!(
                f,
                "status → failed (timeout after {}s)",
                bound.as_secs_f64()
            ),
            Self::Failed(reason) => write!(f, "status → failed ({reason})"),
        }
    }
}

/// Runs agent attempts against the shared browser.
pub struct AgentExecutionPipeline {
    store: Arc<dyn TaskStore>,
    log: Arc<ActivityLog>,
    browser: Arc<BrowserLifecycleManager>,
    agent: Arc<dyn Agent>,
    config: Arc<Config>,
}

impl AgentExecutionPipeline {
    pub fn new(
        store: Arc<dyn TaskStore>,
        log: Arc<ActivityLog>,
        browser: Arc<BrowserLifecycleManager>,
        agent: Arc<dyn Agent>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            log,
            browser,
            agent,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one attempt and release `lease` afterwards.
    pub async fn run(&self, lease: RunLease, task_id: TaskId, description: String) -> AttemptOutcome {
        let ctx = ExecutionContext::new(task_id, description, &self.config);
        info!(task_id = %ctx.task_id, generation = lease.generation(), "Attempt started");

        let outcome = self.attempt(&ctx, lease.cancel_token()).await;
        self.finish(&ctx, &outcome).await;

        lease.release();
        self.log.task(&ctx.task_id, "agent state reset").await;
        info!(task_id = %ctx.task_id, outcome = ?outcome, "Attempt finished");
        outcome
    }

    async fn attempt(&self, ctx: &ExecutionContext, cancel: CancellationToken) -> AttemptOutcome {
        if let Err(reason) = self.mark_running(&ctx.task_id).await {
            return AttemptOutcome::Failed(reason);
        }
        self.log.task(&ctx.task_id, "status → running").await;

        let llm = match LlmClient::new(self.config.llm.clone()) {
            Ok(llm) => llm,
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        };
        let session = match self.browser.acquire_session(self.config.headless).await {
            Ok(session) => session,
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        };
        self.log.task(&ctx.task_id, "browser session ready").await;

        let tools = Arc::new(BrowserTools::new(
            session.locator(self.config.locator_policy()),
            self.log.clone(),
            ctx.task_id.clone(),
            cancel.clone(),
        ));
        let request = AgentRequest::new(ctx.prompt.clone(), llm)
            .with_limits(ctx.max_steps, ctx.max_actions_per_step)
            .with_browser_endpoint(session.browser().endpoint())
            .with_cancel(cancel);

        self.log
            .task(
                &ctx.task_id,
                format!("Running agent (timeout={}s)", ctx.timeout.as_secs_f64()),
            )
            .await;
        let outcome = match tokio::time::timeout(ctx.timeout, self.agent.run(request, tools)).await
        {
            Ok(Ok(result)) => {
                debug!(task_id = %ctx.task_id, steps = result.steps, "Agent completed");
                AttemptOutcome::Done
            }
            Ok(Err(e)) => AttemptOutcome::Failed(e.to_string()),
            Err(_) => AttemptOutcome::TimedOut(ctx.timeout),
        };

        // Deferred release: the page stays visible until the browser shuts down.
        if let Err(e) = session.context.close().await {
            debug!(error = %e, "Scoped context close failed");
        }
        outcome
    }

    async fn mark_running(&self, task_id: &TaskId) -> Result<(), String> {
        let task = self
            .store
            .get_task(task_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("task {task_id} not found"))?;

        // A rerun has already moved the task to running.
        if task.status == TaskStatus::Running {
            return Ok(());
        }
        self.store
            .set_status(task_id, TaskStatus::Running)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("task {task_id} not found"))?;
        Ok(())
    }

    async fn finish(&self, ctx: &ExecutionContext, outcome: &AttemptOutcome) {
        match self.store.set_status(&ctx.task_id, outcome.status()).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(task_id = %ctx.task_id, "Task disappeared during attempt"),
            Err(e) => warn!(task_id = %ctx.task_id, error = %e, "Failed to record final status"),
        }
        self.log.task(&ctx.task_id, outcome).await;
    }
}

/// [`AgentTools`] over the attempt's browser page.
pub struct BrowserTools {
    locator: ResilientLocator,
    log: Arc<ActivityLog>,
    task_id: TaskId,
    cancel: CancellationToken,
}

impl BrowserTools {
    pub fn new(
        locator: ResilientLocator,
        log: Arc<ActivityLog>,
        task_id: TaskId,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            locator,
            log,
            task_id,
            cancel,
        }
    }
}

#[async_trait]
impl AgentTools for BrowserTools {
    async fn activate(&self, reference: &str) -> Result<(), ToolError> {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        match self.locator.activate(reference).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_step_failure() {
                    self.log.task(&self.task_id, &e).await;
                }
                Err(e.into())
            }
        }
    }

    async fn note(&self, message: &str) {
        if self.cancel.is_cancelled() {
            debug!(task_id = %self.task_id, note = message, "Dropping agent note after stop");
            return;
        }
        self.log.task(&self.task_id, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("Buy milk");
        assert!(prompt.starts_with("You are an autonomous web-automation agent."));
        assert!(prompt.ends_with("\n\nTask: Buy milk"));
    }

    #[test]
    fn test_execution_context_from_config() {
        let config = Config {
            agent_timeout_secs: 2,
            ..Config::default()
        };
        let ctx = ExecutionContext::new(TaskId::new("t1"), "Do X", &config);
        assert_eq!(ctx.timeout, Duration::from_secs(2));
        assert_eq!(ctx.max_steps, 25);
        assert_eq!(ctx.max_actions_per_step, 4);
        assert!(ctx.prompt.ends_with("Task: Do X"));
    }

    #[test]
    fn test_outcome_log_lines() {
        assert_eq!(AttemptOutcome::Done.to_string(), "status → done");
        assert_eq!(
            AttemptOutcome::TimedOut(Duration::from_secs(2)).to_string(),
            "status → failed (timeout after 2s)"
        );
        assert_eq!(
            AttemptOutcome::Failed("boom".to_string()).to_string(),
            "status → failed (boom)"
        );
        assert_eq!(AttemptOutcome::Done.status(), TaskStatus::Done);
    }
}
