//! Shared fixtures for the orchestrator tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use webtask_agent::testing::{ScriptStep, ScriptedAgent};
use webtask_agent::LlmSettings;
use webtask_browser::testing::FakeDriver;
use webtask_browser::BrowserLifecycleManager;
use webtask_core::{TaskId, TaskStatus};
use webtask_server::{
    ActivityLog, AgentExecutionPipeline, Config, InMemoryTaskStore, Scheduler, TaskStore,
};

pub struct Harness {
    pub scheduler: Scheduler,
    pub store: Arc<InMemoryTaskStore>,
    pub log: Arc<ActivityLog>,
    pub driver: FakeDriver,
    pub browser: Arc<BrowserLifecycleManager>,
    pub agent: Arc<ScriptedAgent>,
}

pub fn test_config() -> Config {
    Config {
        llm: LlmSettings {
            api_key: "test-key".to_string(),
            ..LlmSettings::default()
        },
        ..Config::default()
    }
}

pub fn harness(script: Vec<ScriptStep>) -> Harness {
    harness_with(script, test_config())
}

pub fn harness_with(script: Vec<ScriptStep>, config: Config) -> Harness {
    let store = Arc::new(InMemoryTaskStore::new());
    let log = Arc::new(ActivityLog::new());
    let driver = FakeDriver::new();
    let browser = Arc::new(BrowserLifecycleManager::new(
        Arc::new(driver.clone()),
        config.keep_browser_open,
    ));
    let agent = Arc::new(ScriptedAgent::new(script));
    let pipeline = Arc::new(AgentExecutionPipeline::new(
        store.clone(),
        log.clone(),
        browser.clone(),
        agent.clone(),
        Arc::new(config),
    ));
    let scheduler = Scheduler::new(store.clone(), log.clone(), pipeline);

    Harness {
        scheduler,
        store,
        log,
        driver,
        browser,
        agent,
    }
}

impl Harness {
    pub async fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.store.get_task(id).await.unwrap().map(|t| t.status)
    }

    /// Poll until the task reaches `status`.
    pub async fn wait_for_status(&self, id: &TaskId, status: TaskStatus) {
        for _ in 0..1000 {
            if self.status_of(id).await == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {id} never reached {status}");
    }

    /// Poll until the agent has been started `runs` times.
    pub async fn wait_for_agent_runs(&self, runs: usize) {
        for _ in 0..1000 {
            if self.agent.runs() >= runs {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("agent never reached {runs} runs");
    }

    pub async fn messages(&self) -> Vec<String> {
        self.log
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    pub async fn position(&self, needle: &str) -> Option<usize> {
        self.messages().await.iter().position(|m| m.contains(needle))
    }
}
