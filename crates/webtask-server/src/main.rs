//! webtask server
//!
//! Launches the shared browser, serves the HTTP API and shuts the browser
//! down on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use webtask_agent::{CommandAgent, LlmSettings};
use webtask_browser::chromium::ChromiumDriver;
use webtask_browser::BrowserLifecycleManager;
use webtask_server::config::parse_api_tokens;
use webtask_server::{
    http, ActivityLog, AgentExecutionPipeline, AppState, Config, InMemoryTaskStore, Scheduler,
    StaticTokenIdentity,
};

/// How long a stopped attempt may take to wind down at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// webtask orchestrator server.
#[derive(Parser, Debug)]
#[command(name = "webtask-server", about = "Run natural-language browser tasks")]
struct Args {
    /// HTTP server address
    #[arg(long, env = "WEBTASK_HTTP_ADDR", default_value = "0.0.0.0:8000")]
    http_addr: String,

    /// Wall-clock budget per attempt, in seconds
    #[arg(long, env = "AGENT_TIMEOUT", default_value_t = 300)]
    agent_timeout: u64,

    #[arg(long, env = "AGENT_MAX_STEPS", default_value_t = 25)]
    agent_max_steps: u32,

    #[arg(long, env = "AGENT_MAX_ACTIONS", default_value_t = 4)]
    agent_max_actions: u32,

    /// Appearance wait before each click, in milliseconds
    #[arg(long, env = "LOCATE_WAIT_MS", default_value_t = 5000)]
    locate_wait_ms: u64,

    #[arg(long, env = "MAX_LOCATE_FAILURES", default_value_t = 3)]
    max_locate_failures: u32,

    #[arg(long, env = "BROWSER_HEADLESS", default_value_t = false, action = ArgAction::Set)]
    headless: bool,

    /// Keep the browser window open until the server exits
    #[arg(long, env = "KEEP_BROWSER_OPEN", default_value_t = true, action = ArgAction::Set)]
    keep_browser_open: bool,

    /// Agent program spawned per attempt
    #[arg(long, env = "AGENT_COMMAND", default_value = "browser-agent")]
    agent_command: String,

    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    gemini_api_key: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash-exp")]
    gemini_model: String,

    #[arg(long, env = "GEMINI_TEMPERATURE", default_value_t = 0.9)]
    gemini_temperature: f32,

    #[arg(long, env = "GEMINI_MAX_TOKENS", default_value_t = 512)]
    gemini_max_tokens: u32,

    #[arg(long, env = "GEMINI_TOP_P", default_value_t = 0.9)]
    gemini_top_p: f32,

    /// API tokens as `user:token` pairs, comma separated
    #[arg(long, env = "WEBTASK_API_TOKENS", default_value = "", hide_env_values = true)]
    api_tokens: String,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            http_addr: self.http_addr,
            agent_timeout_secs: self.agent_timeout,
            agent_max_steps: self.agent_max_steps,
            agent_max_actions: self.agent_max_actions,
            locate_wait_ms: self.locate_wait_ms,
            max_locate_failures: self.max_locate_failures,
            headless: self.headless,
            keep_browser_open: self.keep_browser_open,
            agent_command: self.agent_command,
            llm: LlmSettings {
                api_key: self.gemini_api_key,
                model: self.gemini_model,
                temperature: self.gemini_temperature,
                max_tokens: self.gemini_max_tokens,
                top_p: self.gemini_top_p,
            },
            api_tokens: parse_api_tokens(&self.api_tokens),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Arc::new(Args::parse().into_config());
    let http_addr: SocketAddr = config.http_addr.parse()?;

    if config.llm.api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set - every attempt will fail");
    }
    let identity = StaticTokenIdentity::new(config.api_tokens.clone());
    if identity.is_empty() {
        warn!("No API tokens configured - all /api requests will be rejected");
    }

    let browser = Arc::new(BrowserLifecycleManager::new(
        Arc::new(ChromiumDriver::new()),
        config.keep_browser_open,
    ));
    match browser.launch(config.headless).await {
        Ok(shared) => info!(endpoint = ?shared.endpoint(), "Browser ready"),
        Err(e) => warn!(error = %e, "Browser launch failed - will retry on first task"),
    }

    let store = Arc::new(InMemoryTaskStore::new());
    let log = Arc::new(ActivityLog::new());
    let agent = Arc::new(CommandAgent::new(config.agent_command.clone()));
    let pipeline = Arc::new(AgentExecutionPipeline::new(
        store.clone(),
        log.clone(),
        browser.clone(),
        agent,
        config.clone(),
    ));
    let scheduler = Scheduler::new(store, log, pipeline);
    let state = AppState::new(scheduler, Arc::new(identity));

    let listener = TcpListener::bind(http_addr).await?;
    info!(http_addr = %http_addr, "webtask server listening");

    axum::serve(listener, http::create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if state.scheduler.request_stop().await.is_ok() {
        info!("Stopped in-flight attempt");
    }
    if tokio::time::timeout(SHUTDOWN_GRACE, state.scheduler.wait_idle())
        .await
        .is_err()
    {
        warn!("Attempt still running at shutdown");
    }

    browser.shutdown().await?;
    info!("webtask server stopped");
    Ok(())
}
