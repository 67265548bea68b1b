//! webtask orchestrator
//!
//! Runs natural-language browser tasks one at a time: admission control,
//! the per-attempt pipeline, the activity log and the HTTP API.

pub mod activity;
pub mod auth;
pub mod config;
pub mod http;
pub mod pipeline;
pub mod run_flag;
pub mod scheduler;
pub mod state;
pub mod store;

pub use activity::ActivityLog;
pub use auth::{AuthUser, IdentityProvider, StaticTokenIdentity};
pub use config::Config;
pub use pipeline::{AgentExecutionPipeline, AttemptOutcome, BrowserTools, ExecutionContext};
pub use run_flag::{RunFlag, RunLease};
pub use scheduler::{Accepted, Scheduler, SchedulerError, SchedulerStatus, StopAck};
pub use state::AppState;
pub use store::{InMemoryTaskStore, StoreError, TaskStore};
