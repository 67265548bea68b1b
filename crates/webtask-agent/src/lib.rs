//! Agent execution for webtask
//!
//! The reasoning loop that drives the browser is an external collaborator.
//! This crate defines the seam ([`Agent`] / [`AgentTools`]) and ships one
//! implementation, [`CommandAgent`], which runs an agent as a subprocess and
//! talks to it with newline-delimited JSON.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webtask_agent::{Agent, AgentRequest, AgentTools, CommandAgent, LlmClient, LlmSettings};
//!
//! async fn run(tools: Arc<dyn AgentTools>) -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = LlmClient::new(LlmSettings {
//!         api_key: "key".to_string(),
//!         ..LlmSettings::default()
//!     })?;
//!     let agent = CommandAgent::new("browser-agent");
//!     let request = AgentRequest::new("Task: open example.com", llm);
//!
//!     let outcome = agent.run(request, tools).await?;
//!     println!("Finished after {} steps", outcome.steps);
//!     Ok(())
//! }
//! ```

mod error;
mod executor;
mod llm;
mod protocol;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{AgentError, ToolError};
pub use executor::CommandAgent;
pub use llm::{LlmClient, LlmSettings};
pub use protocol::{Agent, AgentTools};
pub use types::{AgentMessage, AgentOutcome, AgentRequest, HostMessage};
