//! webtask Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - HTTP
//! - Browser drivers
//! - Runtime specifics
//!
//! All types here represent the task/activity domain shared by the
//! orchestrator and its collaborators.

pub mod error;
pub mod ids;
pub mod log;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{TaskId, UserId};
pub use log::LogEntry;
pub use status::TaskStatus;
pub use task::Task;
