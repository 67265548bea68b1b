//! HTTP request handlers.

mod health;
mod logs;
mod tasks;

pub use health::health_check;
pub use logs::{clear_history, list_logs};
pub use tasks::{delete_task, list_tasks, rerun_task, run_task, status, stop_task};
