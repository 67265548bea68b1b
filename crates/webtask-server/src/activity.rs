//! Process-wide activity feed.

use tokio::sync::RwLock;
use tracing::info;

use webtask_core::LogEntry;

/// Append-only log shared by the scheduler, the pipeline and the HTTP layer.
///
/// Readers get a snapshot and may miss an append that races with them.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and mirror it to tracing.
    pub async fn add(&self, message: impl Into<String>) {
        let entry = LogEntry::new(message);
        info!(target: "webtask::activity", "{}", entry.message);
        self.entries.write().await.push(entry);
    }

    /// Append a line tagged with a task id.
    pub async fn task(&self, task_id: impl std::fmt::Display, message: impl std::fmt::Display) {
        self.add(format!("[Task {task_id}] {message}")).await;
    }

    /// Entries in insertion order.
    pub async fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
