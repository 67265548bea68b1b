//! Activity log entries.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of the process-wide activity feed.
///
/// Entries are never mutated once created. Task ids are tagged inline in
/// the message text (`[Task <id>] ...`), not as a separate field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_display_format() {
        let entry = LogEntry {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            message: "[Task 1] status → running".to_string(),
        };
        assert_eq!(
            entry.to_string(),
            "[2024-05-01 09:30:00] [Task 1] status → running"
        );
    }
}
