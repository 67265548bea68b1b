//! Core domain errors.

use thiserror::Error;

use crate::TaskStatus;

/// Core domain errors for webtask.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },
}
