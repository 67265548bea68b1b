//! Single-flight admission flag.
//!
//! At most one attempt holds the flag. Admission hands out a [`RunLease`];
//! the attempt's cleanup releases it. Each admission carries a generation
//! so a cleanup never clears a flag that a later admission set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use webtask_core::TaskId;

#[derive(Debug)]
struct ActiveRun {
    generation: u64,
    task_id: Option<TaskId>,
    cancel: CancellationToken,
}

/// Process-wide "an attempt is in progress" flag.
#[derive(Debug, Default)]
pub struct RunFlag {
    slot: Mutex<Option<ActiveRun>>,
    next_generation: AtomicU64,
}

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag if it is clear.
    pub fn try_acquire(self: &Arc<Self>) -> Option<RunLease> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        *slot = Some(ActiveRun {
            generation,
            task_id: None,
            cancel: cancel.clone(),
        });
        debug!(generation, "Run flag set");
        Some(RunLease {
            flag: Arc::clone(self),
            generation,
            cancel,
            released: false,
        })
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Task of the attempt currently holding the flag.
    pub fn active_task(&self) -> Option<TaskId> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|run| run.task_id.clone())
    }

    /// Clear the flag and signal the holder to stop.
    ///
    /// Returns the stopped task, or `None` if nothing was running.
    pub fn request_stop(&self) -> Option<Option<TaskId>> {
        let run = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        run.cancel.cancel();
        debug!(generation = run.generation, "Run flag cleared by stop request");
        Some(run.task_id)
    }

    fn bind(&self, generation: u64, task_id: TaskId) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = slot.as_mut().filter(|run| run.generation == generation) {
            run.task_id = Some(task_id);
        }
    }

    fn release(&self, generation: u64) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|run| run.generation) == Some(generation) {
            *slot = None;
            debug!(generation, "Run flag cleared");
            true
        } else {
            false
        }
    }
}

/// Proof of admission. Releasing (or dropping) it clears the flag.
#[derive(Debug)]
pub struct RunLease {
    flag: Arc<RunFlag>,
    generation: u64,
    cancel: CancellationToken,
    released: bool,
}

impl RunLease {
    /// Record which task this attempt runs.
    pub fn bind(&self, task_id: TaskId) {
        self.flag.bind(self.generation, task_id);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fires when a stop is requested for this attempt.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Clear the flag if it still belongs to this attempt.
    pub fn release(mut self) -> bool {
        self.released = true;
        self.flag.release(self.generation)
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        if !self.released {
            self.flag.release(self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight() {
        let flag = Arc::new(RunFlag::new());
        let lease = flag.try_acquire().unwrap();
        assert!(flag.is_running());
        assert!(flag.try_acquire().is_none());

        assert!(lease.release());
        assert!(!flag.is_running());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_drop_releases() {
        let flag = Arc::new(RunFlag::new());
        {
            let _lease = flag.try_acquire().unwrap();
        }
        assert!(!flag.is_running());
    }

    #[test]
    fn test_stop_cancels_and_clears() {
        let flag = Arc::new(RunFlag::new());
        let lease = flag.try_acquire().unwrap();
        lease.bind(TaskId::new("t1"));
        let token = lease.cancel_token();

        assert_eq!(flag.active_task(), Some(TaskId::new("t1")));
        assert_eq!(flag.request_stop(), Some(Some(TaskId::new("t1"))));
        assert!(token.is_cancelled());
        assert!(!flag.is_running());
        assert_eq!(flag.request_stop(), None);
    }

    #[test]
    fn test_stale_lease_does_not_clear_newer_run() {
        let flag = Arc::new(RunFlag::new());
        let old = flag.try_acquire().unwrap();
        flag.request_stop();

        let new = flag.try_acquire().unwrap();
        assert!(new.generation() > old.generation());

        old.bind(TaskId::new("stale"));
        assert_eq!(flag.active_task(), None);

        assert!(!old.release());
        assert!(flag.is_running());
        assert!(new.release());
    }
}
