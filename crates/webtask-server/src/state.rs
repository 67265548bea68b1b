//! Shared application state.

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::scheduler::Scheduler;

/// State handed to every HTTP handler.
pub struct AppState {
    pub scheduler: Scheduler,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(scheduler: Scheduler, identity: Arc<dyn IdentityProvider>) -> Arc<Self> {
        Arc::new(Self {
            scheduler,
            identity,
        })
    }
}
