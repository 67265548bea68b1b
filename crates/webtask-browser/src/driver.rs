//! Driver traits.
//!
//! These are the only browser operations the orchestrator needs. Navigation
//! and DOM inspection belong to the agent and are not modelled here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{BrowserError, Locator};

/// Options for starting a browser.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,

    /// Explicit browser executable. `None` lets the driver search for one.
    pub executable: Option<PathBuf>,
}

impl LaunchOptions {
    pub fn headless(headless: bool) -> Self {
        Self {
            headless,
            ..Self::default()
        }
    }
}

/// Starts browser instances.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserInstance>, BrowserError>;
}

/// A running browser.
#[async_trait]
pub trait BrowserInstance: Send + Sync {
    /// Create an isolated browsing context.
    async fn new_context(&self) -> Result<Arc<dyn BrowserContext>, BrowserError>;

    /// Terminate the browser.
    async fn close(&self) -> Result<(), BrowserError>;

    /// Remote-debugging endpoint other processes can attach to, if any.
    fn endpoint(&self) -> Option<String>;
}

/// An isolated browsing context (separate cookies/storage).
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn Page>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// A single page/tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Wait until `locator` matches an element, up to `timeout`.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError>;

    /// Scroll the first match of `locator` into the viewport.
    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), BrowserError>;

    /// Click the first match of `locator`.
    async fn click(&self, locator: &Locator) -> Result<(), BrowserError>;
}
