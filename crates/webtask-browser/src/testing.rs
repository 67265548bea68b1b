//! In-memory driver for tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    BrowserContext, BrowserDriver, BrowserError, BrowserInstance, LaunchOptions, Locator, Page,
};

/// A recorded page operation, keyed by the rendered locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCall {
    WaitFor(String),
    Scroll(String),
    Click(String),
}

/// Shared state behind every object a [`FakeDriver`] hands out.
#[derive(Debug, Default)]
pub struct FakeState {
    launches: AtomicUsize,
    closes: AtomicUsize,
    contexts: AtomicUsize,
    context_closes: AtomicUsize,
    fail_launch: AtomicBool,
    scroll_fails: AtomicBool,
    clicks_succeed_when_hidden: AtomicBool,
    visible: Mutex<HashSet<String>>,
    calls: Mutex<Vec<PageCall>>,
}

impl FakeState {
    /// Make the element rendered as `locator` present on every page.
    pub fn show(&self, locator: impl Into<String>) {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.into());
    }

    pub fn set_fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn set_scroll_fails(&self, fail: bool) {
        self.scroll_fails.store(fail, Ordering::SeqCst);
    }

    /// Let clicks on never-shown elements succeed (late-rendering pages).
    pub fn set_clicks_succeed_when_hidden(&self, succeed: bool) {
        self.clicks_succeed_when_hidden.store(succeed, Ordering::SeqCst);
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> usize {
        self.contexts.load(Ordering::SeqCst)
    }

    pub fn context_closes(&self) -> usize {
        self.context_closes.load(Ordering::SeqCst)
    }

    pub fn page_calls(&self) -> Vec<PageCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: PageCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn is_visible(&self, locator: &Locator) -> bool {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&locator.to_string())
    }
}

/// Driver whose browsers, contexts and pages live in memory.
#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    state: Arc<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Arc<FakeState> {
        &self.state
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(
        &self,
        _options: &LaunchOptions,
    ) -> Result<Arc<dyn BrowserInstance>, BrowserError> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(BrowserError::Launch("fake launch failure".to_string()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeInstance {
            state: self.state.clone(),
        }))
    }
}

struct FakeInstance {
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowserInstance for FakeInstance {
    async fn new_context(&self) -> Result<Arc<dyn BrowserContext>, BrowserError> {
        self.state.contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeContext {
            state: self.state.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn endpoint(&self) -> Option<String> {
        Some("ws://fake-browser/devtools".to_string())
    }
}

struct FakeContext {
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self) -> Result<Arc<dyn Page>, BrowserError> {
        Ok(Arc::new(FakePage {
            state: self.state.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.context_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
}

#[async_trait]
impl Page for FakePage {
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError> {
        self.state.record(PageCall::WaitFor(locator.to_string()));
        if self.state.is_visible(locator) {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(BrowserError::Timeout(timeout))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), BrowserError> {
        self.state.record(PageCall::Scroll(locator.to_string()));
        if self.state.scroll_fails.load(Ordering::SeqCst) {
            return Err(BrowserError::Driver("scroll failed".to_string()));
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        self.state.record(PageCall::Click(locator.to_string()));
        if self.state.is_visible(locator) || self.state.clicks_succeed_when_hidden.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(locator.to_string()))
        }
    }
}
