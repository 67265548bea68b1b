//! Shared browser lifecycle.
//!
//! The process owns at most one live browser. Task attempts borrow it
//! through [`ScopedSession`]s and never close it; only
//! [`BrowserLifecycleManager::shutdown`] does.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    BrowserContext, BrowserDriver, BrowserError, BrowserInstance, KeepOpenGate, LaunchOptions,
    LocatorPolicy, Page, ResilientLocator,
};

/// Borrowed handle to the shared browser.
#[derive(Clone)]
pub struct SharedBrowser {
    instance: Arc<dyn BrowserInstance>,
    gate: KeepOpenGate,
}

impl SharedBrowser {
    fn new(instance: Arc<dyn BrowserInstance>, gate: KeepOpenGate) -> Self {
        Self { instance, gate }
    }

    pub fn gate(&self) -> &KeepOpenGate {
        &self.gate
    }

    /// Release the keep-open gate so [`close`](Self::close) can finish.
    pub fn allow_close(&self) {
        self.gate.allow_close();
    }

    pub fn endpoint(&self) -> Option<String> {
        self.instance.endpoint()
    }

    /// Close the browser once the keep-open gate is released.
    ///
    /// Blocks indefinitely while the gate is held.
    pub async fn close(&self) -> Result<(), BrowserError> {
        if self.gate.is_held() {
            info!("Browser close deferred until the keep-open gate is released");
        }
        self.gate.released().await;
        self.instance.close().await
    }
}

/// Browsing context whose `close` is suppressed.
///
/// The user gets to see the final browser state after an attempt; the
/// context goes away with the browser at shutdown.
pub struct ScopedContext {
    inner: Arc<dyn BrowserContext>,
}

impl ScopedContext {
    /// No-op. The context stays open until the shared browser shuts down.
    pub async fn close(&self) -> Result<(), BrowserError> {
        debug!("Scoped context close suppressed");
        Ok(())
    }

    pub async fn new_page(&self) -> Result<Arc<dyn Page>, BrowserError> {
        self.inner.new_page().await
    }
}

/// A context + page pair for one logical session.
pub struct ScopedSession {
    pub context: ScopedContext,
    pub page: Arc<dyn Page>,
    browser: SharedBrowser,
}

impl ScopedSession {
    pub fn browser(&self) -> &SharedBrowser {
        &self.browser
    }

    /// Build a [`ResilientLocator`] over this session's page.
    pub fn locator(&self, policy: LocatorPolicy) -> ResilientLocator {
        ResilientLocator::new(self.page.clone(), policy)
    }
}

/// Owns the process-wide browser handle.
pub struct BrowserLifecycleManager {
    driver: Arc<dyn BrowserDriver>,
    keep_open: bool,
    slot: Mutex<Option<SharedBrowser>>,
}

impl BrowserLifecycleManager {
    /// `keep_open` sets the initial state of each launched browser's gate.
    pub fn new(driver: Arc<dyn BrowserDriver>, keep_open: bool) -> Self {
        Self {
            driver,
            keep_open,
            slot: Mutex::new(None),
        }
    }

    /// Return the shared browser, launching it on first use.
    pub async fn launch(&self, headless: bool) -> Result<SharedBrowser, BrowserError> {
        let mut slot = self.slot.lock().await;
        if let Some(browser) = slot.as_ref() {
            debug!("Shared browser already running");
            return Ok(browser.clone());
        }

        let instance = self.driver.launch(&LaunchOptions::headless(headless)).await?;
        let browser = SharedBrowser::new(instance, KeepOpenGate::new(self.keep_open));
        info!(
            headless,
            endpoint = ?browser.endpoint(),
            "Shared browser launched"
        );
        *slot = Some(browser.clone());
        Ok(browser)
    }

    /// The live browser, if one has been launched.
    pub async fn current(&self) -> Option<SharedBrowser> {
        self.slot.lock().await.clone()
    }

    pub async fn is_launched(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Release the gate, close the browser and forget it. No-op when idle.
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        let mut slot = self.slot.lock().await;
        let Some(browser) = slot.take() else {
            debug!("Shutdown requested with no browser running");
            return Ok(());
        };

        browser.allow_close();
        browser.close().await?;
        info!("Shared browser closed");
        Ok(())
    }

    /// Derive a fresh context and page from the shared browser.
    pub async fn new_scoped_context(&self) -> Result<ScopedSession, BrowserError> {
        let browser = self.current().await.ok_or(BrowserError::NotLaunched)?;
        let context = browser.instance.new_context().await?;
        let page = context.new_page().await?;
        Ok(ScopedSession {
            context: ScopedContext { inner: context },
            page,
            browser,
        })
    }

    /// [`launch`](Self::launch) if needed, then [`new_scoped_context`](Self::new_scoped_context).
    pub async fn acquire_session(&self, headless: bool) -> Result<ScopedSession, BrowserError> {
        self.launch(headless).await?;
        self.new_scoped_context().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDriver;
    use std::time::Duration;

    fn manager(driver: &FakeDriver, keep_open: bool) -> BrowserLifecycleManager {
        BrowserLifecycleManager::new(Arc::new(driver.clone()), keep_open)
    }

    #[tokio::test]
    async fn test_launch_is_idempotent() {
        let driver = FakeDriver::new();
        let manager = manager(&driver, true);

        manager.launch(false).await.unwrap();
        manager.launch(true).await.unwrap();

        assert_eq!(driver.state().launches(), 1);
        assert!(manager.is_launched().await);
    }

    #[tokio::test]
    async fn test_concurrent_launches_share_one_browser() {
        let driver = FakeDriver::new();
        let manager = Arc::new(manager(&driver, true));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.launch(true).await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(driver.state().launches(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let driver = FakeDriver::new();
        let manager = manager(&driver, true);

        manager.shutdown().await.unwrap();
        manager.launch(true).await.unwrap();
        manager.shutdown().await.unwrap();
        manager.shutdown().await.unwrap();

        assert_eq!(driver.state().closes(), 1);
        assert!(!manager.is_launched().await);
    }

    #[tokio::test]
    async fn test_scoped_context_requires_launch() {
        let driver = FakeDriver::new();
        let manager = manager(&driver, true);

        let err = manager.new_scoped_context().await.err().unwrap();
        assert!(matches!(err, BrowserError::NotLaunched));
    }

    #[tokio::test]
    async fn test_scoped_context_close_is_suppressed() {
        let driver = FakeDriver::new();
        let manager = manager(&driver, true);

        let session = manager.acquire_session(true).await.unwrap();
        session.context.close().await.unwrap();
        drop(session);

        assert_eq!(driver.state().contexts(), 1);
        assert_eq!(driver.state().context_closes(), 0);
        assert_eq!(driver.state().closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_close_waits_for_gate() {
        let driver = FakeDriver::new();
        let manager = manager(&driver, true);
        let browser = manager.launch(true).await.unwrap();

        let closing = tokio::spawn({
            let browser = browser.clone();
            async move { browser.close().await }
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!closing.is_finished());
        assert_eq!(driver.state().closes(), 0);

        browser.allow_close();
        closing.await.unwrap().unwrap();
        assert_eq!(driver.state().closes(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_held_gate() {
        let driver = FakeDriver::new();
        let manager = manager(&driver, true);
        let browser = manager.launch(true).await.unwrap();
        assert!(browser.gate().is_held());

        tokio::time::timeout(Duration::from_secs(1), manager.shutdown())
            .await
            .expect("shutdown must not hang")
            .unwrap();
        assert_eq!(driver.state().closes(), 1);
    }
}
