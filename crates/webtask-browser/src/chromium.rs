//! Chromium DevTools driver built on `chromiumoxide`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Element;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    BrowserContext, BrowserDriver, BrowserError, BrowserInstance, LaunchOptions, Locator, Page,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn driver_err(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Driver(e.to_string())
}

/// Launches a local Chromium through the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumDriver;

impl ChromiumDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserInstance>, BrowserError> {
        let mut builder = BrowserConfig::builder().viewport(None);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled for the
        // browser's whole lifetime.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let endpoint = browser.websocket_address().clone();
        Ok(Arc::new(ChromiumInstance {
            browser: Arc::new(Mutex::new(browser)),
            endpoint,
            events,
        }))
    }
}

struct ChromiumInstance {
    browser: Arc<Mutex<Browser>>,
    endpoint: String,
    events: JoinHandle<()>,
}

#[async_trait]
impl BrowserInstance for ChromiumInstance {
    async fn new_context(&self) -> Result<Arc<dyn BrowserContext>, BrowserError> {
        let browser = self.browser.lock().await;
        let response = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(driver_err)?;
        let id = response.result.browser_context_id.clone();
        debug!(context_id = ?id, "Browser context created");
        Ok(Arc::new(ChromiumContext {
            browser: self.browser.clone(),
            id,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(driver_err)?;
        browser.wait().await.map_err(driver_err)?;
        self.events.abort();
        Ok(())
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.endpoint.clone())
    }
}

struct ChromiumContext {
    browser: Arc<Mutex<Browser>>,
    id: BrowserContextId,
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn new_page(&self) -> Result<Arc<dyn Page>, BrowserError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.id.clone())
            .build()
            .map_err(BrowserError::Driver)?;
        let page = self
            .browser
            .lock()
            .await
            .new_page(params)
            .await
            .map_err(driver_err)?;
        Ok(Arc::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.browser
            .lock()
            .await
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await
            .map_err(driver_err)?;
        Ok(())
    }
}

struct ChromiumPage {
    page: chromiumoxide::Page,
}

impl ChromiumPage {
    async fn find(&self, locator: &Locator) -> Result<Element, BrowserError> {
        let found = match locator {
            Locator::Selector(selector) if selector.trim_start().starts_with('/') => {
                self.page.find_xpath(selector.trim()).await
            }
            Locator::Selector(selector) => self.page.find_element(selector.trim()).await,
            Locator::Text(text) => self.page.find_xpath(text_xpath(text)).await,
        };
        found.map_err(|_| BrowserError::ElementNotFound(locator.to_string()))
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find(locator).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), BrowserError> {
        let element = self.find(locator).await?;
        element.scroll_into_view().await.map_err(driver_err)?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        let element = self.find(locator).await?;
        element.click().await.map_err(driver_err)?;
        Ok(())
    }
}

/// XPath matching an element whose own text equals `text`.
fn text_xpath(text: &str) -> String {
    format!("//*[normalize-space(text())={}]", xpath_literal(text))
}

/// Quote `value` as an XPath string literal.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("Next"), "\"Next\"");
        assert_eq!(xpath_literal("Say \"hi\""), "'Say \"hi\"'");
        assert_eq!(
            xpath_literal("it's \"x\""),
            "concat(\"it's \", '\"', \"x\", '\"', \"\")"
        );
    }

    #[test]
    fn test_text_xpath() {
        assert_eq!(
            text_xpath("Submit"),
            "//*[normalize-space(text())=\"Submit\"]"
        );
    }
}
