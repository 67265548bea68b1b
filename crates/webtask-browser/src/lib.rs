//! Browser plumbing for webtask.
//!
//! One expensive browser instance is shared by the whole process. This crate
//! owns its lifecycle ([`BrowserLifecycleManager`]), hands out scoped
//! sessions whose close is deferred, and wraps the flaky "click this
//! element" primitive in a bounded wait/scroll/click sequence
//! ([`ResilientLocator`]).
//!
//! The driver itself sits behind the traits in [`driver`]. A Chromium
//! DevTools implementation is available with the `chromium` feature.

pub mod driver;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod locator;

#[cfg(feature = "chromium")]
pub mod chromium;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use driver::{BrowserContext, BrowserDriver, BrowserInstance, LaunchOptions, Page};
pub use error::{BrowserError, LocateError};
pub use gate::KeepOpenGate;
pub use lifecycle::{BrowserLifecycleManager, ScopedContext, ScopedSession, SharedBrowser};
pub use locator::{BestEffort, Locator, LocatorPolicy, ResilientLocator};
