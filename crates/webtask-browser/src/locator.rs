//! Resilient element activation.
//!
//! The agent refers to elements by what a person sees ("Submit", "Next
//! Page") or, occasionally, by a CSS/XPath selector. [`ResilientLocator`]
//! turns that reference into a [`Locator`], waits for it, scrolls it into
//! view and clicks it. Only the click decides success.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{BrowserError, LocateError, Page};

/// Leading characters that mark a reference as a structural selector.
pub const SELECTOR_SIGILS: &[char] = &['.', '#', '<', '/'];

/// How an element is found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS or XPath selector, passed to the driver verbatim.
    Selector(String),
    /// Visible text of the element.
    Text(String),
}

impl Locator {
    /// Classify a reference supplied by the agent.
    ///
    /// Selectors keep the reference as given. Text references are trimmed
    /// so stray whitespace from the model does not end up inside the
    /// `text="…"` match.
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with(SELECTOR_SIGILS) {
            Self::Selector(reference.to_string())
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(selector) => f.write_str(selector),
            Self::Text(text) => write!(f, "text=\"{}\"", text.replace('"', "\\\"")),
        }
    }
}

/// Steps whose failure is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestEffort {
    /// Wait for the element to show up.
    WaitForAppearance,
    /// Bring the element into the viewport.
    ScrollIntoView,
}

impl BestEffort {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WaitForAppearance => "wait_for_appearance",
            Self::ScrollIntoView => "scroll_into_view",
        }
    }

    /// Run `step`, log a failure and carry on.
    async fn attempt<F>(self, locator: &Locator, step: F)
    where
        F: Future<Output = Result<(), BrowserError>>,
    {
        if let Err(e) = step.await {
            debug!(
                step = self.name(),
                locator = %locator,
                error = %e,
                "Best-effort step failed, continuing"
            );
        }
    }
}

/// Tuning for [`ResilientLocator`].
#[derive(Debug, Clone, Copy)]
pub struct LocatorPolicy {
    /// Upper bound for the appearance wait.
    pub wait_timeout: Duration,

    /// Consecutive failures of one reference before the step is abandoned.
    pub max_consecutive_failures: u32,
}

impl Default for LocatorPolicy {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(5),
            max_consecutive_failures: 3,
        }
    }
}

#[derive(Debug, Default)]
struct FailureStreak {
    reference: Option<String>,
    count: u32,
}

/// Wait / scroll / click wrapper around a [`Page`].
pub struct ResilientLocator {
    page: Arc<dyn Page>,
    policy: LocatorPolicy,
    streak: Mutex<FailureStreak>,
}

impl ResilientLocator {
    pub fn new(page: Arc<dyn Page>, policy: LocatorPolicy) -> Self {
        Self {
            page,
            policy,
            streak: Mutex::new(FailureStreak::default()),
        }
    }

    /// Activate (click) the element named by `reference`.
    ///
    /// The appearance wait and the scroll never fail this call; the click
    /// does.
    pub async fn activate(&self, reference: &str) -> Result<(), LocateError> {
        let locator = Locator::parse(reference);
        let wait = self.policy.wait_timeout;
        debug!(reference = %reference, locator = %locator, "Activating element");

        BestEffort::WaitForAppearance
            .attempt(&locator, async {
                match tokio::time::timeout(wait, self.page.wait_for(&locator, wait)).await {
                    Ok(result) => result,
                    Err(_) => Err(BrowserError::Timeout(wait)),
                }
            })
            .await;

        BestEffort::ScrollIntoView
            .attempt(&locator, self.page.scroll_into_view(&locator))
            .await;

        match self.page.click(&locator).await {
            Ok(()) => {
                self.reset_streak();
                info!(locator = %locator, "Element activated");
                Ok(())
            }
            Err(source) => Err(self.record_failure(reference, source)),
        }
    }

    fn reset_streak(&self) {
        let mut streak = self.streak.lock().unwrap_or_else(PoisonError::into_inner);
        *streak = FailureStreak::default();
    }

    fn record_failure(&self, reference: &str, source: BrowserError) -> LocateError {
        let mut streak = self.streak.lock().unwrap_or_else(PoisonError::into_inner);
        if streak.reference.as_deref() == Some(reference) {
            streak.count += 1;
        } else {
            streak.reference = Some(reference.to_string());
            streak.count = 1;
        }

        let attempts = streak.count;
        if attempts >= self.policy.max_consecutive_failures {
            *streak = FailureStreak::default();
            warn!(reference = %reference, attempts, "Element activation abandoned");
            LocateError::StepFailed {
                reference: reference.to_string(),
                attempts,
                source,
            }
        } else {
            warn!(reference = %reference, attempts, error = %source, "Element activation failed");
            LocateError::Activation {
                reference: reference.to_string(),
                source,
            }
        }
    }
}
