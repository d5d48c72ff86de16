use std::sync::Arc;
use std::time::Duration;

use crate::drivers::{ElementState, UiDriver};
use crate::errors::HarnessError;
use crate::selector::Selector;
use crate::wait::{wait_for, Predicate};

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// A selector bound to a driver, with a default wait budget.
///
/// This is the ad-hoc counterpart to running a scripted scenario: library
/// users can drive a session directly through locators. Resolution is fresh
/// on every call; a `Locator` never holds a live element.
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn UiDriver>,
    selector: Selector,
    index: usize,
    timeout: Duration,
}

impl Locator {
    pub(crate) fn new(driver: Arc<dyn UiDriver>, selector: Selector) -> Self {
        Self {
            driver,
            selector,
            index: 0,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pick the n-th match (zero-based) instead of the first.
    pub fn nth(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Wait for the predicate, up to the given timeout or this locator's
    /// default.
    pub async fn wait(
        &self,
        predicate: Predicate,
        timeout: Option<Duration>,
    ) -> Result<ElementState, HarnessError> {
        let effective = timeout.unwrap_or(self.timeout);
        wait_for(
            self.driver.as_ref(),
            &self.selector,
            self.index,
            &predicate,
            effective,
        )
        .await
    }

    /// Wait until visible and enabled, then click once.
    pub async fn click(&self, timeout: Option<Duration>) -> Result<(), HarnessError> {
        self.wait(Predicate::Actionable, timeout).await?;
        self.driver.click(&self.selector, self.index).await
    }

    /// Wait until visible, then replace the input's content with `text`.
    pub async fn fill(&self, text: &str, timeout: Option<Duration>) -> Result<(), HarnessError> {
        self.wait(Predicate::Visible, timeout).await?;
        self.driver.fill(&self.selector, self.index, text).await
    }

    /// Wait until the element exists, then screenshot its rendered region.
    pub async fn capture(&self, timeout: Option<Duration>) -> Result<Vec<u8>, HarnessError> {
        self.wait(Predicate::Exists, timeout).await?;
        self.driver.capture_element(&self.selector, self.index).await
    }
}
