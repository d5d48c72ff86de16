use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::drivers::{ElementState, UiDriver};
use crate::errors::HarnessError;
use crate::selector::Selector;

/// Interval between poll cycles. Resolution and predicate are re-evaluated
/// together each cycle because the DOM changes asynchronously relative to
/// the harness.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A boolean condition over an element's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The selector matches at least one node.
    Exists,
    /// Non-zero rendered size, not hidden by style or attribute.
    Visible,
    /// Not disabled.
    Enabled,
    /// Visible and enabled: the precondition for clicking.
    Actionable,
    /// Rendered text contains the given string.
    TextContains(String),
    /// Rendered text equals the given string.
    TextEquals(String),
}

impl Predicate {
    pub fn holds(&self, state: &ElementState) -> bool {
        match self {
            Predicate::Exists => true,
            Predicate::Visible => state.visible,
            Predicate::Enabled => state.enabled,
            Predicate::Actionable => state.visible && state.enabled,
            Predicate::TextContains(needle) => state.text.contains(needle.as_str()),
            Predicate::TextEquals(wanted) => state.text.trim() == wanted.trim(),
        }
    }

    fn verb(&self) -> String {
        match self {
            Predicate::Exists => "to exist".to_string(),
            Predicate::Visible => "to become visible".to_string(),
            Predicate::Enabled => "to become enabled".to_string(),
            Predicate::Actionable => "to become visible and enabled".to_string(),
            Predicate::TextContains(needle) => format!("text to contain '{needle}'"),
            Predicate::TextEquals(wanted) => format!("text to equal '{wanted}'"),
        }
    }

    /// Human description used in timeout messages, e.g.
    /// "heading 'Details' to become visible".
    pub fn describe(&self, selector: &Selector) -> String {
        format!("{selector} {}", self.verb())
    }
}

/// Poll until the selector resolves and the predicate holds, or the timeout
/// elapses. A selector matching zero nodes is treated the same as a
/// predicate that is not yet true, so a still-loading UI is tolerated up to
/// the deadline. The task suspends between polls so the browser transport
/// keeps making progress.
pub async fn wait_for(
    driver: &dyn UiDriver,
    selector: &Selector,
    index: usize,
    predicate: &Predicate,
    timeout: Duration,
) -> Result<ElementState, HarnessError> {
    let started = Instant::now();
    debug!(selector = %selector, predicate = %predicate.describe(selector), ?timeout, "waiting");
    loop {
        if let Some(state) = driver.probe(selector, index).await? {
            if predicate.holds(&state) {
                trace!(selector = %selector, elapsed = ?started.elapsed(), "predicate satisfied");
                return Ok(state);
            }
        }
        if started.elapsed() >= timeout {
            return Err(HarnessError::Timeout {
                elapsed: started.elapsed(),
                waiting_for: predicate.describe(selector),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
