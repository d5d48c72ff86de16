pub mod cdp;

use serde::Deserialize;

use crate::errors::HarnessError;
use crate::selector::Selector;

/// Snapshot of one element's state, taken in a single probe so the three
/// facts are consistent with each other.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementState {
    /// Non-zero rendered size and not hidden by style or attribute.
    pub visible: bool,
    /// Not disabled, directly or via `aria-disabled`.
    pub enabled: bool,
    /// Rendered text content, trimmed.
    pub text: String,
}

/// The common seam between the step sequencer and whatever drives the UI.
///
/// Implementations resolve the selector freshly on every call; elements are
/// never cached across calls, since the DOM mutates between actions.
#[async_trait::async_trait]
pub trait UiDriver: Send + Sync {
    /// Direct the current page to `url`. Does not wait for the destination
    /// to become ready.
    async fn goto(&self, url: &str) -> Result<(), HarnessError>;

    /// Resolve the selector and report the matched element's state.
    /// `Ok(None)` means zero matches right now, which callers treat as
    /// "not yet visible" rather than an error.
    async fn probe(
        &self,
        selector: &Selector,
        index: usize,
    ) -> Result<Option<ElementState>, HarnessError>;

    /// One synthetic activation of the matched element.
    async fn click(&self, selector: &Selector, index: usize) -> Result<(), HarnessError>;

    /// Clear the matched input's value, then type `text` into it.
    async fn fill(
        &self,
        selector: &Selector,
        index: usize,
        text: &str,
    ) -> Result<(), HarnessError>;

    /// PNG screenshot of the full visible page.
    async fn capture_page(&self) -> Result<Vec<u8>, HarnessError>;

    /// PNG screenshot of the matched element's rendered region.
    async fn capture_element(
        &self,
        selector: &Selector,
        index: usize,
    ) -> Result<Vec<u8>, HarnessError>;
}
