//! Chrome DevTools Protocol implementation of [`UiDriver`].
//!
//! Resolution happens in two stages: a selector compiles to a CSS candidate
//! query, then candidates are filtered in the page with small JS functions
//! (accessible name, own text, rendered state). Elements are resolved
//! freshly on every call; nothing is cached across steps.

use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::{Element, Page};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::drivers::{ElementState, UiDriver};
use crate::errors::HarnessError;
use crate::selector::Selector;

/// JS evaluated on a candidate to get its accessible name.
const JS_ACCESSIBLE_NAME: &str = r#"function() {
    const label = this.getAttribute('aria-label');
    if (label && label.trim()) return label.trim();
    return (this.innerText || this.textContent || '').replace(/\s+/g, ' ').trim();
}"#;

/// JS evaluated on a candidate to get the text it directly owns
/// (child text nodes only, so container elements do not swallow matches).
const JS_OWN_TEXT: &str = r#"function() {
    return Array.from(this.childNodes)
        .filter(n => n.nodeType === Node.TEXT_NODE)
        .map(n => n.textContent)
        .join(' ')
        .replace(/\s+/g, ' ')
        .trim();
}"#;

/// JS evaluated on a matched element to snapshot visibility, enabledness
/// and rendered text in one pass.
const JS_PROBE_STATE: &str = r#"function() {
    const r = this.getBoundingClientRect();
    const s = window.getComputedStyle(this);
    const visible = r.width > 0 && r.height > 0
        && s.display !== 'none'
        && s.visibility !== 'hidden'
        && !this.hidden;
    const enabled = !this.disabled && this.getAttribute('aria-disabled') !== 'true';
    const text = (this.innerText || this.textContent || '').replace(/\s+/g, ' ').trim();
    return JSON.stringify({ visible, enabled, text });
}"#;

/// JS evaluated on an input before typing, clearing any prior content.
const JS_CLEAR_VALUE: &str = r#"function() {
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
    }
}"#;

/// CSS candidate query for an ARIA role, covering the implicit-role
/// elements alongside explicit `role=` attributes.
fn role_css(role: &str) -> String {
    match role {
        "button" => {
            "button, [role='button'], input[type='button'], input[type='submit']".to_string()
        }
        "link" => "a[href], [role='link']".to_string(),
        "heading" => "h1, h2, h3, h4, h5, h6, [role='heading']".to_string(),
        "textbox" => "input:not([type]), input[type='text'], input[type='password'], \
                      input[type='email'], input[type='search'], textarea, [role='textbox']"
            .to_string(),
        "checkbox" => "input[type='checkbox'], [role='checkbox']".to_string(),
        "row" => "tr, [role='row']".to_string(),
        "columnheader" => "th, [role='columnheader']".to_string(),
        "grid" => "table, [role='grid']".to_string(),
        "dialog" => "dialog, [role='dialog']".to_string(),
        other => format!("[role='{other}']"),
    }
}

/// Elements that commonly carry user-visible text directly.
const TEXT_CANDIDATES: &str =
    "h1, h2, h3, h4, h5, h6, p, span, a, button, label, legend, li, td, th, dt, dd, caption, \
     summary, figcaption, strong, em, div";

pub struct CdpDriver {
    page: Page,
}

impl CdpDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    fn action_err(context: &str, e: impl std::fmt::Display) -> HarnessError {
        HarnessError::Action(format!("{context}: {e}"))
    }

    /// querySelectorAll under the page or a scoping element. A "not found"
    /// from the protocol is an empty result, not an error; zero matches are
    /// the wait engine's business.
    async fn find_all(
        &self,
        root: Option<&Element>,
        css: &str,
    ) -> Result<Vec<Element>, HarnessError> {
        let found = match root {
            None => self.page.find_elements(css).await,
            Some(el) => el.find_elements(css).await,
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(e) => {
                let msg = e.to_string();
                if msg.to_lowercase().contains("not found") {
                    Ok(Vec::new())
                } else {
                    Err(Self::action_err(&format!("query '{css}' failed"), msg))
                }
            }
        }
    }

    /// Evaluate a string-returning JS function on an element.
    async fn eval_str(&self, element: &Element, js: &str) -> Result<String, HarnessError> {
        let returns = element
            .call_js_fn(js, false)
            .await
            .map_err(|e| Self::action_err("element evaluation failed", e))?;
        match returns.result.value {
            Some(serde_json::Value::String(s)) => Ok(s),
            other => Err(HarnessError::Action(format!(
                "element evaluation returned unexpected value: {other:?}"
            ))),
        }
    }

    /// Keep only candidates whose JS-computed string passes `matches`.
    async fn filter_by_js<F>(
        &self,
        candidates: Vec<Element>,
        js: &str,
        matches: F,
    ) -> Result<Vec<Element>, HarnessError>
    where
        F: Fn(&str) -> bool,
    {
        let mut kept = Vec::new();
        for el in candidates {
            // An element detached between query and evaluation is simply
            // no longer a match.
            if let Ok(value) = self.eval_str(&el, js).await {
                if matches(&value) {
                    kept.push(el);
                }
            }
        }
        Ok(kept)
    }

    /// All elements matching the selector under `root`, in document order.
    /// Boxed because chains recurse.
    fn query<'a>(
        &'a self,
        root: Option<&'a Element>,
        selector: &'a Selector,
    ) -> BoxFuture<'a, Result<Vec<Element>, HarnessError>> {
        async move {
            match selector {
                Selector::Css(css) => self.find_all(root, css).await,
                Selector::Role { role, name } => {
                    let candidates = self.find_all(root, &role_css(role)).await?;
                    match name {
                        None => Ok(candidates),
                        Some(wanted) => {
                            let wanted = wanted.trim().to_string();
                            self.filter_by_js(candidates, JS_ACCESSIBLE_NAME, |n| n == wanted)
                                .await
                        }
                    }
                }
                Selector::Text(needle) => {
                    let needle = needle.trim().to_string();
                    let candidates = self.find_all(root, TEXT_CANDIDATES).await?;
                    self.filter_by_js(candidates, JS_OWN_TEXT, |t| {
                        !t.is_empty() && t.contains(needle.as_str())
                    })
                    .await
                }
                Selector::Label(text) => self.query_by_label(root, text).await,
                Selector::Chain(parts) => {
                    let mut iter = parts.iter();
                    let Some(first) = iter.next() else {
                        return Ok(Vec::new());
                    };
                    let mut current = self.query(root, first).await?;
                    for part in iter {
                        // Intermediate levels scope the next query; first
                        // match in document order wins.
                        let Some(scope) = current.into_iter().next() else {
                            return Ok(Vec::new());
                        };
                        current = self.query(Some(&scope), part).await?;
                    }
                    Ok(current)
                }
                Selector::Invalid(reason) => Err(HarnessError::InvalidSelector(reason.clone())),
            }
        }
        .boxed()
    }

    /// Form controls addressed by label text: a `for` attribute wins,
    /// otherwise the control nested inside the label.
    async fn query_by_label(
        &self,
        root: Option<&Element>,
        text: &str,
    ) -> Result<Vec<Element>, HarnessError> {
        let wanted = text.trim().to_string();
        let labels = self.find_all(root, "label").await?;
        let labels = self
            .filter_by_js(labels, JS_ACCESSIBLE_NAME, |n| n == wanted)
            .await?;

        let mut controls = Vec::new();
        for label in labels {
            let target = label
                .attribute("for")
                .await
                .map_err(|e| Self::action_err("reading label 'for'", e))?;
            let found = match target {
                Some(id) if !id.is_empty() => {
                    self.find_all(None, &format!("[id='{id}']")).await?
                }
                _ => {
                    self.find_all(Some(&label), "input, textarea, select")
                        .await?
                }
            };
            controls.extend(found);
        }
        Ok(controls)
    }

    /// Resolve to the `index`-th match (document order), `None` if there is
    /// no such match yet. Resolution runs on every wait poll, so this stays
    /// quiet about ambiguity; `require` does the warning once per action.
    async fn resolve(
        &self,
        selector: &Selector,
        index: usize,
    ) -> Result<Option<Element>, HarnessError> {
        let matches = self.query(None, selector).await?;
        if matches.len() > 1 && index == 0 {
            debug!(selector = %selector, count = matches.len(), "locator is ambiguous");
        }
        Ok(matches.into_iter().nth(index))
    }

    /// Like [`resolve`], but a missing element is an action error. Used by
    /// actions, which run after a wait has already seen the element. Warns
    /// when an unindexed selector is ambiguous so scenario authors see it
    /// rather than silently acting on the first hit.
    async fn require(&self, selector: &Selector, index: usize) -> Result<Element, HarnessError> {
        let mut matches = self.query(None, selector).await?;
        if matches.len() > 1 && index == 0 {
            warn!(
                selector = %selector,
                count = matches.len(),
                "ambiguous locator; taking the first match in document order"
            );
        }
        if index < matches.len() {
            Ok(matches.swap_remove(index))
        } else {
            Err(HarnessError::Action(format!(
                "no element matched {selector} (index {index})"
            )))
        }
    }
}

#[async_trait::async_trait]
impl UiDriver for CdpDriver {
    async fn goto(&self, url: &str) -> Result<(), HarnessError> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| Self::action_err(&format!("navigation to {url} failed"), e))?;
        Ok(())
    }

    async fn probe(
        &self,
        selector: &Selector,
        index: usize,
    ) -> Result<Option<ElementState>, HarnessError> {
        let Some(element) = self.resolve(selector, index).await? else {
            return Ok(None);
        };
        let raw = match self.eval_str(&element, JS_PROBE_STATE).await {
            Ok(raw) => raw,
            // Detached between resolution and probe; next poll re-resolves.
            Err(_) => return Ok(None),
        };
        let state: ElementState = serde_json::from_str(&raw)
            .map_err(|e| HarnessError::Action(format!("malformed state probe: {e}")))?;
        Ok(Some(state))
    }

    async fn click(&self, selector: &Selector, index: usize) -> Result<(), HarnessError> {
        let element = self.require(selector, index).await?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| Self::action_err("scroll into view failed", e))?;
        element
            .click()
            .await
            .map_err(|e| Self::action_err(&format!("click on {selector} failed"), e))?;
        debug!(selector = %selector, "clicked");
        Ok(())
    }

    async fn fill(
        &self,
        selector: &Selector,
        index: usize,
        text: &str,
    ) -> Result<(), HarnessError> {
        let element = self.require(selector, index).await?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| Self::action_err("scroll into view failed", e))?;
        element
            .call_js_fn(JS_CLEAR_VALUE, false)
            .await
            .map_err(|e| Self::action_err("clearing input failed", e))?;
        element
            .focus()
            .await
            .map_err(|e| Self::action_err("focus failed", e))?;
        element
            .type_str(text)
            .await
            .map_err(|e| Self::action_err(&format!("typing into {selector} failed"), e))?;
        debug!(selector = %selector, chars = text.len(), "filled");
        Ok(())
    }

    async fn capture_page(&self) -> Result<Vec<u8>, HarnessError> {
        self.page
            .screenshot(
                CaptureScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .map_err(|e| HarnessError::Artifact(format!("page screenshot failed: {e}")))
    }

    async fn capture_element(
        &self,
        selector: &Selector,
        index: usize,
    ) -> Result<Vec<u8>, HarnessError> {
        let element = match self.require(selector, index).await {
            Ok(element) => element,
            Err(HarnessError::Action(msg)) => return Err(HarnessError::Artifact(msg)),
            Err(e) => return Err(e),
        };
        element
            .scroll_into_view()
            .await
            .map_err(|e| HarnessError::Artifact(format!("scroll into view failed: {e}")))?;
        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| {
                HarnessError::Artifact(format!("element screenshot of {selector} failed: {e}"))
            })
    }
}
