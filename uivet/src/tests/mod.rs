mod runner_tests;

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::drivers::{ElementState, UiDriver};
use crate::errors::HarnessError;
use crate::selector::Selector;

// Initialize tracing for tests
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .try_init();
}

pub fn shown(text: &str) -> ElementState {
    ElementState {
        visible: true,
        enabled: true,
        text: text.to_string(),
    }
}

pub fn hidden() -> ElementState {
    ElementState {
        visible: false,
        enabled: true,
        text: String::new(),
    }
}

/// A tiny PNG header so artifact tests write recognizably non-empty files.
pub const PNG_STUB: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 1, 2, 3];

#[derive(Default)]
struct FakeInner {
    /// Scripted probe answers per selector string; the last entry repeats
    /// once the script runs out, so "stays hidden forever" is one entry.
    probes: HashMap<String, VecDeque<Option<ElementState>>>,
    /// Every driver call, in order, e.g. "click button|Next".
    calls: Vec<String>,
    /// Selectors whose click is scripted to fail.
    broken_clicks: Vec<String>,
    /// `None` makes page capture fail.
    page_image: Option<Vec<u8>>,
}

/// Scripted in-memory driver so sequencing and wait semantics are testable
/// without a browser.
pub struct FakeDriver {
    inner: Mutex<FakeInner>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            inner: Mutex::new(FakeInner {
                page_image: Some(PNG_STUB.to_vec()),
                ..FakeInner::default()
            }),
        }
    }
}

impl FakeDriver {
    /// Script the probe answers for a selector, in poll order.
    pub fn on_probe(&self, selector: &str, answers: Vec<Option<ElementState>>) {
        self.inner
            .lock()
            .unwrap()
            .probes
            .insert(selector.to_string(), answers.into());
    }

    pub fn break_click(&self, selector: &str) {
        self.inner
            .lock()
            .unwrap()
            .broken_clicks
            .push(selector.to_string());
    }

    pub fn break_page_capture(&self) {
        self.inner.lock().unwrap().page_image = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn next_probe(&self, key: &str) -> Option<ElementState> {
        let mut inner = self.inner.lock().unwrap();
        let script = inner.probes.get_mut(key)?;
        if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        }
    }
}

#[async_trait::async_trait]
impl UiDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), HarnessError> {
        self.record(format!("goto {url}"));
        Ok(())
    }

    async fn probe(
        &self,
        selector: &Selector,
        _index: usize,
    ) -> Result<Option<ElementState>, HarnessError> {
        let key = selector.to_string();
        self.record(format!("probe {key}"));
        Ok(self.next_probe(&key))
    }

    async fn click(&self, selector: &Selector, _index: usize) -> Result<(), HarnessError> {
        let key = selector.to_string();
        self.record(format!("click {key}"));
        if self.inner.lock().unwrap().broken_clicks.contains(&key) {
            return Err(HarnessError::Action(format!("click on {key} rejected")));
        }
        Ok(())
    }

    async fn fill(
        &self,
        selector: &Selector,
        _index: usize,
        text: &str,
    ) -> Result<(), HarnessError> {
        self.record(format!("fill {selector} <- {text}"));
        Ok(())
    }

    async fn capture_page(&self) -> Result<Vec<u8>, HarnessError> {
        self.record("capture_page".to_string());
        self.inner
            .lock()
            .unwrap()
            .page_image
            .clone()
            .ok_or_else(|| HarnessError::Artifact("page capture unavailable".to_string()))
    }

    async fn capture_element(
        &self,
        selector: &Selector,
        _index: usize,
    ) -> Result<Vec<u8>, HarnessError> {
        let key = selector.to_string();
        self.record(format!("capture_element {key}"));
        // An element capture only works if the probe script says the
        // element is there right now.
        match self.next_probe(&key) {
            Some(_) => Ok(PNG_STUB.to_vec()),
            None => Err(HarnessError::Artifact(format!("no element matched {key}"))),
        }
    }
}
