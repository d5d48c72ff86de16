use std::path::PathBuf;
use std::sync::Arc;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::drivers::cdp::CdpDriver;
use crate::drivers::UiDriver;
use crate::errors::HarnessError;
use crate::locator::Locator;
use crate::selector::Selector;

/// Options for launching a fresh isolated browser instance.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub headless: bool,
    /// Explicit browser binary. Defaults to chromiumoxide's own detection.
    pub chrome_binary: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_binary: None,
            extra_args: Vec::new(),
        }
    }
}

/// How the session obtains its browsing context. The step sequencer is
/// agnostic to which variant produced the session.
#[derive(Debug, Clone)]
pub enum ConnectMode {
    /// Start a fresh isolated instance with a clean profile. The session
    /// owns it and tears it down on close.
    Launch(LaunchConfig),
    /// Connect to an already-running instance over its remote debugging
    /// endpoint. The session borrows the first available page; close only
    /// releases the connection.
    Attach { host: String, port: u16 },
}

/// An exclusively-owned handle to a controlled browsing context.
///
/// One session serves one run at a time; parallel scenarios must each
/// obtain their own. The session must be released on every exit path, and
/// [`Session::close`] is idempotent so cleanup code can be unconditional.
pub struct Session {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    driver: Arc<dyn UiDriver>,
    owned: bool,
}

impl Session {
    /// Establish a session. Any failure here surfaces as
    /// [`HarnessError::Connection`] and means no step has executed.
    #[instrument(skip(mode))]
    pub async fn connect(mode: ConnectMode) -> Result<Self, HarnessError> {
        match mode {
            ConnectMode::Launch(config) => Self::launch(config).await,
            ConnectMode::Attach { host, port } => Self::attach(&host, port).await,
        }
    }

    async fn launch(config: LaunchConfig) -> Result<Self, HarnessError> {
        let mut args = vec![
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-extensions".to_string(),
        ];
        if std::env::var("CI").is_ok() || std::env::var("NO_SANDBOX").is_ok() {
            args.push("--no-sandbox".to_string());
        }
        args.extend(config.extra_args.iter().cloned());

        let mut builder = BrowserConfig::builder();
        if let Some(ref binary) = config.chrome_binary {
            builder = builder.chrome_executable(binary);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .args(args)
            .build()
            .map_err(|e| HarnessError::Connection(format!("browser config failed: {e}")))?;

        info!(headless = config.headless, "launching browser");
        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| HarnessError::Connection(format!("browser launch failed: {e}")))?;
        let handler_task = spawn_handler_loop(handler);

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::Connection(format!("failed to open page: {e}")))?;

        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            driver: Arc::new(CdpDriver::new(page)),
            owned: true,
        })
    }

    async fn attach(host: &str, port: u16) -> Result<Self, HarnessError> {
        let version_url = format!("http://{host}:{port}/json/version");
        debug!(%version_url, "querying remote debugging endpoint");
        let response = reqwest::get(&version_url)
            .await
            .map_err(|e| HarnessError::Connection(format!("cannot reach {version_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(HarnessError::Connection(format!(
                "{version_url} answered HTTP {}",
                response.status()
            )));
        }
        let version: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HarnessError::Connection(format!("malformed /json/version: {e}")))?;
        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                HarnessError::Connection(format!("no webSocketDebuggerUrl in {version_url}"))
            })?
            .to_string();

        info!(%ws_url, "attaching to running browser");
        let (browser, handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| HarnessError::Connection(format!("CDP connect failed: {e}")))?;
        let handler_task = spawn_handler_loop(handler);

        // Borrow the first existing page; only open one if the instance has
        // none at all.
        let pages = browser
            .pages()
            .await
            .map_err(|e| HarnessError::Connection(format!("failed to list pages: {e}")))?;
        let page = match pages.into_iter().next() {
            Some(page) => page,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|e| HarnessError::Connection(format!("failed to open page: {e}")))?,
        };

        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            driver: Arc::new(CdpDriver::new(page)),
            owned: false,
        })
    }

    /// The driver seam consumed by the runner and by locators.
    pub fn driver(&self) -> Arc<dyn UiDriver> {
        self.driver.clone()
    }

    /// Ad-hoc locator bound to this session's page.
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.driver.clone(), selector.into())
    }

    /// Release the session. For an owned browser this terminates it; for an
    /// attached one it closes only our connection and leaves the remote
    /// process running. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if self.owned {
                if let Err(e) = browser.close().await {
                    warn!("browser close failed: {e}");
                }
                if let Err(e) = browser.wait().await {
                    debug!("browser did not exit cleanly: {e}");
                }
            } else {
                info!("releasing connection to attached browser");
                drop(browser);
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }

    /// Test-only session with no live browser behind it.
    #[cfg(test)]
    pub(crate) fn detached(driver: Arc<dyn UiDriver>) -> Self {
        Self {
            browser: None,
            handler_task: None,
            driver,
            owned: false,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // close() is the real release path; this only stops the event loop
        // task if the caller never got there.
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

/// Drive the CDP event handler until the connection ends. Without this loop
/// the websocket transport makes no progress.
fn spawn_handler_loop(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
        debug!("browser event loop ended");
    })
}
