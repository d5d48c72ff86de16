//! UI verification harness over the Chrome DevTools Protocol
//!
//! uivet attaches to a running graphical application (or launches a fresh
//! browser), drives it through a scripted sequence of user-like steps,
//! asserts that the interface reaches expected visible states, and captures
//! screenshot artifacts at checkpoints and on failure. It is inspired by
//! Playwright's web automation model.
//!
//! ```no_run
//! use uivet::{ConnectMode, Runner, RunnerConfig, Scenario, Session};
//!
//! # async fn demo() -> Result<(), uivet::HarnessError> {
//! let mut session = Session::connect(ConnectMode::Attach {
//!     host: "127.0.0.1".into(),
//!     port: 9222,
//! })
//! .await?;
//!
//! let scenario = Scenario::from_yaml(
//!     r#"
//! name: dashboard smoke
//! steps:
//!   - kind: assert_visible
//!     locator: heading|Dashboard
//!     timeout_ms: 5000
//!   - kind: click
//!     locator: button|Next
//!   - kind: capture
//!     path: details.png
//! "#,
//! )?;
//!
//! let report = Runner::new(session.driver(), RunnerConfig::default())
//!     .run(&scenario)
//!     .await;
//! session.close().await;
//! std::process::exit(report.exit_code())
//! # }
//! ```

pub mod drivers;
pub mod errors;
pub mod locator;
pub mod runner;
pub mod selector;
pub mod session;
pub mod step;
#[cfg(test)]
mod tests;
pub mod wait;

pub use drivers::{ElementState, UiDriver};
pub use errors::HarnessError;
pub use locator::Locator;
pub use runner::{RunOutcome, RunReport, Runner, RunnerConfig, StepTrace};
pub use selector::Selector;
pub use session::{ConnectMode, LaunchConfig, Session};
pub use step::{CaptureScope, Scenario, Step, StepKind};
pub use wait::{wait_for, Predicate};
