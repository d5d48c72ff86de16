//! Step sequencer and run reporter.
//!
//! A run is strictly linear: steps execute one after another, each against
//! the DOM state its predecessor left behind, and the first unrecoverable
//! failure stops the whole run. On failure the runner makes one best-effort
//! full-page diagnostic capture before reporting.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::drivers::UiDriver;
use crate::errors::HarnessError;
use crate::selector::Selector;
use crate::step::{CaptureScope, Scenario, Step, StepKind};
use crate::wait::{wait_for, Predicate};

/// Explicit runner configuration; nothing is read from process-wide state.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wait budget for steps that do not carry their own `timeout_ms`.
    pub default_timeout: Duration,
    /// Where the on-failure diagnostic screenshot goes.
    pub failure_artifact: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            failure_artifact: PathBuf::from("uivet-failure.png"),
        }
    }
}

/// Terminal value of a run. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure {
        /// Zero-based index of the failing step.
        step: usize,
        reason: String,
        /// Diagnostic screenshot, when one could be written.
        artifact: Option<PathBuf>,
    },
}

/// One completed step, as narrated by the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTrace {
    pub index: usize,
    pub description: String,
    pub elapsed: Duration,
}

/// Aggregated result of a run: the outcome plus one trace entry per
/// completed step, in step order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub scenario: String,
    pub outcome: RunOutcome,
    pub trace: Vec<StepTrace>,
}

impl RunReport {
    /// Process exit semantics for automation pipelines.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Success => 0,
            RunOutcome::Failure { .. } => 1,
        }
    }
}

pub struct Runner {
    driver: Arc<dyn UiDriver>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(driver: Arc<dyn UiDriver>, config: RunnerConfig) -> Self {
        Self { driver, config }
    }

    /// Run the scenario to completion or first failure. Never returns an
    /// error: every step-level error becomes part of the report.
    #[instrument(skip(self, scenario), fields(scenario = %scenario.name))]
    pub async fn run(&self, scenario: &Scenario) -> RunReport {
        let mut trace = Vec::with_capacity(scenario.steps.len());

        for (index, step) in scenario.steps.iter().enumerate() {
            let started = Instant::now();
            match self.execute(step).await {
                Ok(()) => {
                    let entry = StepTrace {
                        index,
                        description: step.describe(),
                        elapsed: started.elapsed(),
                    };
                    info!(
                        step = index,
                        elapsed = ?entry.elapsed,
                        "ok: {}",
                        entry.description
                    );
                    trace.push(entry);
                }
                Err(e) => {
                    let reason = e.to_string();
                    error!(
                        step = index,
                        elapsed = ?started.elapsed(),
                        "failed: {} ({reason})",
                        step.describe()
                    );
                    let artifact = self.diagnostic_capture().await;
                    return RunReport {
                        scenario: scenario.name.clone(),
                        outcome: RunOutcome::Failure {
                            step: index,
                            reason,
                            artifact,
                        },
                        trace,
                    };
                }
            }
        }

        info!(steps = trace.len(), "scenario passed");
        RunReport {
            scenario: scenario.name.clone(),
            outcome: RunOutcome::Success,
            trace,
        }
    }

    /// Execute one step: wait for its readiness precondition, then perform
    /// its action at most once. The wait polls; the action is never
    /// re-issued.
    async fn execute(&self, step: &Step) -> Result<(), HarnessError> {
        let timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_timeout);
        let index = step.index.unwrap_or(0);
        let driver = self.driver.as_ref();

        match &step.kind {
            StepKind::Navigate { url } => driver.goto(url).await,
            StepKind::Click => {
                let locator = step_locator(step)?;
                wait_for(driver, locator, index, &Predicate::Actionable, timeout).await?;
                driver.click(locator, index).await
            }
            StepKind::Fill { text } => {
                let locator = step_locator(step)?;
                wait_for(driver, locator, index, &Predicate::Visible, timeout).await?;
                driver.fill(locator, index, text).await
            }
            StepKind::AssertVisible => {
                let locator = step_locator(step)?;
                wait_for(driver, locator, index, &Predicate::Visible, timeout).await?;
                Ok(())
            }
            StepKind::AssertEnabled => {
                let locator = step_locator(step)?;
                wait_for(driver, locator, index, &Predicate::Enabled, timeout).await?;
                Ok(())
            }
            StepKind::AssertText { contains } => {
                let locator = step_locator(step)?;
                wait_for(
                    driver,
                    locator,
                    index,
                    &Predicate::TextContains(contains.clone()),
                    timeout,
                )
                .await?;
                Ok(())
            }
            StepKind::Capture { path, scope } => {
                let image = match scope {
                    CaptureScope::Page => driver.capture_page().await?,
                    CaptureScope::Element => {
                        let locator = step_locator(step)?;
                        wait_for(driver, locator, index, &Predicate::Exists, timeout).await?;
                        driver.capture_element(locator, index).await?
                    }
                };
                write_artifact(path, &image).await
            }
        }
    }

    /// Best-effort full-page capture on failure. Its own failure is logged
    /// and never overrides the original failure reason.
    async fn diagnostic_capture(&self) -> Option<PathBuf> {
        let path = self.config.failure_artifact.clone();
        let image = match self.driver.capture_page().await {
            Ok(image) => image,
            Err(e) => {
                warn!("diagnostic capture failed: {e}");
                return None;
            }
        };
        match write_artifact(&path, &image).await {
            Ok(()) => {
                info!(path = %path.display(), "diagnostic screenshot written");
                Some(path)
            }
            Err(e) => {
                warn!("diagnostic capture failed: {e}");
                None
            }
        }
    }
}

fn step_locator(step: &Step) -> Result<&Selector, HarnessError> {
    step.locator.as_ref().ok_or_else(|| {
        // Load-time validation normally rejects this; guard anyway for
        // hand-built scenarios.
        HarnessError::InvalidScenario(format!("{} step has no locator", step.kind.verb()))
    })
}

/// Write image bytes to `path`, overwriting, creating parent directories.
async fn write_artifact(path: &Path, image: &[u8]) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HarnessError::Artifact(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
    }
    tokio::fs::write(path, image)
        .await
        .map_err(|e| HarnessError::Artifact(format!("cannot write {}: {e}", path.display())))
}
