use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the verification harness.
///
/// Every variant maps to one failure class: connection problems abort a run
/// before any step executes, timeouts and action errors fail the current
/// step, artifact errors fail a capture step without corrupting the results
/// of the steps that already passed.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The controlled browser could not be launched or reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A wait predicate never became true within the step's budget.
    #[error("timed out after {elapsed:?} waiting for {waiting_for}")]
    Timeout {
        elapsed: Duration,
        waiting_for: String,
    },

    /// An action could not be performed on an otherwise-ready element.
    #[error("action failed: {0}")]
    Action(String),

    /// A screenshot could not be captured or written.
    #[error("artifact capture failed: {0}")]
    Artifact(String),

    /// A locator string that does not parse into any selector form.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A scenario that fails structural validation at load time.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

impl HarnessError {
    /// True for errors that abort the run before any step executes.
    pub fn is_connection(&self) -> bool {
        matches!(self, HarnessError::Connection(_))
    }
}
