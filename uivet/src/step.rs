use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;
use crate::selector::Selector;

/// What a capture step photographs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureScope {
    #[default]
    Page,
    Element,
}

/// The closed set of step kinds.
///
/// Scenarios are validated against this enumeration at load time, so an
/// unrecognized action fails before the run starts rather than mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Direct the page to a new address. Does not wait for readiness;
    /// the following step's wait owns that.
    Navigate { url: String },
    /// Single synthetic activation of the located element.
    Click,
    /// Clear the located input and type the given text.
    Fill { text: String },
    /// Assert the located element becomes visible.
    AssertVisible,
    /// Assert the located element becomes enabled.
    AssertEnabled,
    /// Assert the located element's text contains the given string.
    AssertText { contains: String },
    /// Write a screenshot of the page or the located element.
    Capture {
        path: PathBuf,
        #[serde(default)]
        scope: CaptureScope,
    },
}

impl StepKind {
    /// Kinds that address an element need a locator.
    pub fn needs_locator(&self) -> bool {
        match self {
            StepKind::Navigate { .. } => false,
            StepKind::Capture { scope, .. } => *scope == CaptureScope::Element,
            _ => true,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            StepKind::Navigate { .. } => "navigate",
            StepKind::Click => "click",
            StepKind::Fill { .. } => "fill",
            StepKind::AssertVisible => "assert-visible",
            StepKind::AssertEnabled => "assert-enabled",
            StepKind::AssertText { .. } => "assert-text",
            StepKind::Capture { .. } => "capture",
        }
    }
}

/// One unit of scripted interaction or assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Optional human label used in trace lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Selector>,
    /// Explicit zero-based pick among multiple matches. Without it the
    /// first match in document order wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Per-step wait budget in milliseconds. Falls back to the runner's
    /// default timeout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Step {
    /// Short description used by trace lines and failure reasons.
    pub fn describe(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let mut out = self.kind.verb().to_string();
        match &self.kind {
            StepKind::Navigate { url } => {
                out.push(' ');
                out.push_str(url);
            }
            StepKind::Capture { path, .. } => {
                out.push(' ');
                out.push_str(&path.display().to_string());
            }
            _ => {}
        }
        if let Some(locator) = &self.locator {
            out.push_str(&format!(" {locator}"));
        }
        out
    }
}

/// An ordered list of steps. Fixed at load time: no cycles, no branching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml(input: &str) -> Result<Self, HarnessError> {
        let scenario: Scenario = serde_yaml::from_str(input)
            .map_err(|e| HarnessError::InvalidScenario(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_json(input: &str) -> Result<Self, HarnessError> {
        let scenario: Scenario = serde_json::from_str(input)
            .map_err(|e| HarnessError::InvalidScenario(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file, picking the format from the extension
    /// (`.json` is JSON, anything else is YAML).
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::InvalidScenario(format!("cannot read {}: {e}", path.display()))
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&raw)
        } else {
            Self::from_yaml(&raw)
        }
    }

    /// Structural validation: element-addressing steps carry a locator and
    /// every selector parses.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.steps.is_empty() {
            return Err(HarnessError::InvalidScenario(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.kind.needs_locator() && step.locator.is_none() {
                return Err(HarnessError::InvalidScenario(format!(
                    "step {i} ({}) requires a locator",
                    step.kind.verb()
                )));
            }
            if let Some(locator) = &step.locator {
                locator
                    .validate()
                    .map_err(|reason| HarnessError::InvalidSelector(format!("step {i}: {reason}")))?;
            }
        }
        Ok(())
    }
}
