//! Tests for the step sequencer and run reporter.

use std::sync::Arc;
use std::time::Duration;

use crate::runner::{RunOutcome, Runner, RunnerConfig};
use crate::step::Scenario;
use crate::tests::{hidden, shown, FakeDriver};

fn config_in(dir: &tempfile::TempDir) -> RunnerConfig {
    RunnerConfig {
        default_timeout: Duration::from_millis(800),
        failure_artifact: dir.path().join("failure.png"),
    }
}

fn dashboard_scenario() -> Scenario {
    Scenario::from_yaml(
        r#"
name: dashboard
steps:
  - kind: assert_visible
    locator: heading|Dashboard
    timeout_ms: 5000
  - kind: click
    locator: button|Next
  - kind: assert_visible
    locator: heading|Details
    timeout_ms: 5000
"#,
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn success_emits_one_trace_line_per_step_in_order() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("heading|Dashboard", vec![Some(shown("Dashboard"))]);
    driver.on_probe("button|Next", vec![Some(shown("Next"))]);
    driver.on_probe("heading|Details", vec![Some(shown("Details"))]);

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver.clone(), config_in(&dir))
        .run(&dashboard_scenario())
        .await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.exit_code(), 0);
    let indices: Vec<usize> = report.trace.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(driver.calls_matching("click"), 1);
    // Success writes no diagnostic artifact.
    assert!(!dir.path().join("failure.png").exists());
}

#[tokio::test(start_paused = true)]
async fn first_unsatisfied_step_fails_with_its_index() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("heading|Dashboard", vec![Some(shown("Dashboard"))]);
    driver.on_probe("button|Next", vec![Some(shown("Next"))]);
    // "Details" never appears.
    driver.on_probe("heading|Details", vec![None]);

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver.clone(), config_in(&dir))
        .run(&dashboard_scenario())
        .await;

    match &report.outcome {
        RunOutcome::Failure {
            step,
            reason,
            artifact,
        } => {
            assert_eq!(*step, 2);
            assert!(reason.contains("heading|Details"), "{reason}");
            assert!(reason.contains("timed out"), "{reason}");
            let artifact = artifact.as_ref().expect("diagnostic artifact written");
            let written = std::fs::metadata(artifact).unwrap();
            assert!(written.len() > 0);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(report.exit_code(), 1);
    // The two completed steps before the failure were traced, in order.
    assert_eq!(report.trace.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn no_step_is_attempted_after_a_failure() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("heading|Dashboard", vec![None]);
    driver.on_probe("button|Next", vec![Some(shown("Next"))]);

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver.clone(), config_in(&dir))
        .run(&dashboard_scenario())
        .await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failure { step: 0, .. }
    ));
    assert!(report.trace.is_empty());
    assert_eq!(driver.calls_matching("click"), 0);
    assert_eq!(driver.calls_matching("probe button|Next"), 0);
}

#[tokio::test(start_paused = true)]
async fn click_is_issued_once_even_when_the_wait_polled_many_times() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe(
        "button|Next",
        vec![None, Some(hidden()), Some(hidden()), Some(shown("Next"))],
    );

    let scenario = Scenario::from_yaml(
        r#"
name: patient click
steps:
  - kind: click
    locator: button|Next
    timeout_ms: 5000
"#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver.clone(), config_in(&dir))
        .run(&scenario)
        .await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert!(driver.calls_matching("probe button|Next") >= 4);
    assert_eq!(driver.calls_matching("click"), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_action_fails_that_step() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("heading|Dashboard", vec![Some(shown("Dashboard"))]);
    driver.on_probe("button|Next", vec![Some(shown("Next"))]);
    driver.break_click("button|Next");

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver.clone(), config_in(&dir))
        .run(&dashboard_scenario())
        .await;

    match &report.outcome {
        RunOutcome::Failure { step, reason, .. } => {
            assert_eq!(*step, 1);
            assert!(reason.contains("action failed"), "{reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn capture_step_writes_a_non_empty_file() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("css:div[role='dialog']", vec![Some(shown("Fiche"))]);

    let dir = tempfile::tempdir().unwrap();
    let page_shot = dir.path().join("page.png");
    let dialog_shot = dir.path().join("nested/dialog.png");
    let scenario = Scenario::from_yaml(&format!(
        r#"
name: captures
steps:
  - kind: capture
    path: {}
  - kind: capture
    path: {}
    scope: element
    locator: "css:div[role='dialog']"
"#,
        page_shot.display(),
        dialog_shot.display()
    ))
    .unwrap();

    let report = Runner::new(driver, config_in(&dir)).run(&scenario).await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert!(std::fs::metadata(&page_shot).unwrap().len() > 0);
    assert!(std::fs::metadata(&dialog_shot).unwrap().len() > 0);
}

#[tokio::test(start_paused = true)]
async fn capturing_a_missing_element_fails_not_silently() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("css:div[role='dialog']", vec![None]);

    let dir = tempfile::tempdir().unwrap();
    let shot = dir.path().join("dialog.png");
    let scenario = Scenario::from_yaml(&format!(
        r#"
name: missing capture
steps:
  - kind: capture
    path: {}
    scope: element
    locator: "css:div[role='dialog']"
    timeout_ms: 500
"#,
        shot.display()
    ))
    .unwrap();

    let report = Runner::new(driver, config_in(&dir)).run(&scenario).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failure { step: 0, .. }
    ));
    // No silent empty file.
    assert!(!shot.exists());
}

#[tokio::test(start_paused = true)]
async fn failed_diagnostic_capture_keeps_the_original_reason() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("heading|Dashboard", vec![None]);
    driver.break_page_capture();

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver, config_in(&dir))
        .run(&dashboard_scenario())
        .await;

    match &report.outcome {
        RunOutcome::Failure {
            step,
            reason,
            artifact,
        } => {
            assert_eq!(*step, 0);
            assert!(reason.contains("timed out"), "{reason}");
            assert!(artifact.is_none());
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn navigate_does_not_wait_for_the_destination() {
    let driver = Arc::new(FakeDriver::default());
    driver.on_probe("heading|Dashboard", vec![Some(shown("Dashboard"))]);

    let scenario = Scenario::from_yaml(
        r#"
name: navigate
steps:
  - kind: navigate
    url: http://localhost:3000
  - kind: assert_visible
    locator: heading|Dashboard
"#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let report = Runner::new(driver.clone(), config_in(&dir))
        .run(&scenario)
        .await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(driver.calls()[0], "goto http://localhost:3000");
    // Readiness is owned by the next step's wait, not by navigate itself.
    assert_eq!(driver.calls_matching("probe"), 1);
}
