//! uivet CLI
//!
//! Runs a scripted UI verification scenario against a browser session and
//! maps the outcome to a process exit code, so it can gate automation
//! pipelines.
//!
//! Usage:
//!   uivet run scenario.yaml --attach 127.0.0.1:9222
//!   uivet run scenario.yaml --launch --headless
//!   uivet check scenario.yaml

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use uivet::{ConnectMode, LaunchConfig, Runner, RunnerConfig, Scenario, Session};

#[derive(Parser)]
#[command(name = "uivet")]
#[command(about = "UI verification harness - drive a browser through a scripted scenario")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario against a browser session and exit 0 on success
    Run(RunArgs),
    /// Load and validate a scenario file without connecting anywhere
    Check {
        /// Scenario file (.yaml or .json)
        scenario: PathBuf,
    },
}

#[derive(Parser)]
struct RunArgs {
    /// Scenario file (.yaml or .json)
    scenario: PathBuf,

    /// Attach to a running instance's remote debugging endpoint (host:port)
    #[arg(long, value_name = "HOST:PORT", conflicts_with = "launch")]
    attach: Option<String>,

    /// Launch a fresh isolated browser instead of attaching
    #[arg(long)]
    launch: bool,

    /// With --launch: run the browser headless
    #[arg(long, default_value_t = true)]
    headless: bool,

    /// Where the on-failure diagnostic screenshot goes
    #[arg(long, value_name = "PATH", default_value = "uivet-failure.png")]
    failure_artifact: PathBuf,

    /// Wait budget for steps without their own timeout_ms
    #[arg(long, value_name = "MS", default_value_t = 30_000)]
    default_timeout_ms: u64,
}

fn parse_endpoint(raw: &str) -> Result<(String, u16)> {
    let (host, port) = raw
        .rsplit_once(':')
        .with_context(|| format!("expected HOST:PORT, got '{raw}'"))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid port in '{raw}'"))?;
    if host.is_empty() {
        bail!("empty host in '{raw}'");
    }
    Ok((host.to_string(), port))
}

fn connect_mode(args: &RunArgs) -> Result<ConnectMode> {
    if let Some(endpoint) = &args.attach {
        let (host, port) = parse_endpoint(endpoint)?;
        return Ok(ConnectMode::Attach { host, port });
    }
    if args.launch {
        return Ok(ConnectMode::Launch(LaunchConfig {
            headless: args.headless,
            ..LaunchConfig::default()
        }));
    }
    bail!("pick one of --attach HOST:PORT or --launch");
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading {}", args.scenario.display()))?;
    let mode = connect_mode(&args)?;

    let mut session = Session::connect(mode)
        .await
        .context("establishing browser session")?;

    let config = RunnerConfig {
        default_timeout: Duration::from_millis(args.default_timeout_ms),
        failure_artifact: args.failure_artifact.clone(),
    };
    let report = Runner::new(session.driver(), config).run(&scenario).await;

    // The session is released on every path; run() itself never errors.
    session.close().await;

    Ok(ExitCode::from(report.exit_code() as u8))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check { scenario } => {
            let loaded = Scenario::load(&scenario)
                .with_context(|| format!("loading {}", scenario.display()))?;
            info!(
                steps = loaded.steps.len(),
                "scenario '{}' is valid", loaded.name
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
