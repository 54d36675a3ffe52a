// crates/probe-gate-cli/src/main.rs
// ============================================================================
// Module: Probe Gate CLI Entry Point
// Description: Command dispatcher for running, listing, and checking suites.
// Purpose: Turn a suite run into a gate-friendly exit code.
// Dependencies: clap, probe-gate-config, probe-gate-driver, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! `probe-gate` resolves the target from the environment and flags, loads a
//! built-in or file-based suite, runs it, and exits with `0` when every
//! threshold and assertion held, `1` when the suite failed, and `2` for
//! configuration or usage errors. Configuration errors are always raised
//! before the first invocation. Diagnostics go to stderr through `tracing`;
//! reports go to stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod render;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::ArgGroup;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use probe_gate_config::ProcessEnv;
use probe_gate_config::SuitePlan;
use probe_gate_config::TargetConfig;
use probe_gate_config::TargetOverrides;
use probe_gate_config::builtin_suite;
use probe_gate_config::builtin_suite_toml;
use probe_gate_config::builtin_suites;
use probe_gate_config::load_suite_file;
use probe_gate_core::SuiteReport;
use probe_gate_driver::DEFAULT_MAX_RESPONSE_BYTES;
use probe_gate_driver::HttpTransport;
use probe_gate_driver::HttpTransportConfig;
use probe_gate_driver::SuiteRunner;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::render::render_plan;
use crate::render::render_report_json;
use crate::render::render_suite_list;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for a suite that ran and failed a threshold or assertion.
const EXIT_SUITE_FAILED: u8 = 1;
/// Exit code for configuration and usage errors.
const EXIT_CONFIG_ERROR: u8 = 2;
/// Primary log filter environment variable.
const LOG_ENV: &str = "PROBE_GATE_LOG";
/// Fallback log filter environment variable.
const RUST_LOG_ENV: &str = "RUST_LOG";
/// Log filter used when neither flag nor environment selects one.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "probe-gate", version, about = "HTTP smoke, load, and end-to-end gate")]
struct Cli {
    /// Raise log verbosity (`-v` info, `-vv` debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a suite and gate on its verdict.
    Run(RunCommand),
    /// List built-in suites.
    List,
    /// Parse and validate a suite file without running it.
    Validate(ValidateCommand),
    /// Show a built-in suite's scenarios and thresholds.
    Print(PrintCommand),
}

/// Target overrides shared by commands that resolve suites.
#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// API base URL (overrides `PROBE_GATE_BASE_URL` / `BASE_URL`).
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Web front-end URL (overrides `PROBE_GATE_WEB_URL` / `PLAYWRIGHT_BASE_URL`).
    #[arg(long, value_name = "URL")]
    web_url: Option<String>,
    /// Model name substituted into request bodies (overrides `PROBE_GATE_MODEL` / `K6_MODEL`).
    #[arg(long, value_name = "NAME")]
    model: Option<String>,
}

/// Configuration for the `run` command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["suite", "file"])))]
struct RunCommand {
    /// Built-in suite name (see `probe-gate list`).
    #[arg(long, value_name = "NAME")]
    suite: Option<String>,
    /// Suite file path.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Target overrides.
    #[command(flatten)]
    target: TargetArgs,
    /// Run only the named scenario (repeatable).
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,
    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Also write the JSON report to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Maximum response body size in bytes.
    #[arg(
        long,
        value_name = "BYTES",
        env = "PROBE_GATE_MAX_RESPONSE_BYTES",
        default_value_t = DEFAULT_MAX_RESPONSE_BYTES
    )]
    max_response_bytes: usize,
}

/// Configuration for the `validate` command.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Suite file path.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
    /// Target overrides used for placeholder substitution.
    #[command(flatten)]
    target: TargetArgs,
}

/// Configuration for the `print` command.
#[derive(Args, Debug)]
struct PrintCommand {
    /// Built-in suite name.
    #[arg(long, value_name = "NAME")]
    suite: String,
    /// Print the suite-file TOML instead of the resolved outline.
    #[arg(long, action = ArgAction::SetTrue)]
    toml: bool,
    /// Target overrides used for placeholder substitution.
    #[command(flatten)]
    target: TargetArgs,
}

/// Report output formats.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable summary.
    Text,
    /// Pretty-printed JSON report.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper; every variant maps to the configuration exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::List => command_list(),
        Commands::Validate(command) => command_validate(&command),
        Commands::Print(command) => command_print(&command),
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Installs the stderr `tracing` subscriber.
fn init_tracing(verbosity: u8) -> CliResult<()> {
    let primary = std::env::var(LOG_ENV).ok();
    let fallback = std::env::var(RUST_LOG_ENV).ok();
    let directive = log_directive(verbosity, primary.as_deref(), fallback.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|err| CliError::new(format!("invalid log filter '{directive}': {err}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| CliError::new(format!("logging setup failed: {err}")))
}

/// Chooses the log filter: `-v` flags win, then the environment, then `warn`.
fn log_directive(verbosity: u8, primary: Option<&str>, fallback: Option<&str>) -> String {
    match verbosity {
        0 => [primary, fallback]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER)
            .to_string(),
        1 => "info".to_string(),
        _ => "debug".to_string(),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let target = resolve_target(&command.target)?;
    let plan = match (&command.suite, &command.file) {
        (_, Some(path)) => load_file(path, &target)?,
        (Some(name), None) => {
            builtin_suite(name, &target).map_err(|err| CliError::new(err.to_string()))?
        }
        (None, None) => return Err(CliError::new("either --suite or --file is required".into())),
    };
    let transport = HttpTransport::new(&HttpTransportConfig {
        max_response_bytes: command.max_response_bytes,
        ..HttpTransportConfig::default()
    })
    .map_err(|err| CliError::new(err.to_string()))?;
    let runner = SuiteRunner::new(Arc::new(transport)).with_scenario_filter(command.scenarios);
    debug!(suite = %plan.name, scenarios = plan.scenarios.len(), "suite resolved");
    let report = runner.run(&plan).await.map_err(|err| CliError::new(err.to_string()))?;

    if let Some(path) = &command.report {
        write_report_file(path, &report)?;
    }
    let rendered = match command.format {
        OutputFormat::Text => report.to_string(),
        OutputFormat::Json => render_report_json(&report)
            .map_err(|err| CliError::new(format!("report encoding failed: {err}")))?,
    };
    write_stdout(&rendered)?;
    Ok(verdict_exit_code(&report))
}

/// Executes the `list` command.
fn command_list() -> CliResult<ExitCode> {
    write_stdout(&render_suite_list(builtin_suites()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `validate` command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let target = resolve_target(&command.target)?;
    let plan = load_file(&command.file, &target)?;
    write_stdout(&format!(
        "suite '{}' is valid: {} scenario(s), {} threshold(s)",
        plan.name,
        plan.scenarios.len(),
        plan.thresholds.len()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `print` command.
fn command_print(command: &PrintCommand) -> CliResult<ExitCode> {
    let target = resolve_target(&command.target)?;
    let plan =
        builtin_suite(&command.suite, &target).map_err(|err| CliError::new(err.to_string()))?;
    let rendered = if command.toml {
        builtin_suite_toml(&command.suite).unwrap_or_default().trim().to_string()
    } else {
        render_plan(&plan).map_err(|err| CliError::new(format!("suite encoding failed: {err}")))?
    };
    write_stdout(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the target from the process environment and flag overrides.
fn resolve_target(args: &TargetArgs) -> CliResult<TargetConfig> {
    let overrides = TargetOverrides {
        base_url: args.base_url.clone(),
        web_url: args.web_url.clone(),
        model: args.model.clone(),
    };
    TargetConfig::resolve(&ProcessEnv)
        .and_then(|target| target.with_overrides(&overrides))
        .map_err(|err| CliError::new(err.to_string()))
}

/// Loads a suite file, prefixing errors with its path.
fn load_file(path: &Path, target: &TargetConfig) -> CliResult<SuitePlan> {
    load_suite_file(path, target)
        .map_err(|err| CliError::new(format!("{}: {err}", path.display())))
}

/// Maps a report verdict onto the process exit code.
fn verdict_exit_code(report: &SuiteReport) -> ExitCode {
    if report.passed() { ExitCode::SUCCESS } else { ExitCode::from(EXIT_SUITE_FAILED) }
}

/// Writes the JSON report to `path`.
fn write_report_file(path: &Path, report: &SuiteReport) -> CliResult<()> {
    let mut bytes = render_report_json(report)
        .map_err(|err| CliError::new(format!("report encoding failed: {err}")))?
        .into_bytes();
    bytes.push(b'\n');
    fs::write(path, bytes).map_err(|err| {
        CliError::new(format!("failed to write report to {}: {err}", path.display()))
    })
}

/// Writes a block of text to stdout with a trailing newline.
fn write_stdout(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns the configuration exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::from(EXIT_CONFIG_ERROR)
}
