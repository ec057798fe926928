//! Capstan - remote CI build trigger
//!
//! The `capstan` command triggers a job on a Jenkins-compatible build
//! server and watches it to a terminal state. The outcome line (build
//! URL on success) goes to stdout; log lines go to stderr.
//!
//! ## Exit codes
//!
//! - `0`: build succeeded (also dry-run and `--no-wait` dispatch)
//! - `1`: operational error (authorization, protocol, transport, usage)
//! - `2`: the build completed but failed
//! - `3`: the wait budget ran out while the build was still pending

use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::Level;

use capstan_core::{
    init_tracing, BuildTrigger, Credentials, JobLocation, ReqwestClient, TriggerConfig,
    TriggerOutcome, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS,
};

const EXIT_BUILD_FAILED: u8 = 2;
const EXIT_TIMED_OUT: u8 = 3;

#[derive(Parser)]
#[command(name = "capstan")]
#[command(author = "Capstan Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trigger a remote CI build and wait for the result", long_about = None)]
struct Cli {
    /// Server base URL, e.g. http://ci.example.com:8080
    #[arg(
        long,
        env = "CAPSTAN_SERVER",
        required_unless_present = "job_url",
        conflicts_with = "job_url"
    )]
    server: Option<String>,

    /// Job path on the server, e.g. /job/test1
    #[arg(long, required_unless_present = "job_url", conflicts_with = "job_url")]
    job: Option<String>,

    /// Combined job URL, replacing --server and --job
    #[arg(long, value_name = "URL")]
    job_url: Option<String>,

    /// Trigger token configured on the job
    #[arg(long, env = "CAPSTAN_TOKEN")]
    token: String,

    /// Build parameter as key=value; repeat for more
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// User name for HTTP basic auth
    #[arg(long, env = "CAPSTAN_USER", requires = "password")]
    username: Option<String>,

    /// Password or API token for HTTP basic auth
    #[arg(long, env = "CAPSTAN_PASSWORD", requires = "username")]
    password: Option<String>,

    /// Overall wait budget in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Pause between status checks in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Skip TLS certificate verification (self-signed servers only)
    #[arg(long)]
    insecure: bool,

    /// Report the trigger URL without starting a build
    #[arg(long)]
    dry_run: bool,

    /// Exit once the trigger is accepted instead of waiting
    #[arg(long)]
    no_wait: bool,

    /// Treat the first failed status check as fatal instead of retrying
    #[arg(long)]
    fatal_poll_errors: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.log_json, level);

    match run(cli).await {
        Ok(outcome) => {
            println!("{}", outcome_line(&outcome));
            ExitCode::from(exit_code(&outcome))
        }
        Err(err) => {
            eprintln!("capstan: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<TriggerOutcome> {
    let config = build_config(cli)?;
    let http = ReqwestClient::new(config.credentials.clone(), config.tls_verify)?;
    let outcome = BuildTrigger::run(&http, &config).await?;
    Ok(outcome)
}

/// Turn parsed arguments into one invocation's configuration.
fn build_config(cli: Cli) -> Result<TriggerConfig> {
    let job = match (&cli.job_url, &cli.server, &cli.job) {
        (Some(combined), _, _) => JobLocation::from_combined(combined, &cli.token)?,
        (None, Some(server), Some(job_path)) => JobLocation::new(server, job_path, &cli.token)?,
        _ => bail!("either --job-url or both --server and --job are required"),
    };

    let mut parameters = BTreeMap::new();
    for raw in &cli.params {
        let (key, value) = parse_param(raw)?;
        parameters.insert(key, value);
    }

    let credentials = match (cli.username, cli.password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        (None, None) => None,
        _ => bail!("--username and --password must be supplied together"),
    };

    let mut config = TriggerConfig::new(job).with_budget(cli.timeout, cli.poll_interval);
    config.credentials = credentials;
    config.parameters = parameters;
    config.tls_verify = !cli.insecure;
    config.dry_run = cli.dry_run;
    config.no_wait = cli.no_wait;
    config.poll_errors_fatal = cli.fatal_poll_errors;
    Ok(config)
}

/// Split a `key=value` argument at the first `=`.
fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("invalid parameter {raw:?}, expected key=value"),
    }
}

/// One line on stdout describing the outcome.
///
/// Success prints the completed build's URL and dry-run prints the
/// trigger URL, both bare, so wrapping scripts can consume them directly.
fn outcome_line(outcome: &TriggerOutcome) -> String {
    match outcome {
        TriggerOutcome::Succeeded { build_url } => build_url.clone(),
        TriggerOutcome::Failed { build_url } => format!("build failed: {build_url}"),
        TriggerOutcome::TimedOut { job_url, attempts } => {
            format!("timed out after {attempts} status checks: {job_url}")
        }
        TriggerOutcome::Dispatched { status } => format!("build trigger accepted (HTTP {status})"),
        TriggerOutcome::DryRun { trigger_url } => trigger_url.clone(),
    }
}

/// Outcome-to-exit-code mapping; operational errors exit 1 via `main`.
fn exit_code(outcome: &TriggerOutcome) -> u8 {
    match outcome {
        TriggerOutcome::Succeeded { .. }
        | TriggerOutcome::Dispatched { .. }
        | TriggerOutcome::DryRun { .. } => 0,
        TriggerOutcome::Failed { .. } => EXIT_BUILD_FAILED,
        TriggerOutcome::TimedOut { .. } => EXIT_TIMED_OUT,
    }
}
