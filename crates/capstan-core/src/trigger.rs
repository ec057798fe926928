//! Trigger orchestration: the four phases in strict order.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::TriggerConfig;
use crate::crumb::fetch_crumb;
use crate::dispatch::dispatch;
use crate::http::HttpClient;
use crate::poll::{poll_until_done, PollOutcome, PollPolicy};
use crate::resolve::next_build_number;
use crate::Result;

/// What one invocation reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Build completed and succeeded.
    Succeeded { build_url: String },

    /// Build completed and failed. Distinct from an operational error:
    /// the protocol worked, the build did not.
    Failed { build_url: String },

    /// Budget exhausted while the build was still pending.
    TimedOut { job_url: String, attempts: u64 },

    /// Trigger accepted, completion not awaited (`no_wait`).
    Dispatched { status: u16 },

    /// Dry run: the URL that would have been POSTed, verbatim.
    DryRun { trigger_url: String },
}

/// Runs crumb negotiation, build-number capture, dispatch, and
/// completion polling, in that order, with no cross-phase retries.
///
/// Correlation is by build number: the `nextBuildNumber` captured
/// before dispatch is the build the poller waits for. Another client
/// triggering the same job between capture and dispatch shifts the
/// numbering; the poll then times out rather than reporting a foreign
/// build. Queue-item correlation would close that gap and is
/// deliberately not attempted here.
pub struct BuildTrigger;

impl BuildTrigger {
    pub async fn run(http: &dyn HttpClient, config: &TriggerConfig) -> Result<TriggerOutcome> {
        let started = Instant::now();
        let job = &config.job;
        info!(job = %job.url(), "triggering remote build");

        let crumb = fetch_crumb(http, job).await?;
        let expected = next_build_number(http, job, crumb.as_ref()).await?;
        let trigger_url = job.trigger_url(&config.parameters, crumb.as_ref())?;

        if config.dry_run {
            info!(%trigger_url, "dry run, not dispatching");
            return Ok(TriggerOutcome::DryRun { trigger_url });
        }

        let status = dispatch(http, &trigger_url).await?;
        if config.no_wait {
            info!(status, expected, "dispatched, not waiting for completion");
            return Ok(TriggerOutcome::Dispatched { status });
        }

        let policy = PollPolicy::from_budget(
            config.timeout_secs,
            config.poll_interval_secs,
            config.poll_errors_fatal,
        );
        let outcome = poll_until_done(http, job, crumb.as_ref(), expected, &policy).await?;

        let elapsed_secs = started.elapsed().as_secs();
        Ok(match outcome {
            PollOutcome::Succeeded { build_url } => {
                info!(%build_url, elapsed_secs, "build succeeded");
                TriggerOutcome::Succeeded { build_url }
            }
            PollOutcome::Failed { build_url } => {
                warn!(%build_url, elapsed_secs, "build failed");
                TriggerOutcome::Failed { build_url }
            }
            PollOutcome::TimedOut { job_url, attempts } => {
                warn!(%job_url, attempts, elapsed_secs, "build still pending, budget spent");
                TriggerOutcome::TimedOut { job_url, attempts }
            }
        })
    }
}
