//! Completion polling.
//!
//! The poller reads the job's `lastCompletedBuild` / `lastSuccessfulBuild`
//! pointers until the expected build number shows up as completed, or the
//! attempt budget runs out. It never looks at anything but the number it
//! was given: correlation is decided before dispatch, not here.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::api::BuildStatusSnapshot;
use crate::crumb::Crumb;
use crate::error::TriggerError;
use crate::http::HttpClient;
use crate::job::JobLocation;
use crate::Result;

/// How long and how patiently to poll.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Pause between attempts.
    pub interval: Duration,

    /// Number of status queries before giving up.
    pub attempts: u64,

    /// Propagate the first query failure instead of absorbing it.
    pub errors_fatal: bool,
}

impl PollPolicy {
    /// Derive the attempt budget from a wall-clock budget:
    /// `ceil(timeout / interval)`, with at least one query even when the
    /// timeout is shorter than the interval. A zero interval is clamped
    /// to one second.
    pub fn from_budget(timeout_secs: u64, interval_secs: u64, errors_fatal: bool) -> Self {
        let interval_secs = interval_secs.max(1);
        PollPolicy {
            interval: Duration::from_secs(interval_secs),
            attempts: timeout_secs.div_ceil(interval_secs).max(1),
            errors_fatal,
        }
    }
}

/// Terminal result of a polling run.
///
/// `Pending` never escapes the loop; the public states are the three
/// ways polling can end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The expected build completed and is the latest successful build.
    Succeeded { build_url: String },

    /// The expected build completed but did not succeed.
    Failed { build_url: String },

    /// Budget exhausted while the expected build was still pending.
    TimedOut { job_url: String, attempts: u64 },
}

/// Poll the job until the expected build reaches a terminal state.
///
/// Each attempt queries once, then sleeps only if the observation was
/// non-terminal and attempts remain; there is no delay before the first
/// query and none after the last. Connectivity failures and non-auth
/// error statuses count as missed attempts unless `errors_fatal`;
/// 401/403 and malformed 200 bodies abort regardless.
pub async fn poll_until_done(
    http: &dyn HttpClient,
    job: &JobLocation,
    crumb: Option<&Crumb>,
    expected: u64,
    policy: &PollPolicy,
) -> Result<PollOutcome> {
    let url = job.status_url(None, crumb)?;

    for attempt in 1..=policy.attempts {
        match query_status(http, job, &url).await {
            Ok(snapshot) => {
                if let Some(outcome) = decide(&snapshot, expected) {
                    return Ok(outcome);
                }
                debug!(attempt, total = policy.attempts, expected, "build still pending");
            }
            Err(err) if err.is_transient() && !policy.errors_fatal => {
                warn!(attempt, error = %err, "status query failed, counting as a missed attempt");
            }
            Err(err) => return Err(err),
        }
        if attempt < policy.attempts {
            sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::TimedOut {
        job_url: job.url().to_string(),
        attempts: policy.attempts,
    })
}

async fn query_status(
    http: &dyn HttpClient,
    job: &JobLocation,
    url: &str,
) -> Result<BuildStatusSnapshot> {
    let reply = http.get(url).await?;
    match reply.status {
        200 => serde_json::from_str(&reply.body).map_err(|err| TriggerError::Protocol {
            url: url.to_string(),
            detail: err.to_string(),
        }),
        401 | 403 => Err(TriggerError::Authorization {
            status: reply.status,
        }),
        status => Err(TriggerError::JobQuery {
            job: job.url().to_string(),
            status,
        }),
    }
}

/// `None` means keep polling. A completed number past the expected one
/// means another actor took our slot; that stays pending (and ends in a
/// timeout) rather than reporting someone else's build.
fn decide(snapshot: &BuildStatusSnapshot, expected: u64) -> Option<PollOutcome> {
    let completed = snapshot.last_completed_build.as_ref()?;
    if completed.number != expected {
        if completed.number > expected {
            warn!(
                completed = completed.number,
                expected, "completed build ran past the expected number, correlation lost"
            );
        }
        return None;
    }

    let succeeded = snapshot
        .last_successful_build
        .as_ref()
        .map(|build| build.number)
        == Some(expected);

    Some(if succeeded {
        PollOutcome::Succeeded {
            build_url: completed.url.clone(),
        }
    } else {
        PollOutcome::Failed {
            build_url: completed.url.clone(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedHttp;

    fn job() -> JobLocation {
        JobLocation::new("http://ci.example.com", "/job/test1", "token1").unwrap()
    }

    fn quick(attempts: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::ZERO,
            attempts,
            errors_fatal: false,
        }
    }

    fn status_body(completed: u64, successful: u64) -> String {
        format!(
            r#"{{"nextBuildNumber":99,
                 "lastCompletedBuild":{{"number":{completed},"url":"http://ci.example.com/job/test1/{completed}/"}},
                 "lastSuccessfulBuild":{{"number":{successful},"url":"http://ci.example.com/job/test1/{successful}/"}}}}"#
        )
    }

    #[test]
    fn test_budget_is_ceiling_division() {
        assert_eq!(PollPolicy::from_budget(30, 10, false).attempts, 3);
        assert_eq!(PollPolicy::from_budget(30, 7, false).attempts, 5);
        assert_eq!(PollPolicy::from_budget(300, 10, false).attempts, 30);
    }

    #[test]
    fn test_budget_guarantees_one_attempt() {
        assert_eq!(PollPolicy::from_budget(5, 10, false).attempts, 1);
        assert_eq!(PollPolicy::from_budget(0, 10, false).attempts, 1);
    }

    #[test]
    fn test_budget_clamps_zero_interval() {
        let policy = PollPolicy::from_budget(10, 0, false);
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.attempts, 10);
    }

    #[tokio::test]
    async fn test_success_once_expected_build_completes() {
        let http = ScriptedHttp::new();
        http.push_get(200, &status_body(4, 4));
        http.push_get(200, &status_body(4, 4));
        http.push_get(200, &status_body(5, 5));

        let outcome = poll_until_done(&http, &job(), None, 5, &quick(5))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Succeeded {
                build_url: "http://ci.example.com/job/test1/5/".to_string()
            }
        );
        assert_eq!(http.gets_seen().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_when_successful_pointer_lags() {
        let http = ScriptedHttp::new();
        http.push_get(200, &status_body(5, 4));

        let outcome = poll_until_done(&http, &job(), None, 5, &quick(5))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                build_url: "http://ci.example.com/job/test1/5/".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_after_exactly_the_budgeted_queries() {
        let http = ScriptedHttp::new();
        for _ in 0..3 {
            http.push_get(200, &status_body(4, 4));
        }

        let policy = PollPolicy {
            interval: Duration::ZERO,
            ..PollPolicy::from_budget(30, 10, false)
        };
        assert_eq!(policy.attempts, 3);

        let outcome = poll_until_done(&http, &job(), None, 5, &policy)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                job_url: "http://ci.example.com/job/test1".to_string(),
                attempts: 3
            }
        );
        assert_eq!(http.gets_seen().len(), 3);
    }

    #[tokio::test]
    async fn test_never_built_job_stays_pending() {
        let http = ScriptedHttp::new();
        http.push_get(200, r#"{"lastCompletedBuild":null,"lastSuccessfulBuild":null}"#);
        http.push_get(200, &status_body(5, 5));

        let outcome = poll_until_done(&http, &job(), None, 5, &quick(3))
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::Succeeded { .. }));
    }

    #[tokio::test]
    async fn test_transient_query_failure_counts_as_missed_attempt() {
        let http = ScriptedHttp::new();
        http.push_get_error("connection reset");
        http.push_get(503, "maintenance");
        http.push_get(200, &status_body(5, 5));

        let outcome = poll_until_done(&http, &job(), None, 5, &quick(3))
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::Succeeded { .. }));
        assert_eq!(http.gets_seen().len(), 3);
    }

    #[tokio::test]
    async fn test_fatal_policy_propagates_first_failure() {
        let http = ScriptedHttp::new();
        http.push_get_error("connection reset");

        let policy = PollPolicy {
            errors_fatal: true,
            ..quick(3)
        };
        let err = poll_until_done(&http, &job(), None, 5, &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerError::Transport(_)));
        assert_eq!(http.gets_seen().len(), 1);
    }

    #[tokio::test]
    async fn test_denied_mid_poll_is_fatal_even_when_tolerant() {
        let http = ScriptedHttp::new();
        http.push_get(401, "");

        let err = poll_until_done(&http, &job(), None, 5, &quick(3))
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerError::Authorization { status: 401 }));
        assert_eq!(http.gets_seen().len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_status_body_is_fatal() {
        let http = ScriptedHttp::new();
        http.push_get(200, "<html>login</html>");

        let err = poll_until_done(&http, &job(), None, 5, &quick(3))
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_overshoot_never_reports_a_foreign_build() {
        let http = ScriptedHttp::new();
        http.push_get(200, &status_body(6, 6));
        http.push_get(200, &status_body(6, 6));

        let outcome = poll_until_done(&http, &job(), None, 5, &quick(2))
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 2, .. }));
    }
}
