//! Next-build-number capture.

use tracing::{debug, info};

use crate::api::NextBuildPayload;
use crate::crumb::Crumb;
use crate::error::TriggerError;
use crate::http::HttpClient;
use crate::job::JobLocation;
use crate::Result;

/// Read the number the next build of this job will get.
///
/// Captured strictly before dispatch; the poller matches completed
/// builds against this value and nothing else. A concurrent trigger
/// landing between this read and our dispatch shifts the numbering,
/// which the protocol cannot detect (documented on the orchestrator).
pub async fn next_build_number(
    http: &dyn HttpClient,
    job: &JobLocation,
    crumb: Option<&Crumb>,
) -> Result<u64> {
    let url = job.status_url(Some("nextBuildNumber"), crumb)?;
    debug!(%url, "resolving next build number");

    let reply = http.get(&url).await?;
    match reply.status {
        200 => {
            let payload: NextBuildPayload =
                serde_json::from_str(&reply.body).map_err(|err| TriggerError::Protocol {
                    url,
                    detail: err.to_string(),
                })?;
            info!(
                expected = payload.next_build_number,
                "captured next build number"
            );
            Ok(payload.next_build_number)
        }
        401 | 403 => Err(TriggerError::Authorization {
            status: reply.status,
        }),
        status => Err(TriggerError::JobQuery {
            job: job.url().to_string(),
            status,
        }),
    }
}
