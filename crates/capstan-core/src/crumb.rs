//! Anti-CSRF crumb negotiation.
//!
//! Servers with CSRF protection enabled require a crumb on
//! state-changing requests. The issuer is probed once per invocation;
//! a 404 means the feature is disabled and the rest of the protocol
//! simply runs without a crumb.

use tracing::{debug, info};

use crate::api::CrumbPayload;
use crate::error::TriggerError;
use crate::http::HttpClient;
use crate::job::JobLocation;
use crate::Result;

/// Anti-CSRF token pair: the query-parameter name the server expects
/// and the value it issued. Never persisted across invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub field: String,
    pub value: String,
}

/// Ask the server root for a crumb.
///
/// * 404 ⇒ `Ok(None)`, CSRF protection disabled.
/// * 401/403 ⇒ [`TriggerError::Authorization`], aborting the operation.
/// * 200 with a parseable payload ⇒ `Ok(Some(crumb))`.
/// * Anything else ⇒ [`TriggerError::Protocol`].
pub async fn fetch_crumb(http: &dyn HttpClient, job: &JobLocation) -> Result<Option<Crumb>> {
    let url = job.crumb_issuer_url();
    debug!(%url, "requesting crumb");

    let reply = http.get(&url).await?;
    match reply.status {
        404 => {
            info!("crumb issuer not present, proceeding without CSRF token");
            Ok(None)
        }
        401 | 403 => Err(TriggerError::Authorization {
            status: reply.status,
        }),
        200 => {
            let payload: CrumbPayload =
                serde_json::from_str(&reply.body).map_err(|err| TriggerError::Protocol {
                    url: url.clone(),
                    detail: err.to_string(),
                })?;
            info!(field = %payload.crumb_request_field, "crumb issued");
            Ok(Some(Crumb {
                field: payload.crumb_request_field,
                value: payload.crumb,
            }))
        }
        status => Err(TriggerError::Protocol {
            url,
            detail: format!("unexpected status {status} from crumb issuer"),
        }),
    }
}
