//! Build dispatch: the one state-changing request in the protocol.

use tracing::{debug, info};

use crate::error::TriggerError;
use crate::http::HttpClient;
use crate::Result;

/// POST the trigger URL once.
///
/// 200 and 201 both count as acceptance (servers differ). Anything
/// else is a [`TriggerError::Dispatch`] carrying the URL and status,
/// and the POST is never retried: a retry could start a second build.
pub async fn dispatch(http: &dyn HttpClient, url: &str) -> Result<u16> {
    debug!(%url, "dispatching build");

    let status = http.post(url).await?;
    match status {
        200 | 201 => {
            info!(status, "build trigger accepted");
            Ok(status)
        }
        401 | 403 => Err(TriggerError::Authorization { status }),
        other => Err(TriggerError::Dispatch {
            url: url.to_string(),
            status: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedHttp;

    const URL: &str = "http://ci.example.com/job/test1/build?token=token1";

    #[tokio::test]
    async fn test_both_acceptance_statuses() {
        for status in [200u16, 201] {
            let http = ScriptedHttp::new();
            http.push_post(status);
            assert_eq!(dispatch(&http, URL).await.unwrap(), status);
            assert_eq!(http.posts_seen(), vec![URL]);
        }
    }

    #[tokio::test]
    async fn test_rejection_carries_url_and_status() {
        let http = ScriptedHttp::new();
        http.push_post(405);

        let err = dispatch(&http, URL).await.unwrap_err();
        match err {
            TriggerError::Dispatch { url, status } => {
                assert_eq!(url, URL);
                assert_eq!(status, 405);
            }
            other => panic!("expected Dispatch, got: {other}"),
        }
    }

    #[tokio::test]
    async fn test_denied_dispatch_is_authorization() {
        let http = ScriptedHttp::new();
        http.push_post(403);

        let err = dispatch(&http, URL).await.unwrap_err();
        assert!(matches!(err, TriggerError::Authorization { status: 403 }));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let http = ScriptedHttp::new();
        http.push_post_error("connection reset");

        let err = dispatch(&http, URL).await.unwrap_err();
        assert!(matches!(err, TriggerError::Transport(_)));
    }
}
