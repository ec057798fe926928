//! Wire payloads for the server's JSON API.
//!
//! Only the fields the protocol reads are declared; everything else in the
//! server's (large) job document is ignored by serde.

use serde::Deserialize;

/// Crumb issuer reply: the header/parameter name and the token value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrumbPayload {
    pub crumb_request_field: String,
    pub crumb: String,
}

/// Reply to the `tree=nextBuildNumber` filtered job query.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextBuildPayload {
    pub next_build_number: u64,
}

/// Reference to a concrete build of a job.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BuildRef {
    pub number: u64,
    pub url: String,
}

/// Point-in-time view of a job's terminal build pointers.
///
/// Both fields are `null` on a job that has never built, and
/// `lastSuccessfulBuild` lags `lastCompletedBuild` when the newest
/// completed build failed. Read fresh on every poll, never cached.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatusSnapshot {
    #[serde(default)]
    pub last_completed_build: Option<BuildRef>,

    #[serde(default)]
    pub last_successful_build: Option<BuildRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crumb_payload_parses() {
        let payload: CrumbPayload = serde_json::from_str(
            r#"{"_class":"hudson.security.csrf.DefaultCrumbIssuer","crumb":"ab12","crumbRequestField":"Jenkins-Crumb"}"#,
        )
        .unwrap();
        assert_eq!(payload.crumb_request_field, "Jenkins-Crumb");
        assert_eq!(payload.crumb, "ab12");
    }

    #[test]
    fn test_next_build_payload_parses() {
        let payload: NextBuildPayload =
            serde_json::from_str(r#"{"_class":"hudson.model.FreeStyleProject","nextBuildNumber":57}"#)
                .unwrap();
        assert_eq!(payload.next_build_number, 57);
    }

    #[test]
    fn test_snapshot_with_both_builds() {
        let snapshot: BuildStatusSnapshot = serde_json::from_str(
            r#"{
                "lastCompletedBuild": {"number": 5, "url": "http://ci.example.com/job/deploy/5/"},
                "lastSuccessfulBuild": {"number": 4, "url": "http://ci.example.com/job/deploy/4/"}
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.last_completed_build.as_ref().unwrap().number, 5);
        assert_eq!(snapshot.last_successful_build.as_ref().unwrap().number, 4);
    }

    #[test]
    fn test_snapshot_on_never_built_job() {
        let snapshot: BuildStatusSnapshot = serde_json::from_str(
            r#"{"lastCompletedBuild": null, "lastSuccessfulBuild": null}"#,
        )
        .unwrap();
        assert!(snapshot.last_completed_build.is_none());
        assert!(snapshot.last_successful_build.is_none());
    }

    #[test]
    fn test_snapshot_with_fields_absent() {
        let snapshot: BuildStatusSnapshot = serde_json::from_str(r#"{}"#).unwrap();
        assert!(snapshot.last_completed_build.is_none());
        assert!(snapshot.last_successful_build.is_none());
    }
}
