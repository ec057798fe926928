//! Job addressing: URL joining and endpoint construction.
//!
//! All URLs the protocol touches are built here, so the joining rule
//! (exactly one `/` between segments, whatever the caller supplied) and
//! the query-string layout (token first, endpoint extras, crumb last)
//! live in one place.

use std::collections::BTreeMap;

use reqwest::Url;

use crate::crumb::Crumb;
use crate::error::TriggerError;
use crate::Result;

/// Join URL segments with exactly one `/` between them.
///
/// Each segment is stripped of leading and trailing slashes; empty
/// segments vanish instead of doubling the separator.
pub fn join_url<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse(text: &str) -> Result<Url> {
    Url::parse(text).map_err(|err| TriggerError::InvalidUrl {
        url: text.to_string(),
        detail: err.to_string(),
    })
}

/// Where a job lives: the server root (crumb issuer scope) and the full
/// job URL, plus the trigger token the job expects.
#[derive(Debug, Clone)]
pub struct JobLocation {
    server: String,
    job_url: String,
    token: String,
}

impl JobLocation {
    /// Build from a server base URL and a job path such as `/job/deploy`.
    pub fn new(server: &str, job_path: &str, token: &str) -> Result<Self> {
        let job_url = join_url(&[server, job_path]);
        let parsed = parse(&job_url)?;
        if parsed.host_str().is_none() {
            return Err(TriggerError::InvalidUrl {
                url: job_url,
                detail: "missing host".to_string(),
            });
        }
        Ok(JobLocation {
            server: server.trim_end_matches('/').to_string(),
            job_url,
            token: token.to_string(),
        })
    }

    /// Build from a combined job URL such as
    /// `http://ci.example.com/jenkins/job/deploy`.
    ///
    /// The server root is everything before the first `/job/` segment,
    /// which keeps context-path installations working; a URL without a
    /// `/job/` segment falls back to the scheme-and-authority origin.
    pub fn from_combined(combined: &str, token: &str) -> Result<Self> {
        let job_url = combined.trim_end_matches('/').to_string();
        let parsed = parse(&job_url)?;
        if parsed.host_str().is_none() {
            return Err(TriggerError::InvalidUrl {
                url: job_url,
                detail: "missing host".to_string(),
            });
        }
        let server = match job_url.find("/job/") {
            Some(idx) => job_url[..idx].to_string(),
            None => parsed.origin().ascii_serialization(),
        };
        Ok(JobLocation {
            server,
            job_url,
            token: token.to_string(),
        })
    }

    /// Full job URL, no trailing slash.
    pub fn url(&self) -> &str {
        &self.job_url
    }

    /// Server root the job lives under.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Crumb issuer endpoint on the server root.
    pub fn crumb_issuer_url(&self) -> String {
        join_url(&[self.server.as_str(), "crumbIssuer/api/json"])
    }

    /// Job status endpoint, optionally with a `tree` filter to keep the
    /// payload minimal.
    pub fn status_url(&self, tree: Option<&str>, crumb: Option<&Crumb>) -> Result<String> {
        let mut url = parse(&join_url(&[self.job_url.as_str(), "api/json"]))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("token", &self.token);
            if let Some(tree) = tree {
                pairs.append_pair("tree", tree);
            }
            if let Some(crumb) = crumb {
                pairs.append_pair(&crumb.field, &crumb.value);
            }
        }
        Ok(url.to_string())
    }

    /// Trigger endpoint: `build` when the parameter map is empty,
    /// `buildWithParameters` otherwise. Parameters are percent-encoded
    /// and appended in map order, so the URL is deterministic.
    pub fn trigger_url(
        &self,
        parameters: &BTreeMap<String, String>,
        crumb: Option<&Crumb>,
    ) -> Result<String> {
        let endpoint = if parameters.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let mut url = parse(&join_url(&[self.job_url.as_str(), endpoint]))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("token", &self.token);
            for (key, value) in parameters {
                pairs.append_pair(key, value);
            }
            if let Some(crumb) = crumb {
                pairs.append_pair(&crumb.field, &crumb.value);
            }
        }
        Ok(url.to_string())
    }
}
