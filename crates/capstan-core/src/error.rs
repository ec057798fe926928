//! Error types for the trigger-and-poll protocol

use thiserror::Error;

/// Errors that can occur while triggering or watching a remote build.
///
/// Authorization takes precedence everywhere: a 401/403 from any endpoint
/// maps to [`TriggerError::Authorization`], never to the phase-specific
/// variants, because retrying with the same credentials cannot succeed.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// Server rejected our credentials (HTTP 401/403)
    #[error("access denied by server (HTTP {status})")]
    Authorization { status: u16 },

    /// Server replied with something that is not the expected API payload
    #[error("malformed response from {url}: {detail}")]
    Protocol { url: String, detail: String },

    /// Job status query failed
    #[error("status query for job {job} failed (HTTP {status})")]
    JobQuery { job: String, status: u16 },

    /// Trigger POST was rejected; never retried to avoid double-triggering
    #[error("build trigger rejected (HTTP {status}): {url}")]
    Dispatch { url: String, status: u16 },

    /// Configured server or job text does not form a valid URL
    #[error("invalid URL {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    /// Connection-level failure (DNS, TLS, refused, timed out socket)
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for TriggerError {
    fn from(err: reqwest::Error) -> Self {
        TriggerError::Transport(err.to_string())
    }
}

/// Result type for trigger operations
pub type Result<T> = std::result::Result<T, TriggerError>;

impl TriggerError {
    /// True for errors the polling loop may absorb as a missed attempt.
    ///
    /// Authorization, protocol, and URL errors stay fatal even mid-poll;
    /// only connectivity and non-auth status failures are transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TriggerError::Transport(_) | TriggerError::JobQuery { .. }
        )
    }
}
