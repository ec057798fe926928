//! Invocation configuration.
//!
//! One `TriggerConfig` per invocation, passed by reference into the
//! orchestrator. There is no process-wide state: concurrent invocations
//! each own their config, crumb, and expected build number.

use std::collections::BTreeMap;

use crate::job::JobLocation;

/// Default overall wait budget (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default pause between status polls (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// HTTP basic auth pair. The password slot also accepts an API token;
/// the server treats them the same.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Everything one trigger invocation needs.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Where the job lives and which token triggers it.
    pub job: JobLocation,

    /// Basic auth; `None` for anonymous-trigger setups.
    pub credentials: Option<Credentials>,

    /// Build parameters. A non-empty map switches dispatch to the
    /// parameterized trigger endpoint.
    pub parameters: BTreeMap<String, String>,

    /// Overall wait budget in seconds.
    pub timeout_secs: u64,

    /// Pause between status polls in seconds.
    pub poll_interval_secs: u64,

    /// Verify TLS certificates. Disable only for personally controlled
    /// servers with self-signed certificates.
    pub tls_verify: bool,

    /// Report the trigger URL without POSTing.
    pub dry_run: bool,

    /// Return right after the trigger is accepted instead of polling.
    pub no_wait: bool,

    /// Propagate the first poll query failure instead of absorbing it
    /// as a missed attempt.
    pub poll_errors_fatal: bool,
}

impl TriggerConfig {
    /// Config with defaults: poll every 10s, give up after 300s,
    /// TLS verified, anonymous, no parameters.
    pub fn new(job: JobLocation) -> Self {
        TriggerConfig {
            job,
            credentials: None,
            parameters: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            tls_verify: true,
            dry_run: false,
            no_wait: false,
            poll_errors_fatal: false,
        }
    }

    /// Set basic auth credentials.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Add one build parameter.
    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the wait budget and the poll interval.
    pub fn with_budget(mut self, timeout_secs: u64, poll_interval_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self.poll_interval_secs = poll_interval_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobLocation {
        JobLocation::new("http://ci.example.com", "/job/test1", "token1").unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = TriggerConfig::new(job());
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.poll_interval_secs, 10);
        assert!(config.tls_verify);
        assert!(!config.dry_run);
        assert!(!config.no_wait);
        assert!(!config.poll_errors_fatal);
        assert!(config.credentials.is_none());
        assert!(config.parameters.is_empty());
    }

    #[test]
    fn test_config_with_credentials() {
        let config = TriggerConfig::new(job()).with_credentials("admin", "secret");
        let creds = config.credentials.unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_config_with_parameters_accumulates() {
        let config = TriggerConfig::new(job())
            .with_parameter("TAGS", "smoke")
            .with_parameter("APP_PORT", "9443");
        assert_eq!(config.parameters.len(), 2);
        assert_eq!(config.parameters["TAGS"], "smoke");
    }

    #[test]
    fn test_config_with_budget() {
        let config = TriggerConfig::new(job()).with_budget(30, 10);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.poll_interval_secs, 10);
    }
}
