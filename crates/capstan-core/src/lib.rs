//! Capstan Core Library
//!
//! Triggers a build on a remote Jenkins-compatible server and polls it
//! to a terminal state. Four phases, strictly ordered:
//!
//! 1. Crumb negotiation (anti-CSRF token, optional on the server side)
//! 2. Next-build-number capture, before anything changes state
//! 3. Dispatch: one POST, never retried
//! 4. Completion polling against the captured number
//!
//! Every phase talks through the [`HttpClient`] trait, so the whole
//! protocol runs against the scripted fake in [`fakes`] in tests.

pub mod api;
pub mod config;
pub mod crumb;
pub mod dispatch;
pub mod error;
pub mod fakes;
pub mod http;
pub mod job;
pub mod poll;
pub mod resolve;
pub mod telemetry;
pub mod trigger;

pub use api::{BuildRef, BuildStatusSnapshot};
pub use config::{
    Credentials, TriggerConfig, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS,
};
pub use crumb::{fetch_crumb, Crumb};
pub use dispatch::dispatch;
pub use error::{Result, TriggerError};
pub use http::{HttpClient, HttpReply, ReqwestClient};
pub use job::{join_url, JobLocation};
pub use poll::{poll_until_done, PollOutcome, PollPolicy};
pub use resolve::next_build_number;
pub use telemetry::init_tracing;
pub use trigger::{BuildTrigger, TriggerOutcome};

/// Capstan version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
