//! Transport abstraction over the build server's HTTP API.
//!
//! The protocol phases never construct sockets themselves: they take
//! `&dyn HttpClient`, so every phase can be driven against the scripted
//! fake in the `fakes` module. `ReqwestClient` is the production
//! implementation.

use async_trait::async_trait;

use crate::config::Credentials;
use crate::Result;

/// One HTTP reply: status code plus the raw body text.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpReply {
            status,
            body: body.into(),
        }
    }
}

/// Authenticated HTTP exchange with the build server.
///
/// Any status code is an `Ok` reply; `Err` is reserved for
/// connection-level failures (DNS, TLS, refused connections).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url`, returning status and body.
    async fn get(&self, url: &str) -> Result<HttpReply>;

    /// POST `url` with an empty body, returning the status code.
    async fn post(&self, url: &str) -> Result<u16>;
}

/// Production transport backed by `reqwest`, with optional HTTP basic
/// auth (the password slot also accepts an API token).
pub struct ReqwestClient {
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl ReqwestClient {
    /// Create a client. `tls_verify: false` accepts self-signed
    /// certificates, for personally controlled servers only.
    pub fn new(credentials: Option<Credentials>, tls_verify: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("capstan/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!tls_verify)
            .build()?;
        Ok(ReqwestClient {
            client,
            credentials,
        })
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        let response = self.with_auth(self.client.get(url)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }

    async fn post(&self, url: &str) -> Result<u16> {
        let response = self.with_auth(self.client.post(url)).send().await?;
        Ok(response.status().as_u16())
    }
}
