//! In-memory fake for the transport trait (testing only)
//!
//! Provides `ScriptedHttp`, which satisfies [`HttpClient`] by replaying
//! queued replies in order and recording every URL it was called with.
//! The queue order doubles as an assertion that the phases run in the
//! order they should.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::TriggerError;
use crate::http::{HttpClient, HttpReply};
use crate::Result;

#[derive(Debug)]
enum Scripted {
    Reply(HttpReply),
    TransportError(String),
}

// ---------------------------------------------------------------------------
// ScriptedHttp
// ---------------------------------------------------------------------------

/// Scripted `HttpClient` backed by FIFO queues, one per verb.
///
/// A request past the end of its script comes back as a transport
/// error naming the URL, so a test with a wrong expectation fails with
/// something readable instead of hanging.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    gets: Mutex<VecDeque<Scripted>>,
    posts: Mutex<VecDeque<Scripted>>,
    seen_gets: Mutex<Vec<String>>,
    seen_posts: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a GET reply.
    pub fn push_get(&self, status: u16, body: &str) {
        self.gets
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(HttpReply::new(status, body)));
    }

    /// Queue a GET connection failure.
    pub fn push_get_error(&self, detail: &str) {
        self.gets
            .lock()
            .unwrap()
            .push_back(Scripted::TransportError(detail.to_string()));
    }

    /// Queue a POST reply status.
    pub fn push_post(&self, status: u16) {
        self.posts
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(HttpReply::new(status, "")));
    }

    /// Queue a POST connection failure.
    pub fn push_post_error(&self, detail: &str) {
        self.posts
            .lock()
            .unwrap()
            .push_back(Scripted::TransportError(detail.to_string()));
    }

    /// URLs GET was called with, in order.
    pub fn gets_seen(&self) -> Vec<String> {
        self.seen_gets.lock().unwrap().clone()
    }

    /// URLs POST was called with, in order.
    pub fn posts_seen(&self) -> Vec<String> {
        self.seen_posts.lock().unwrap().clone()
    }

    fn next(queue: &Mutex<VecDeque<Scripted>>, verb: &str, url: &str) -> Result<HttpReply> {
        match queue.lock().unwrap().pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::TransportError(detail)) => Err(TriggerError::Transport(detail)),
            None => Err(TriggerError::Transport(format!(
                "script exhausted: unexpected {verb} {url}"
            ))),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        self.seen_gets.lock().unwrap().push(url.to_string());
        Self::next(&self.gets, "GET", url)
    }

    async fn post(&self, url: &str) -> Result<u16> {
        self.seen_posts.lock().unwrap().push(url.to_string());
        Self::next(&self.posts, "POST", url).map(|reply| reply.status)
    }
}
