//! Scripted in-memory transport for tests
//!
//! Responses are queued per (method, path). Each request pops the next
//! queued response; the last one stays in place and answers every further
//! request, so a single `fail(...)` models a permanently broken endpoint.
//! Like the pooled transport, a request after `close()` reopens the session.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::{ApiRequest, Method, RawResponse, Transport};

type Scripted = Result<RawResponse, TransportError>;

/// A request seen by the mock, with the (possibly paused) clock reading
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    pub at: Instant,
}

/// Transport answering from scripted responses
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    delays: Mutex<HashMap<(Method, String), Duration>>,
    requests: Mutex<Vec<RecordedRequest>>,
    closed: AtomicBool,
    session_open: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route
    pub fn respond(&self, method: Method, path: &str, response: Scripted) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a JSON response
    pub fn json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
        self.respond(method, path, Ok(RawResponse::json(status, &body)))
    }

    /// Queue an empty response with the given status
    pub fn status(&self, method: Method, path: &str, status: u16) -> &Self {
        self.respond(method, path, Ok(RawResponse::new(status, "")))
    }

    /// Queue a transport failure
    pub fn fail(&self, method: Method, path: &str, error: TransportError) -> &Self {
        self.respond(method, path, Err(error))
    }

    /// Hold every answer on a route for `delay` before responding
    pub fn delay(&self, method: Method, path: &str, delay: Duration) -> &Self {
        self.delays
            .lock()
            .unwrap()
            .insert((method, path.to_string()), delay);
        self
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for a route
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.request.method == method && r.request.path == path)
            .count()
    }

    /// Whether `close()` was ever called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether a request has opened a session since the last `close()`
    pub fn has_session(&self) -> bool {
        self.session_open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.session_open.store(true, Ordering::SeqCst);
        self.requests.lock().unwrap().push(RecordedRequest {
            request: request.clone(),
            at: Instant::now(),
        });

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&(request.method, request.path.clone()))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(request.method, request.path.clone()));
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(TransportError::Connect(format!(
                "no scripted response for {} {}",
                request.method, request.path
            ))),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.session_open.store(false, Ordering::SeqCst);
    }
}
