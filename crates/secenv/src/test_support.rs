//! In-memory transport for unit tests

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

const BASE: &str = "http://vault.test";

/// Scripted transport that records every request it receives
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    requests: Mutex<Vec<HttpRequest>>,
    failure: Mutex<Option<TransportError>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer requests for `path` with `status` and `body`
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .insert(path.to_string(), (status, body.as_bytes().to_vec()));
    }

    /// Fail the next request with `err`
    pub fn fail_with(&self, err: TransportError) {
        *self.failure.lock() = Some(err);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests whose URL ends with `path`
    pub fn count_for(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request
            .url
            .strip_prefix(BASE)
            .unwrap_or(&request.url)
            .to_string();
        self.requests.lock().push(request);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failure.lock().take() {
            return Err(err);
        }

        let (status, body) = self
            .routes
            .lock()
            .get(&path)
            .cloned()
            .unwrap_or((404, br#"{"errors":[]}"#.to_vec()));
        Ok(HttpResponse { status, body })
    }
}
