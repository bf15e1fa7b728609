//! Mock secret service for E2E tests
//!
//! Serves configurable responses per request path and records every request
//! it receives. Paths without a configured response get Vault's 404 body.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Path of the Kubernetes auth exchange
pub const LOGIN_PATH: &str = "/v1/auth/kubernetes/login";

/// A recorded HTTP request for test assertions
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// HTTP method (GET, PUT, etc.)
    pub method: String,
    /// Request URI path
    pub uri: String,
    /// Request headers, names lowercased
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Routes = Arc<RwLock<HashMap<String, (StatusCode, Vec<u8>)>>>;

/// A mock secret service listening on an ephemeral port
pub struct MockVaultService {
    addr: SocketAddr,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    routes: Routes,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockVaultService {
    /// Start the mock service
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock secret service");
        let addr = listener.local_addr().unwrap();

        let requests: Arc<RwLock<Vec<RecordedRequest>>> = Arc::new(RwLock::new(Vec::new()));
        let routes: Routes = Arc::new(RwLock::new(HashMap::new()));
        let delay: Arc<RwLock<Option<Duration>>> = Arc::new(RwLock::new(None));

        let requests_clone = requests.clone();
        let routes_clone = routes.clone();
        let delay_clone = delay.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let requests = requests_clone.clone();
                let routes = routes_clone.clone();
                let delay = delay_clone.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        let routes = routes.clone();
                        let delay = delay.clone();
                        async move {
                            let method = req.method().to_string();
                            let uri = req.uri().path().to_string();
                            let req_headers: Vec<(String, String)> = req
                                .headers()
                                .iter()
                                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                                .collect();

                            let req_body = req
                                .into_body()
                                .collect()
                                .await
                                .map(|b| b.to_bytes().to_vec())
                                .unwrap_or_default();

                            tracing::debug!(%method, %uri, "Mock secret service request");

                            let (status, body) = routes
                                .read()
                                .get(&uri)
                                .cloned()
                                .unwrap_or((StatusCode::NOT_FOUND, br#"{"errors":[]}"#.to_vec()));

                            requests.write().push(RecordedRequest {
                                method,
                                uri,
                                headers: req_headers,
                                body: req_body,
                            });

                            let pause = *delay.read();
                            if let Some(pause) = pause {
                                tokio::time::sleep(pause).await;
                            }

                            Ok::<_, Infallible>(
                                Response::builder()
                                    .status(status)
                                    .header("content-type", "application/json")
                                    .body(Full::new(Bytes::from(body)))
                                    .unwrap(),
                            )
                        }
                    });

                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            requests,
            routes,
            delay,
        }
    }

    /// Base URL to configure the resolver with (e.g. "http://127.0.0.1:12345")
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Answer `path` with a raw status and body
    pub fn set_response(&self, path: &str, status: StatusCode, body: impl Into<Vec<u8>>) {
        self.routes
            .write()
            .insert(path.to_string(), (status, body.into()));
    }

    /// Store `fields` as the KV v2 secret at `path`
    pub fn set_secret(&self, path: &str, fields: Value) {
        let body = json!({
            "data": {
                "data": fields,
                "metadata": { "version": 1 }
            }
        });
        self.set_response(
            &format!("/v1/secret/data/{}", path),
            StatusCode::OK,
            body.to_string(),
        );
    }

    /// Make the Kubernetes login issue `token` with a lease of `lease_secs`
    pub fn set_login(&self, token: &str, lease_secs: u64) {
        let body = json!({
            "auth": {
                "client_token": token,
                "lease_duration": lease_secs,
                "renewable": true
            }
        });
        self.set_response(LOGIN_PATH, StatusCode::OK, body.to_string());
    }

    /// Delay every response by `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = Some(delay);
    }

    /// Get all recorded requests
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().clone()
    }

    /// Get the last recorded request (if any)
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.read().last().cloned()
    }

    /// Number of recorded requests for `path`
    pub fn count_for(&self, path: &str) -> usize {
        self.requests.read().iter().filter(|r| r.uri == path).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_secret() {
        let vault = MockVaultService::start().await;
        vault.set_secret("app/db", json!({ "password": "hunter2" }));

        let resp = reqwest::Client::new()
            .get(format!("{}/v1/secret/data/app/db", vault.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["data"]["password"], "hunter2");

        let requests = vault.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].uri, "/v1/secret/data/app/db");
    }

    #[tokio::test]
    async fn test_mock_listens_on_loopback() {
        let vault = MockVaultService::start().await;
        assert!(vault.addr().ip().is_loopback());
        assert_ne!(vault.addr().port(), 0);
        assert_eq!(vault.url(), format!("http://{}", vault.addr()));
    }

    #[tokio::test]
    async fn test_mock_unknown_path_is_404() {
        let vault = MockVaultService::start().await;

        let resp = reqwest::Client::new()
            .get(format!("{}/v1/secret/data/nope", vault.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 404);
        assert_eq!(vault.count_for("/v1/secret/data/nope"), 1);
    }
}
