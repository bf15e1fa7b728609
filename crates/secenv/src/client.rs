//! Secret service client
//!
//! Builds request URLs, attaches the credential header and classifies
//! failures. One attempt per call; retries belong to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::error::SecretError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Namespace that requires the credential header
pub const SECRET_NAMESPACE: &str = "/v1/secret";

/// KV v2 read endpoint prefix
pub const SECRET_DATA_PREFIX: &str = "/v1/secret/data";

/// Kubernetes auth exchange endpoint
pub const KUBERNETES_LOGIN_PATH: &str = "/v1/auth/kubernetes/login";

/// Header carrying the service credential
pub const TOKEN_HEADER: &str = "X-Vault-token";

/// Body of the Kubernetes auth exchange
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub role: &'a str,
    pub jwt: &'a str,
}

/// Client for the secret service and its auth endpoint
#[derive(Clone)]
pub struct SecretServiceClient {
    base_url: String,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for SecretServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretServiceClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SecretServiceClient {
    pub fn new(base_url: &str, timeout: Duration, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request to `base_url + path`.
    ///
    /// The credential header is only attached under [`SECRET_NAMESPACE`].
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        credential: Option<&str>,
    ) -> Result<HttpResponse, SecretError> {
        if self.base_url.is_empty() {
            return Err(SecretError::request_build("secret service address is not set"));
        }

        let mut headers = Vec::new();
        if let Some(token) = credential {
            if path.starts_with(SECRET_NAMESPACE) {
                headers.push((TOKEN_HEADER.to_string(), token.to_string()));
            }
        }

        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        };

        tracing::debug!(method = %request.method, path, "Sending secret service request");

        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(TransportError::Build(message))) => Err(SecretError::RequestBuild(message)),
            Ok(Err(err)) => Err(SecretError::transport(err.to_string())),
            Err(_) => Err(SecretError::transport(
                TransportError::Timeout(self.timeout).to_string(),
            )),
        }
    }

    /// `GET /v1/secret/data/{path}`
    pub async fn read_secret(
        &self,
        path: &str,
        credential: &str,
    ) -> Result<HttpResponse, SecretError> {
        let path = secret_data_path(path);
        self.send(Method::GET, &path, None, Some(credential)).await
    }

    /// `PUT /v1/auth/kubernetes/login`
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<HttpResponse, SecretError> {
        let body = serde_json::to_vec(request).map_err(SecretError::Encode)?;
        self.send(Method::PUT, KUBERNETES_LOGIN_PATH, Some(body), None)
            .await
    }
}

/// Join a secret path onto [`SECRET_DATA_PREFIX`].
///
/// Empty and `.` segments are dropped and `..` removes the previous segment,
/// so the result never leaves the data namespace.
pub fn secret_data_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        SECRET_DATA_PREFIX.to_string()
    } else {
        format!("{}/{}", SECRET_DATA_PREFIX, segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;

    fn client(transport: &Arc<MockTransport>) -> SecretServiceClient {
        SecretServiceClient::new(
            "http://vault.test/",
            Duration::from_millis(250),
            transport.clone(),
        )
    }

    #[test]
    fn test_secret_data_path() {
        assert_eq!(secret_data_path("test"), "/v1/secret/data/test");
        assert_eq!(secret_data_path("/a//b/"), "/v1/secret/data/a/b");
        assert_eq!(secret_data_path("a/./b"), "/v1/secret/data/a/b");
        assert_eq!(secret_data_path("a/../b"), "/v1/secret/data/b");
        assert_eq!(secret_data_path("../../sys/seal"), "/v1/secret/data/sys/seal");
        assert_eq!(secret_data_path(""), "/v1/secret/data");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = MockTransport::new();
        assert_eq!(client(&transport).base_url(), "http://vault.test");
    }

    #[tokio::test]
    async fn test_read_secret_attaches_token() {
        let transport = MockTransport::new();
        transport.respond("/v1/secret/data/app/db", 200, r#"{"data":{"data":{}}}"#);

        let response = client(&transport).read_secret("app/db", "s.token").await.unwrap();
        assert_eq!(response.status, 200);

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "http://vault.test/v1/secret/data/app/db");
        assert_eq!(
            request.headers,
            vec![("X-Vault-token".to_string(), "s.token".to_string())]
        );
    }

    #[tokio::test]
    async fn test_login_has_no_token_header() {
        let transport = MockTransport::new();
        transport.respond(KUBERNETES_LOGIN_PATH, 200, "{}");

        let login = LoginRequest {
            role: "billing",
            jwt: "JWT",
        };
        client(&transport).login(&login).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::PUT);
        assert!(request.headers.is_empty());
        assert_eq!(
            request.body.as_deref(),
            Some(br#"{"role":"billing","jwt":"JWT"}"#.as_slice())
        );
    }

    #[tokio::test]
    async fn test_token_not_sent_outside_secret_namespace() {
        let transport = MockTransport::new();
        transport.respond("/v1/sys/health", 200, "{}");

        client(&transport)
            .send(Method::GET, "/v1/sys/health", None, Some("s.token"))
            .await
            .unwrap();
        assert!(transport.last_request().unwrap().headers.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_classified() {
        let transport = MockTransport::new();
        transport.fail_with(TransportError::Build("bad header".into()));
        let err = client(&transport).read_secret("x", "t").await.unwrap_err();
        assert!(matches!(err, SecretError::RequestBuild(_)));

        transport.fail_with(TransportError::Connect("connection refused".into()));
        let err = client(&transport).read_secret("x", "t").await.unwrap_err();
        assert!(matches!(err, SecretError::Transport(m) if m.contains("connection refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_transport_times_out() {
        let transport = MockTransport::new();
        transport.respond("/v1/secret/data/slow", 200, "{}");
        transport.set_delay(Duration::from_secs(5));

        let err = client(&transport).read_secret("slow", "t").await.unwrap_err();
        assert!(matches!(err, SecretError::Transport(m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_empty_address_is_build_error() {
        let transport = MockTransport::new();
        let client =
            SecretServiceClient::new("", Duration::from_millis(250), transport.clone());
        let err = client.read_secret("x", "t").await.unwrap_err();
        assert!(matches!(err, SecretError::RequestBuild(_)));
        assert_eq!(transport.request_count(), 0);
    }
}
