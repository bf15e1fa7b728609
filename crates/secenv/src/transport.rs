//! HTTP transport abstraction
//!
//! The client only needs "send a request, get status and body back". The
//! trait lets tests substitute an in-memory transport for `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use thiserror::Error;

/// A fully-formed outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Status and raw body of a response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Errors raised at the transport seam
#[derive(Debug, Error)]
pub enum TransportError {
    /// Malformed URL, header or body
    #[error("{0}")]
    Build(String),

    /// Connection, protocol or body read failure
    #[error("{0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Trait for sending requests to the secret service
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client whose whole-request timeout is `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::Request, TransportError> {
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::Build(format!("invalid url '{}': {}", request.url, e)))?;

        let mut builder = self.client.request(request.method, url);
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Build(format!("invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::Build(format!("invalid value for header '{}': {}", name, e))
            })?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        builder.build().map_err(|e| TransportError::Build(e.to_string()))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let request = self.build(request)?;

        let response = self.client.execute(request).await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Build(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}
