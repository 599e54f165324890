//! HTTP transport for the AppFlowy API.
//!
//! A [`Transport`] performs exactly one exchange and reports the outcome.
//! Authentication, retries, and response interpretation are layered on top
//! in [`crate::session`] and [`crate::client`].

use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Settings of the reqwest-based transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Custom CA certificate for self-hosted servers (PEM format)
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            ca_cert_path: None,
        }
    }
}

/// A fully resolved outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Bearer token for the `Authorization` header
    pub bearer_token: Option<String>,
    /// Query parameters; `None` sends no query string
    pub query: Option<Vec<(String, String)>>,
    /// JSON body; `None` sends no body
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a request without token, query, or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer_token: None,
            query: None,
            body: None,
        }
    }
}

/// One HTTP exchange with a JSON response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the decoded response body.
    ///
    /// An empty 2xx body decodes to `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns error on connection failure, non-2xx status, or a body that is
    /// not valid JSON.
    async fn send(&self, request: &HttpRequest) -> Result<Value, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created, or if the CA
    /// certificate file cannot be read or parsed.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().timeout(config.timeout).use_rustls_tls();

        if let Some(ca_path) = &config.ca_cert_path {
            let ca_cert = fs::read(ca_path).map_err(|e| {
                TransportError::Init(format!(
                    "failed to read CA certificate {}: {e}",
                    ca_path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&ca_cert).map_err(|e| {
                TransportError::Init(format!("failed to parse CA certificate: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
            tracing::debug!(ca_path = %ca_path.display(), "Loaded custom CA certificate");
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Init(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<Value, TransportError> {
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self.client.request(request.method.clone(), &request.url);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(query) = &request.query {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        decode_body(&text)
    }
}

fn decode_body(text: &str) -> Result<Value, TransportError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| TransportError::Decode(e.to_string()))
}
