//! HTTP dispatcher
//!
//! Thin, replaceable transport seam: the pipeline hands over a fully composed
//! request and receives status, headers and raw bytes back. Tests substitute
//! a recording fake.

use crate::utils::error::{BrokerError, BrokerResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A composed outbound request
///
/// Headers may carry credentials by the time they reach the dispatcher, so
/// `Debug` redacts them.
#[derive(Clone)]
pub struct DispatchRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl fmt::Debug for DispatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &format!("<{} redacted>", self.headers.len()))
            .field("body_bytes", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

/// Raw upstream response
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl DispatchResponse {
    /// Header lookup by lowercase name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Transport abstraction used by the pipeline
///
/// Any transport failure collapses to the single `NETWORK_ERROR` kind;
/// non-2xx statuses are responses, not errors.
#[async_trait]
pub trait HttpDispatcher: Send + Sync {
    async fn dispatch(&self, request: DispatchRequest) -> BrokerResult<DispatchResponse>;
}

/// Production dispatcher backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: Client,
}

impl ReqwestDispatcher {
    /// Create a dispatcher with the given request timeout
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("butterknife/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpDispatcher for ReqwestDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> BrokerResult<DispatchResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| BrokerError::Network(format!("invalid method: {}", request.method)))?;

        debug!("Dispatching {} {}", request.method, request.url);

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?
            .to_vec();

        debug!("Upstream responded {} ({} bytes)", status, body.len());

        Ok(DispatchResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_creation() {
        assert!(ReqwestDispatcher::new(30).is_ok());
    }

    #[test]
    fn test_debug_redacts_headers() {
        let request = DispatchRequest {
            method: "POST".to_string(),
            url: "https://api.example.com/v1/x".to_string(),
            headers: HashMap::from([("Authorization".to_string(), "Bearer sk-secret".to_string())]),
            body: None,
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_response_header_lookup() {
        let response = DispatchResponse {
            status: 200,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )]),
            body: Vec::new(),
        };
        assert!(response.header("Content-Type").unwrap().contains("application/json"));
        assert!(response.header("x-missing").is_none());
    }
}
