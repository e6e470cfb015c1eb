//! HTTP transport shared by the model client and the page fetcher
//!
//! Both callers only need "send, then look at status/content-type/body", so the
//! transport hands back an owned [`HttpResponse`] and never fails on a non-2xx
//! status. Status interpretation belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Connection-level failure (DNS, TLS, timeout, reset, body read)
#[derive(Debug, Clone, Error)]
#[error("{}{message}", timeout_prefix(.timed_out))]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }
}

fn timeout_prefix(timed_out: &bool) -> &'static str {
    if *timed_out { "timed out: " } else { "" }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

/// A fully buffered HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Declared `Content-Type`, lower-cased
    pub content_type: Option<String>,
    /// `Retry-After` in seconds, when the server sent one
    pub retry_after: Option<u64>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Body decoded as UTF-8, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("")
    }
}

/// Minimal HTTP surface used by the engine
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` with the given headers
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;

    /// POST a JSON body to `url` with the given headers
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        debug!(?timeout, "ReqwestTransport::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn buffer(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase());
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = response.bytes().await?.to_vec();
        debug!(status, ?content_type, body_len = body.len(), "ReqwestTransport::buffer: response read");
        Ok(HttpResponse {
            status,
            content_type,
            retry_after,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        debug!(%url, "ReqwestTransport::get: called");
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        Self::buffer(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        debug!(%url, "ReqwestTransport::post_json: called");
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        Self::buffer(response).await
    }
}
