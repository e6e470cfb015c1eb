//! Page fetching with format fallback
//!
//! The primary fetch behaves like a browser asking for HTML. When the server
//! refuses (non-success status) or answers with a non-text type, one raw
//! retry is made with a wider header set, and the body is decoded by content
//! type. Anything else fails immediately.

mod decoder;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use decoder::{Decoder, DecoderSet, HtmlDecoder, PdfDecoder};

use crate::http::{HttpResponse, HttpTransport, TransportError};

/// Browser user agent sent with every page request
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Referrer sent with every page request
pub const REFERRER: &str = "https://www.google.com";

/// Per-request timeout for page and search fetches
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Page fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unsupported mime type '{mime}' for {url}")]
    UnsupportedMime { url: String, mime: String },

    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Decode(String),

    #[error("Invalid decoder pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to fetch URL ({primary}); fallback fetch failed: {fallback}")]
    FallbackFailed {
        primary: Box<FetchError>,
        fallback: Box<FetchError>,
    },
}

/// Fetches a URL and returns its readable text
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    decoders: DecoderSet,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Result<Self, FetchError> {
        debug!("Fetcher::new: called");
        Ok(Self {
            transport,
            decoders: DecoderSet::new()?,
        })
    }

    /// Fetch `url` and extract its text, falling back once on status or mime failures
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(%url, "Fetcher::fetch_text: called");
        let primary = match self.primary(url).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        match &primary {
            FetchError::HttpStatus { status, .. } => {
                info!(%url, status, "Primary fetch refused, retrying with browser headers");
                match self.raw_html(url).await {
                    Ok(text) => Ok(text),
                    Err(fallback) => Err(both(primary, fallback)),
                }
            }
            FetchError::UnsupportedMime { mime, .. } => {
                let pdf_hint = mime.to_lowercase().contains("pdf");
                info!(%url, %mime, "Non-HTML content, retrying as raw download");
                match self.raw_any(url, pdf_hint).await {
                    Ok(text) => Ok(text),
                    Err(fallback) => Err(both(primary, fallback)),
                }
            }
            _ => {
                warn!(%url, error = %primary, "Fetch failed");
                Err(primary)
            }
        }
    }

    async fn primary(&self, url: &str) -> Result<String, FetchError> {
        let headers = [("User-Agent", USER_AGENT), ("Referer", REFERRER), ("Accept", ACCEPT_HTML)];
        let response = self.transport.get(url, &headers).await?;

        if !response.is_success() {
            debug!(status = response.status, "Fetcher::primary: non-success status");
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let mime = response.content_type();
        if !self.decoders.is_text_type(mime) {
            debug!(%mime, "Fetcher::primary: unsupported mime");
            return Err(FetchError::UnsupportedMime {
                url: url.to_string(),
                mime: mime.to_string(),
            });
        }

        self.decoders.html().decode(&response.body)
    }

    /// Raw GET parsed as HTML regardless of status
    async fn raw_html(&self, url: &str) -> Result<String, FetchError> {
        let headers = [
            ("User-Agent", USER_AGENT),
            ("Accept-Language", ACCEPT_LANGUAGE),
            ("Referer", REFERRER),
            ("Accept", ACCEPT_HTML),
        ];
        let response = self.transport.get(url, &headers).await?;
        debug!(status = response.status, "Fetcher::raw_html: fallback response");
        self.decoders.html().decode(&response.body)
    }

    /// Raw GET decoded by its declared content type
    async fn raw_any(&self, url: &str, pdf_hint: bool) -> Result<String, FetchError> {
        let headers = [
            ("User-Agent", USER_AGENT),
            ("Accept-Language", ACCEPT_LANGUAGE),
            ("Referer", REFERRER),
            ("Accept", "*/*"),
        ];
        let response: HttpResponse = self.transport.get(url, &headers).await?;
        let decoder = self.decoders.select(response.content_type(), pdf_hint);
        decoder.decode(&response.body)
    }
}

fn both(primary: FetchError, fallback: FetchError) -> FetchError {
    warn!(%primary, %fallback, "Fallback fetch failed");
    FetchError::FallbackFailed {
        primary: Box::new(primary),
        fallback: Box::new(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{ScriptedTransport, response};

    const PAGE: &str = "<html><body><h1>Sleep</h1><p>Memory consolidation happens during sleep.</p></body></html>";

    fn fetcher(transport: &Arc<ScriptedTransport>) -> Fetcher {
        Fetcher::new(transport.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_primary_html() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(response(200, "text/html; charset=utf-8", PAGE))]));
        let text = fetcher(&transport).fetch_text("https://example.com/a").await.unwrap();

        assert!(text.contains("Memory consolidation"));
        assert_eq!(transport.request_count(), 1);
        let sent = &transport.requests()[0];
        assert_eq!(sent.header("user-agent"), Some(USER_AGENT));
        assert_eq!(sent.header("referer"), Some(REFERRER));
        assert_eq!(sent.header("accept-language"), None);
    }

    #[tokio::test]
    async fn test_status_failure_falls_back_to_raw_html() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(403, "text/html", "denied")),
            Ok(response(403, "text/html", PAGE)),
        ]));
        let text = fetcher(&transport).fetch_text("https://example.com/a").await.unwrap();

        assert!(text.contains("Memory consolidation"));
        assert_eq!(transport.request_count(), 2);
        let fallback = &transport.requests()[1];
        assert_eq!(fallback.header("accept-language"), Some("en-US,en;q=0.9"));
        assert_eq!(fallback.header("accept"), Some("text/html,application/xhtml+xml"));
    }

    #[tokio::test]
    async fn test_status_failure_with_failed_fallback_carries_both() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(404, "text/html", "missing")),
            Err(TransportError::new("connection reset")),
        ]));
        let err = fetcher(&transport).fetch_text("https://example.com/a").await.unwrap_err();

        match err {
            FetchError::FallbackFailed { primary, fallback } => {
                assert!(matches!(*primary, FetchError::HttpStatus { status: 404, .. }));
                assert!(matches!(*fallback, FetchError::Transport(_)));
            }
            other => panic!("expected FallbackFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_mime_falls_back_to_declared_type() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, "application/octet-stream", "binary")),
            Ok(response(200, "text/html", PAGE)),
        ]));
        let text = fetcher(&transport).fetch_text("https://example.com/doc").await.unwrap();

        assert!(text.contains("Memory consolidation"));
        assert_eq!(transport.requests()[1].header("accept"), Some("*/*"));
    }

    #[tokio::test]
    async fn test_pdf_decode_failure_carries_both() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, "application/pdf", "%PDF-garbage")),
            Ok(response(200, "application/pdf", "%PDF-garbage")),
        ]));
        let err = fetcher(&transport).fetch_text("https://example.com/paper.pdf").await.unwrap_err();

        match err {
            FetchError::FallbackFailed { primary, fallback } => {
                assert!(matches!(*primary, FetchError::UnsupportedMime { .. }));
                assert!(matches!(*fallback, FetchError::Decode(_)));
            }
            other => panic!("expected FallbackFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pdf_download_extracted_after_mime_fallback() {
        let pdf: &[u8] = include_bytes!("../../tests/fixtures/sleep.pdf");
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, "application/pdf", pdf)),
            Ok(response(200, "application/pdf", pdf)),
        ]));
        let text = fetcher(&transport).fetch_text("https://example.com/sleep.pdf").await.unwrap();

        let squashed: String = text.split_whitespace().collect();
        assert!(squashed.contains("Sleepconsolidatesmemory"), "got {:?}", text);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[1].header("accept"), Some("*/*"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportError::new("dns failure"))]));
        let err = fetcher(&transport).fetch_text("https://nowhere.invalid").await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
        assert_eq!(transport.request_count(), 1);
    }
}
