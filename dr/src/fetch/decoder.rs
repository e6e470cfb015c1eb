//! Content decoders
//!
//! Turns a fetched body into plain text. The decoder is picked once, from the
//! declared content type, by [`DecoderSet::select`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use regex::Regex;
use tracing::debug;

use super::FetchError;

/// Body-to-text conversion for one family of content types
pub trait Decoder: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether this decoder handles `content_type` (lower-cased)
    fn accepts(&self, content_type: &str) -> bool;

    /// Extract text from the raw body
    fn decode(&self, body: &[u8]) -> Result<String, FetchError>;
}

/// HTML, XHTML and plain text reduced to visible text
///
/// Scripts and styles are dropped before conversion. html2md's Markdown is
/// then flattened: links and images keep only their text, heading and
/// emphasis markers go, escapes are undone.
pub struct HtmlDecoder {
    hidden: Regex,
    links: Regex,
    autolinks: Regex,
    headings: Regex,
    emphasis: Regex,
    escapes: Regex,
    blank_runs: Regex,
}

impl HtmlDecoder {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            hidden: Regex::new(r"(?is)<(?:script|style|noscript)\b.*?</(?:script|style|noscript)\s*>")?,
            links: Regex::new(r"!?\[([^\]]*)\]\([^)]*\)")?,
            autolinks: Regex::new(r"<https?://[^>\s]*>")?,
            headings: Regex::new(r"(?m)^[ \t]*(?:#{1,6}|>)[ \t]*")?,
            emphasis: Regex::new(r"\*\*|__|`")?,
            escapes: Regex::new(r"\\([\\`*_{}\[\]()#+\-.!>|])")?,
            blank_runs: Regex::new(r"\n{3,}")?,
        })
    }

    /// Flatten html2md output to the text a reader would see
    pub fn visible_text(&self, markdown: &str) -> String {
        let mut text = markdown.to_string();
        // Linked images nest one level: [![alt](src)](href)
        for _ in 0..2 {
            text = self.links.replace_all(&text, "$1").into_owned();
        }
        let text = self.autolinks.replace_all(&text, "");
        let text = self.headings.replace_all(&text, "");
        let text = self.emphasis.replace_all(&text, "");
        let text = self.escapes.replace_all(&text, "$1");
        let text = self.blank_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

impl Decoder for HtmlDecoder {
    fn name(&self) -> &'static str {
        "html"
    }

    fn accepts(&self, content_type: &str) -> bool {
        content_type.is_empty() || content_type.starts_with("text/") || content_type.contains("xml")
    }

    fn decode(&self, body: &[u8]) -> Result<String, FetchError> {
        debug!(body_len = body.len(), "HtmlDecoder::decode: called");
        let html = String::from_utf8_lossy(body);
        let html = self.hidden.replace_all(&html, "");
        Ok(self.visible_text(&html2md::rewrite_html(&html, false)))
    }
}

/// PDF text extraction via pdf-extract
pub struct PdfDecoder;

impl Decoder for PdfDecoder {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn accepts(&self, content_type: &str) -> bool {
        content_type.contains("application/pdf")
    }

    fn decode(&self, body: &[u8]) -> Result<String, FetchError> {
        debug!(body_len = body.len(), "PdfDecoder::decode: called");
        // pdf-extract panics on some malformed documents
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(body))) {
            Ok(Ok(text)) => Ok(text.trim().to_string()),
            Ok(Err(e)) => Err(FetchError::Decode(format!("PDF extraction failed: {}", e))),
            Err(_) => Err(FetchError::Decode("PDF extraction failed: malformed document".to_string())),
        }
    }
}

/// The available decoders, in dispatch order
pub struct DecoderSet {
    pdf: PdfDecoder,
    html: HtmlDecoder,
}

impl DecoderSet {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pdf: PdfDecoder,
            html: HtmlDecoder::new()?,
        })
    }

    /// Pick the decoder for a body
    ///
    /// `pdf_hint` forces PDF when an earlier failure already named a PDF type.
    /// Anything that is not PDF is treated as HTML text.
    pub fn select(&self, content_type: &str, pdf_hint: bool) -> &dyn Decoder {
        let content_type = content_type.to_lowercase();
        let decoder: &dyn Decoder = if pdf_hint || self.pdf.accepts(&content_type) {
            &self.pdf
        } else {
            &self.html
        };
        debug!(%content_type, pdf_hint, decoder = decoder.name(), "DecoderSet::select: chosen");
        decoder
    }

    /// The HTML decoder, for paths that parse as HTML unconditionally
    pub fn html(&self) -> &dyn Decoder {
        &self.html
    }

    /// Whether the primary fetch path can read this content type
    pub fn is_text_type(&self, content_type: &str) -> bool {
        self.html.accepts(&content_type.to_lowercase())
    }
}
