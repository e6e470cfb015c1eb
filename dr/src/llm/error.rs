//! Model request failures

use std::time::Duration;
use thiserror::Error;

use crate::http::TransportError;

/// Failures of a single completion request, or of its retry envelope
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP 429; surfaced to the caller without retrying
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Error envelope whose type marks a server-side condition
    #[error("Server error ({kind}): {message}")]
    ServerError { kind: String, message: String },

    #[error(
        "API error: {message}. Suggestion: shorten your prompt or switch to a larger-context model (set OPENAI_MODEL). \
         If you're summarizing a long URL, consider chunking the content or truncating the article before sending."
    )]
    ContextLengthExceeded { message: String },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    /// Body was neither a completion nor a recognizable error envelope
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },
}

impl LlmError {
    /// Transient failures worth another attempt: 5xx-shaped, network, unparseable
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::ServerError { .. } | LlmError::Network(_) | LlmError::MalformedResponse(_) => true,
            LlmError::RateLimited { .. }
            | LlmError::ContextLengthExceeded { .. }
            | LlmError::InvalidResponse(_)
            | LlmError::RetriesExhausted { .. } => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> LlmError {
        LlmError::ApiError {
            status,
            message: format!("status {}", status),
        }
    }

    #[test]
    fn test_transient_failures_retry() {
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(LlmError::Network(TransportError::new("connection reset")).is_retryable());
        assert!(LlmError::MalformedResponse("<html>gateway</html>".to_string()).is_retryable());
        assert!(
            LlmError::ServerError {
                kind: "server_error".to_string(),
                message: "The server is overloaded".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_permanent_failures_do_not_retry() {
        assert!(!api(401).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(
            !LlmError::ContextLengthExceeded {
                message: "too long".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .is_retryable()
        );
        assert!(
            !LlmError::RetriesExhausted {
                attempts: 3,
                source: Box::new(api(502)),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let limited = LlmError::RateLimited {
            retry_after: Duration::from_secs(30),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(api(503).retry_after(), None);
    }

    #[test]
    fn test_context_length_message_has_guidance() {
        let err = LlmError::ContextLengthExceeded {
            message: "maximum context length is 4097 tokens".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("maximum context length"));
        assert!(text.contains("chunking"));
        assert!(text.contains("OPENAI_MODEL"));
    }

    #[test]
    fn test_exhaustion_names_cause_once() {
        let err = LlmError::RetriesExhausted {
            attempts: 3,
            source: Box::new(api(503)),
        };
        assert_eq!(err.to_string(), "Request failed after 3 attempts");

        let cause = std::error::Error::source(&err).unwrap().to_string();
        assert_eq!(cause, "API error 503: status 503");

        let report = format!("{:?}", eyre::Report::new(err));
        assert_eq!(report.matches("status 503").count(), 1, "{}", report);
    }
}
