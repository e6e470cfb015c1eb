//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI-compatible Chat Completions
//! endpoints, with bounded retry for transient failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, RetryPolicy, StopReason, TokenUsage};
use crate::config::RunConfig;
use crate::http::{HttpResponse, HttpTransport, ReqwestTransport};

/// Retry-After used when a 429 carries none
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Longest raw body excerpt kept in an error message
const MAX_ERROR_BODY: usize = 500;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
}

impl OpenAIClient {
    /// Create a client from the resolved run configuration
    pub fn from_run_config(config: &RunConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_run_config: called");
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(
            config.model.clone(),
            config.api_key.clone(),
            config.base_url.clone(),
            Arc::new(transport),
            config.retry.clone(),
        ))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            transport,
            retry,
        }
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, message_count = %request.messages.len(), "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];

        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
        })
    }

    /// One round trip: send, then classify the reply
    async fn attempt(&self, url: &str, body: &serde_json::Value) -> Result<CompletionResponse, LlmError> {
        let auth = format!("Bearer {}", self.api_key);
        let headers = [("Authorization", auth.as_str()), ("content-type", "application/json")];
        let response = self.transport.post_json(url, &headers, body).await?;
        interpret(response)
    }
}

/// Classify an HTTP reply into a completion or a typed failure
fn interpret(response: HttpResponse) -> Result<CompletionResponse, LlmError> {
    let status = response.status;

    if status == 429 {
        debug!("interpret: rate limited (429)");
        let retry_after = response.retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after),
        });
    }

    let text = response.text();

    if response.is_server_error() {
        debug!(status, "interpret: server error status");
        return Err(LlmError::ApiError {
            status,
            message: excerpt(&text),
        });
    }

    if response.is_success()
        && let Ok(api_response) = serde_json::from_str::<OpenAIResponse>(&text)
    {
        debug!("interpret: success");
        return Ok(parse_response(api_response));
    }

    if let Ok(envelope) = serde_json::from_str::<OpenAIErrorEnvelope>(&text) {
        return Err(classify_envelope(status, envelope.error));
    }

    if !response.is_success() {
        debug!(status, "interpret: API error without envelope");
        return Err(LlmError::ApiError {
            status,
            message: excerpt(&text),
        });
    }

    debug!("interpret: malformed body");
    Err(LlmError::MalformedResponse(excerpt(&text)))
}

fn classify_envelope(status: u16, error: OpenAIErrorBody) -> LlmError {
    let kind = error.kind.unwrap_or_default();
    let code = error.code.as_ref().map(code_string).unwrap_or_default();
    let message = error.message.unwrap_or_else(|| "unknown error".to_string());
    debug!(%kind, %code, status, "classify_envelope: called");

    let lower = message.to_lowercase();
    if code == "context_length_exceeded" || lower.contains("maximum context length") || lower.contains("context length")
    {
        return LlmError::ContextLengthExceeded { message };
    }

    let kind_lower = kind.to_lowercase();
    if kind_lower.contains("server") || kind_lower.contains("overloaded") || kind_lower.contains("timeout") {
        return LlmError::ServerError { kind, message };
    }

    LlmError::ApiError { status, message }
}

fn code_string(code: &serde_json::Value) -> String {
    match code {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_ERROR_BODY).collect();
    format!("{}...", cut)
}

/// Parse the OpenAI API response
fn parse_response(api_response: OpenAIResponse) -> CompletionResponse {
    debug!(choice_count = %api_response.choices.len(), "parse_response: called");
    let (content, stop_reason) = match api_response.choices.into_iter().next() {
        Some(c) => (c.message.content, StopReason::from_finish_reason(c.finish_reason.as_deref())),
        None => (None, StopReason::EndTurn),
    };

    let usage = api_response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    CompletionResponse {
        content,
        stop_reason,
        usage,
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);
        let max_attempts = self.retry.max_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=max_attempts {
            match self.attempt(&url, &body).await {
                Ok(response) => {
                    debug!(attempt, "complete: success");
                    return Ok(response);
                }
                Err(e) if e.is_retryable() => {
                    if attempt < max_attempts {
                        let backoff = self.retry.backoff(attempt);
                        warn!(
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "complete: retrying after transient error"
                        );
                        tokio::time::sleep(backoff).await;
                    } else {
                        debug!(attempt, error = %e, "complete: transient error on final attempt");
                    }
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!(attempt, error = %e, "complete: non-retryable error");
                    return Err(e);
                }
            }
        }

        let source = last_error.unwrap_or_else(|| LlmError::InvalidResponse("no attempt was made".to_string()));
        Err(LlmError::RetriesExhausted {
            attempts: max_attempts,
            source: Box::new(source),
        })
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<serde_json::Value>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TransportError;
    use crate::http::mock::{ScriptedTransport, json, response};

    fn client(transport: Arc<ScriptedTransport>) -> OpenAIClient {
        OpenAIClient::with_transport(
            "gpt-3.5-turbo",
            "test-key",
            "https://api.openai.com",
            transport,
            RetryPolicy::immediate(3),
        )
    }

    fn success(text: &str) -> HttpResponse {
        json(
            200,
            serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5}
            }),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest::single("You are helpful", "Hello")
    }

    #[test]
    fn test_build_request_body_basic() {
        let c = client(Arc::new(ScriptedTransport::default()));
        let body = c.build_request_body(&request());

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert!(body["messages"].is_array());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(success("hi"))]));
        let resp = client(transport.clone()).complete(request()).await.unwrap();

        assert_eq!(resp.content.as_deref(), Some("hi"));
        assert_eq!(resp.usage.input_tokens, 10);
        assert_eq!(transport.request_count(), 1);

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, "POST");
        assert_eq!(sent.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(sent.header("authorization"), Some("Bearer test-key"));
    }

    #[tokio::test]
    async fn test_two_server_errors_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(500, "text/plain", "boom")),
            Ok(response(502, "text/plain", "bad gateway")),
            Ok(success("finally")),
        ]));
        let resp = client(transport.clone()).complete(request()).await.unwrap();

        assert_eq!(resp.content.as_deref(), Some("finally"));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_three_server_errors_exhaust_retries() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(503, "text/plain", "a")),
            Ok(response(503, "text/plain", "b")),
            Ok(response(503, "text/plain", "c")),
        ]));
        let err = client(transport.clone()).complete(request()).await.unwrap_err();

        assert_eq!(transport.request_count(), 3);
        match err {
            LlmError::RetriesExhausted { attempts, ref source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(**source, LlmError::ApiError { status: 503, .. }));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError::new("connection reset")),
            Ok(success("ok")),
        ]));
        let resp = client(transport.clone()).complete(request()).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("ok"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_server_envelope_is_retried() {
        let envelope = serde_json::json!({"error": {"type": "server_error", "message": "overloaded"}});
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(200, envelope)), Ok(success("ok"))]));
        let resp = client(transport.clone()).complete(request()).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("ok"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(response(200, "text/html", "<html>proxy</html>")),
            Ok(success("ok")),
        ]));
        let resp = client(transport.clone()).complete(request()).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_context_length_fails_immediately() {
        let envelope = serde_json::json!({
            "error": {
                "type": "invalid_request_error",
                "code": "context_length_exceeded",
                "message": "This model's maximum context length is 4097 tokens."
            }
        });
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(400, envelope))]));
        let err = client(transport.clone()).complete(request()).await.unwrap_err();

        assert!(matches!(err, LlmError::ContextLengthExceeded { .. }));
        assert!(err.to_string().contains("chunking"));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_client_error_fails_immediately() {
        let envelope = serde_json::json!({"error": {"type": "invalid_request_error", "message": "bad key"}});
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(401, envelope))]));
        let err = client(transport.clone()).complete(request()).await.unwrap_err();

        assert!(matches!(err, LlmError::ApiError { status: 401, .. }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_not_retried() {
        let mut limited = response(429, "application/json", "{}");
        limited.retry_after = Some(7);
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(limited)]));
        let err = client(transport.clone()).complete(request()).await.unwrap_err();

        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_choices_yield_no_content() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(200, serde_json::json!({"choices": []})))]));
        let resp = client(transport).complete(request()).await.unwrap();
        assert!(resp.content.is_none());
    }
}
