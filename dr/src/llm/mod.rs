//! LLM Client module for deep research
//!
//! Provides the completion client, its error classification, the retry
//! policy, and the single-prompt `ask` helper every research step uses.

use tracing::{debug, info, warn};

pub mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use retry::RetryPolicy;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

/// System role sent with every research request
pub const RESEARCH_SYSTEM_PROMPT: &str = "You are a helpful research assistant.";

/// Returned when the service answers without any completion text
pub const NO_RESPONSE: &str = "No response.";

/// Send one research prompt and return the reply text
///
/// A reply without completions or with null content becomes [`NO_RESPONSE`].
pub async fn ask(llm: &dyn LlmClient, prompt: &str) -> Result<String, LlmError> {
    debug!(prompt_len = prompt.len(), "ask: called");
    let request = CompletionRequest::single(RESEARCH_SYSTEM_PROMPT, prompt);
    let response = llm.complete(request).await?;
    info!(
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "Model reply received"
    );
    if response.is_truncated() {
        warn!(stop_reason = ?response.stop_reason, "Model reply was cut short");
    }
    Ok(response.content.unwrap_or_else(|| NO_RESPONSE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::client::mock::MockLlmClient;
    use super::*;

    #[tokio::test]
    async fn test_ask_returns_text() {
        let llm = MockLlmClient::replies(&["an answer"]);
        let text = ask(&llm, "question").await.unwrap();
        assert_eq!(text, "an answer");
        assert_eq!(llm.prompts(), vec!["question"]);
    }

    #[tokio::test]
    async fn test_ask_without_content_uses_sentinel() {
        let llm = MockLlmClient::new(vec![CompletionResponse::default()]);
        let text = ask(&llm, "question").await.unwrap();
        assert_eq!(text, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_ask_keeps_truncated_text() {
        let llm = MockLlmClient::new(vec![CompletionResponse {
            stop_reason: StopReason::MaxTokens,
            usage: TokenUsage {
                input_tokens: 4000,
                output_tokens: 96,
            },
            ..CompletionResponse::text("partial report")
        }]);
        assert_eq!(ask(&llm, "question").await.unwrap(), "partial report");
    }

    #[tokio::test]
    async fn test_ask_sends_research_system_prompt() {
        let llm = MockLlmClient::with_handler(|req| {
            assert_eq!(req.system_prompt, RESEARCH_SYSTEM_PROMPT);
            Ok(CompletionResponse::text("ok"))
        });
        assert_eq!(ask(&llm, "q").await.unwrap(), "ok");
    }
}
