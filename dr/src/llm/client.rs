//! Model client seam

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Implementations own their retry policy: a returned error is final for
/// that request.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One chat completion, retries included
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
