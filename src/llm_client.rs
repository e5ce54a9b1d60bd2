//! The narrow seam between agents and the model execution engine

use crate::error::Result;
use crate::openrouter::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// Chat-completion capable execution engine
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the client type for debugging/logging
    fn client_type(&self) -> &str;

    /// Get the endpoint the client talks to
    fn endpoint(&self) -> &str;
}
