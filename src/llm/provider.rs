use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::LlmError;

use super::types::ChatRequest;

/// Abstract LLM provider used by the generator, the rewriter and the
/// gate classifiers. The concrete model is chosen at construction time,
/// not per call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai", "lmstudio").
    fn name(&self) -> &str;

    /// Chat completion (non-streaming).
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// Chat completion streamed as text deltas.
    ///
    /// The default forwards to `chat` and yields the full response as a
    /// single chunk, so providers without a streaming endpoint still
    /// satisfy the surface.
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, LlmError>>, LlmError> {
        let (tx, rx) = mpsc::channel(32);
        let response = self.chat(request).await?;
        let _ = tx.send(Ok(response)).await;
        Ok(rx)
    }

    /// Generate embeddings for the given inputs.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}
