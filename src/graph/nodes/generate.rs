// Generate Node
// Produces an answer from (query, context) via the LLM.

use async_trait::async_trait;

use crate::errors::WorkflowError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::QueryState;
use crate::llm::{ChatMessage, ChatRequest};

pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

fn rag_prompt(query: &str, passages: &[&str]) -> String {
    format!(
        "You are an assistant for question-answering tasks. Use the following pieces of \
         retrieved context to answer the question. If you don't know the answer, just say \
         that you don't know. Keep the answer concise.\n\n\
         Question: {query}\n\n\
         Context:\n{}",
        passages.join("\n---\n")
    )
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    fn name(&self) -> &'static str {
        "Generate"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.generation_attempts += 1;

        // Hallucination retries re-submit the same query and context;
        // sampling is left at provider defaults, so the output may differ.
        let passages = state.context_text();
        let request = ChatRequest::new(vec![ChatMessage::user(rag_prompt(&state.query, &passages))]);

        let mut rx = ctx
            .llm
            .stream_chat(request)
            .await
            .map_err(|e| GraphError::new(self.id(), WorkflowError::Generation(e)))?;

        let mut answer = String::new();
        while let Some(chunk) = rx.recv().await {
            let delta =
                chunk.map_err(|e| GraphError::new(self.id(), WorkflowError::Generation(e)))?;
            answer.push_str(&delta);
        }

        tracing::info!(attempt = state.generation_attempts, "generated answer");

        state.answer = Some(answer);
        Ok(NodeOutput::Continue(None))
    }
}
