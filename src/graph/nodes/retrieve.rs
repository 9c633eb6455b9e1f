// Retrieve Node
// Fetches ranked documents for the current query.

use async_trait::async_trait;

use crate::errors::WorkflowError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::QueryState;

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Retrieve"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let docs = ctx
            .retriever
            .retrieve(&state.query, ctx.config.top_k)
            .await
            .map_err(|e| GraphError::new(self.id(), WorkflowError::Retrieval(e)))?;

        tracing::info!(
            query = %state.query,
            count = docs.len(),
            "retrieved context"
        );

        // Wholesale replacement: nothing survives from a previous cycle,
        // and the hallucination-retry budget starts over.
        state.context = docs;
        state.generation_attempts = 0;

        Ok(NodeOutput::Continue(None))
    }
}
