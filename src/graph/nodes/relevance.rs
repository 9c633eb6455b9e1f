// Relevance Gate
// Classifies retrieved context as relevant or irrelevant to the query.
//
// Policy: relevant iff the LLM judge scores the context 1. The numeric
// score the retriever attaches to document metadata is informational
// only and does not steer this gate.

use async_trait::async_trait;

use crate::errors::WorkflowError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{QueryState, RelevanceVerdict, TerminalReason};
use crate::llm::judge;

pub struct RelevanceGateNode;

impl RelevanceGateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RelevanceGateNode {
    fn default() -> Self {
        Self::new()
    }
}

fn relevance_prompt(query: &str, passages: &[&str]) -> String {
    format!(
        "You are a grader assessing whether retrieved documents are relevant to a user question.\n\
         Score 1 if the documents contain information that helps answer the question, 0 otherwise.\n\n\
         Question: {query}\n\n\
         Documents:\n{}",
        passages.join("\n---\n")
    )
}

#[async_trait]
impl Node for RelevanceGateNode {
    fn id(&self) -> &'static str {
        "check_relevance"
    }

    fn name(&self) -> &'static str {
        "Relevance Gate"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let verdict = if state.context.is_empty() {
            // Nothing retrieved; no point asking the judge.
            RelevanceVerdict::Irrelevant
        } else {
            let passages = state.context_text();
            let relevant = judge::grade(ctx.llm, relevance_prompt(&state.query, &passages))
                .await
                .map_err(|e| GraphError::new(self.id(), WorkflowError::Generation(e)))?;
            if relevant {
                RelevanceVerdict::Relevant
            } else {
                RelevanceVerdict::Irrelevant
            }
        };

        tracing::info!(verdict = ?verdict, "relevance gate");

        match verdict {
            RelevanceVerdict::Relevant => Ok(NodeOutput::Branch("relevant".to_string())),
            RelevanceVerdict::Irrelevant => {
                state.terminal = Some(TerminalReason::NoRelevantContext);
                Ok(NodeOutput::Final)
            }
        }
    }
}
