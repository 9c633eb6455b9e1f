// Hallucination Gate
// Classifies whether the generated answer is grounded in the retrieved
// context. A false "grounded" verdict is a silent correctness failure
// with no further defense here; this is the design's trust boundary.

use async_trait::async_trait;

use crate::errors::WorkflowError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{GroundingVerdict, QueryState, TerminalReason};
use crate::llm::judge;

pub struct HallucinationGateNode;

impl HallucinationGateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HallucinationGateNode {
    fn default() -> Self {
        Self::new()
    }
}

fn grounding_prompt(answer: &str, passages: &[&str]) -> String {
    format!(
        "You are a teacher evaluating whether a student's answer is grounded in the provided \
         documents. Score 1 if every factual claim in the answer is supported by the documents, \
         0 if the answer contains claims the documents do not support.\n\n\
         Documents:\n{}\n\n\
         Student answer: {answer}",
        passages.join("\n---\n")
    )
}

#[async_trait]
impl Node for HallucinationGateNode {
    fn id(&self) -> &'static str {
        "check_hallucination"
    }

    fn name(&self) -> &'static str {
        "Hallucination Gate"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let answer = state
            .answer
            .as_deref()
            .ok_or_else(|| GraphError::message(self.id(), "no answer to grade"))?;

        // Metadata stripped; the judge sees plain passage text only.
        let passages = state.context_text();
        let grounded = judge::grade(ctx.llm, grounding_prompt(answer, &passages))
            .await
            .map_err(|e| GraphError::new(self.id(), WorkflowError::Generation(e)))?;

        let verdict = if grounded {
            GroundingVerdict::Grounded
        } else {
            GroundingVerdict::Hallucinated
        };
        tracing::info!(verdict = ?verdict, attempt = state.generation_attempts, "hallucination gate");

        match verdict {
            GroundingVerdict::Grounded => Ok(NodeOutput::Branch("grounded".to_string())),
            GroundingVerdict::Hallucinated => {
                if state.generation_attempts >= ctx.config.max_generation_attempts {
                    tracing::warn!(
                        attempts = state.generation_attempts,
                        "generation retry bound reached"
                    );
                    state.terminal = Some(TerminalReason::RetriesExhausted);
                    Ok(NodeOutput::Final)
                } else {
                    Ok(NodeOutput::Branch("hallucinated".to_string()))
                }
            }
        }
    }
}
