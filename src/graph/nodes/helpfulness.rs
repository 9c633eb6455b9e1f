// Helpfulness Gate
// Classifies whether the answer resolves the query's intent.

use async_trait::async_trait;

use crate::errors::WorkflowError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{HelpfulnessVerdict, QueryState, TerminalReason};
use crate::llm::judge;

pub struct HelpfulnessGateNode;

impl HelpfulnessGateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HelpfulnessGateNode {
    fn default() -> Self {
        Self::new()
    }
}

fn helpfulness_prompt(query: &str, answer: &str) -> String {
    format!(
        "You are a grader assessing whether an answer resolves the user's question.\n\
         Score 1 if the answer addresses what the question is actually asking, 0 otherwise.\n\n\
         Question: {query}\n\n\
         Answer: {answer}"
    )
}

#[async_trait]
impl Node for HelpfulnessGateNode {
    fn id(&self) -> &'static str {
        "check_helpfulness"
    }

    fn name(&self) -> &'static str {
        "Helpfulness Gate"
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

        let helpful = judge::grade(ctx.llm, helpfulness_prompt(&state.query, answer))
            .await
            .map_err(|e| GraphError::new(self.id(), WorkflowError::Generation(e)))?;

        let verdict = if helpful {
            HelpfulnessVerdict::Helpful
        } else {
            HelpfulnessVerdict::Unhelpful
        };
        tracing::info!(verdict = ?verdict, "helpfulness gate");

        match verdict {
            HelpfulnessVerdict::Helpful => {
                state.terminal = Some(TerminalReason::Answered);
                Ok(NodeOutput::Final)
            }
            HelpfulnessVerdict::Unhelpful => {
                if state.rewrite_attempts >= ctx.config.max_rewrites {
                    tracing::warn!(rewrites = state.rewrite_attempts, "rewrite bound reached");
                    state.terminal = Some(TerminalReason::RetriesExhausted);
                    Ok(NodeOutput::Final)
                } else {
                    Ok(NodeOutput::Branch("unhelpful".to_string()))
                }
            }
        }
    }
}
