// Rewrite Node
// Reformulates the query using the static dictionary, for a fresh
// retrieval cycle. The LLM applies the rules in natural language rather
// than literal substitution, so rewriting is not guaranteed idempotent.

use async_trait::async_trait;

use crate::config::RewriteRule;
use crate::errors::WorkflowError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::QueryState;
use crate::llm::{ChatMessage, ChatRequest};

pub struct RewriteNode;

impl RewriteNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RewriteNode {
    fn default() -> Self {
        Self::new()
    }
}

fn rewrite_prompt(query: &str, rules: &[RewriteRule]) -> String {
    let dictionary = rules
        .iter()
        .map(|rule| format!("{} -> {}", rule.pattern, rule.replacement))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Look at the user's question and rewrite it using our dictionary. If no rule applies, \
         you may leave the question unchanged. Return only the rewritten question.\n\n\
         Dictionary:\n{dictionary}\n\n\
         Question: {query}"
    )
}

#[async_trait]
impl Node for RewriteNode {
    fn id(&self) -> &'static str {
        "rewrite"
    }

    fn name(&self) -> &'static str {
        "Rewrite"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.rewrite_attempts += 1;

        let request = ChatRequest::new(vec![ChatMessage::user(rewrite_prompt(
            &state.query,
            &ctx.config.rewrite_rules,
        ))]);

        let rewritten = ctx
            .llm
            .chat(request)
            .await
            .map_err(|e| GraphError::new(self.id(), WorkflowError::Generation(e)))?;

        let rewritten = rewritten.trim().to_string();
        tracing::info!(
            attempt = state.rewrite_attempts,
            old = %state.query,
            new = %rewritten,
            "rewrote query"
        );

        state.query = rewritten;
        Ok(NodeOutput::Continue(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_rules_in_order() {
        let rules = vec![
            RewriteRule::new("expressions about the user", "client"),
            RewriteRule::new("the language", "Java"),
        ];
        let prompt = rewrite_prompt("what does the language offer the user?", &rules);
        let first = prompt.find("expressions about the user -> client").unwrap();
        let second = prompt.find("the language -> Java").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Question: what does the language offer the user?"));
    }
}
