// Workflow entry point
// Assembles the graph, runs it over a fresh state record, and returns
// the final state tagged with a terminal reason.

use std::sync::Arc;

use crate::config::WorkflowConfig;
use crate::errors::WorkflowError;
use crate::graph::{build_rag_graph, NodeContext, QueryState, TerminalReason};
use crate::hooks::Hooks;
use crate::llm::LlmProvider;
use crate::retrieval::Retriever;

/// Final state plus the reason execution stopped. On any terminal the
/// caller gets the last-known partial state, so a degraded response can
/// still show the last context or answer.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub state: QueryState,
    pub reason: TerminalReason,
}

impl WorkflowOutcome {
    /// The accepted answer, present only when the reason is `Answered`.
    pub fn answer(&self) -> Option<&str> {
        match self.reason {
            TerminalReason::Answered => self.state.answer.as_deref(),
            _ => None,
        }
    }
}

/// Self-correcting RAG workflow over a retriever and an LLM provider.
///
/// One instance can serve concurrent queries: every `answer` call gets
/// its own state record and the collaborators are shared immutably.
pub struct RagWorkflow {
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    config: WorkflowConfig,
    hooks: Hooks,
}

impl RagWorkflow {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            llm,
            retriever,
            config,
            hooks: Hooks::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run one query to a terminal.
    ///
    /// Collaborator failures surface as errors; exhausted retry bounds
    /// and irrelevant context are terminal outcomes, not errors.
    pub async fn answer(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let query = self
            .hooks
            .apply_pre(query)
            .await
            .map_err(WorkflowError::Generation)?;

        let mut state = QueryState::new(session_id, query);
        let graph = build_rag_graph(self.config.step_ceiling())?;
        let mut ctx = NodeContext {
            llm: self.llm.as_ref(),
            retriever: self.retriever.as_ref(),
            config: &self.config,
        };

        match self.config.request_timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, graph.run(&mut state, &mut ctx)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        tracing::warn!(timeout_secs = limit.as_secs(), "workflow timed out");
                        state.terminal = Some(TerminalReason::TimedOut);
                    }
                }
            }
            None => graph.run(&mut state, &mut ctx).await?,
        }

        let reason = state.terminal.ok_or_else(|| WorkflowError::Graph {
            node_id: "workflow".to_string(),
            message: "graph finished without a terminal reason".to_string(),
        })?;

        if reason == TerminalReason::Answered {
            if let Some(answer) = state.answer.take() {
                let transformed = self
                    .hooks
                    .apply_post(&answer)
                    .await
                    .map_err(WorkflowError::Generation)?;
                state.answer = Some(transformed);
            }
        }

        tracing::info!(
            session = session_id,
            reason = reason.as_str(),
            rewrites = state.rewrite_attempts,
            "workflow finished"
        );

        Ok(WorkflowOutcome { state, reason })
    }
}
