// Node trait and types
// Base abstraction for workflow graph nodes

use async_trait::async_trait;

use crate::config::WorkflowConfig;
use crate::errors::WorkflowError;
use crate::llm::LlmProvider;
use crate::retrieval::Retriever;

use super::state::QueryState;

/// Collaborators handed to nodes during execution. All external calls a
/// node makes go through these handles.
pub struct NodeContext<'a> {
    pub llm: &'a dyn LlmProvider,
    pub retriever: &'a dyn Retriever,
    pub config: &'a WorkflowConfig,
}

/// Output from a node execution.
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Continue along the default edge (or to an explicitly named node).
    Continue(Option<String>),
    /// Follow the conditional edge matching this condition.
    Branch(String),
    /// Terminal reached; the node has set the terminal reason on state.
    Final,
}

/// Graph execution error.
///
/// Carries the failing node, the typed underlying failure, and the
/// ordered list of node IDs visited before the failure.
#[derive(Debug)]
pub struct GraphError {
    pub node_id: String,
    pub source: WorkflowError,
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, source: impl Into<WorkflowError>) -> Self {
        Self {
            node_id: node_id.into(),
            source: source.into(),
            execution_trace: Vec::new(),
        }
    }

    /// Wrap a plain message as a graph-level failure.
    pub fn message(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        let node_id = node_id.into();
        let source = WorkflowError::Graph {
            node_id: node_id.clone(),
            message: message.into(),
        };
        Self {
            node_id,
            source,
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "graph error in {}: {}", self.node_id, self.source)
        } else {
            write!(
                f,
                "graph error in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.source
            )
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<GraphError> for WorkflowError {
    fn from(err: GraphError) -> Self {
        if !err.execution_trace.is_empty() {
            tracing::error!(
                node = %err.node_id,
                trace = %err.execution_trace.join(" -> "),
                "graph execution failed"
            );
        }
        err.source
    }
}

/// All workflow graph nodes implement this.
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node.
    fn id(&self) -> &'static str;

    /// Human-readable name for display.
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic.
    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
