// Graph runtime - petgraph based
// Executes the node graph, resolving conditional edges after each step.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::QueryState;

/// Edge condition for graph routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge).
    Always,
    /// Follow this edge when the node branches with this condition.
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// Directed graph of workflow nodes with condition-weighted edges.
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Global ceiling on executed steps; the last defense against a
    /// wiring mistake producing an unbounded loop.
    max_steps: usize,
}

impl GraphRuntime {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 50,
        }
    }

    fn add_node(&mut self, node: Box<dyn Node>) {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
    }

    fn add_edge(&mut self, from: &str, to: &str, condition: EdgeCondition) -> Result<(), GraphError> {
        let from_idx = *self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::message(from, format!("source node not found: {from}")))?;
        let to_idx = *self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::message(to, format!("target node not found: {to}")))?;
        self.graph.add_edge(from_idx, to_idx, condition);
        Ok(())
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Drive execution from the entry node until a node returns `Final`
    /// or the step ceiling is hit.
    pub async fn run(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<(), GraphError> {
        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::message("runtime", format!("entry node not found: {}", self.entry_node_id))
        })?;

        let mut trace: Vec<String> = Vec::new();

        for _ in 0..self.max_steps {
            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::message("runtime", "node missing from graph"))?;

            let node_id = node.id();
            tracing::debug!(node = node_id, step = trace.len(), "executing node");
            trace.push(node_id.to_string());

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };

            match output {
                NodeOutput::Final => {
                    tracing::debug!(node = node_id, "graph execution complete");
                    return Ok(());
                }
                NodeOutput::Continue(explicit_next) => {
                    current_idx = self
                        .resolve_next(current_idx, None, explicit_next.as_deref())
                        .map_err(|err| err.with_trace(std::mem::take(&mut trace)))?;
                }
                NodeOutput::Branch(condition) => {
                    current_idx = self
                        .resolve_next(current_idx, Some(&condition), None)
                        .map_err(|err| err.with_trace(std::mem::take(&mut trace)))?;
                }
            }
        }

        Err(GraphError::message(
            "runtime",
            format!("maximum steps ({}) exceeded", self.max_steps),
        )
        .with_trace(trace))
    }

    fn resolve_next(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        if let Some(next_id) = explicit {
            return self.node_indices.get(next_id).copied().ok_or_else(|| {
                GraphError::message(current_id, format!("explicit target not found: {next_id}"))
            });
        }

        let mut default_edge = None;
        for edge_ref in self.graph.edges_directed(current_idx, Direction::Outgoing) {
            match edge_ref.weight() {
                EdgeCondition::OnCondition(expected) if Some(expected.as_str()) == condition => {
                    return Ok(edge_ref.target());
                }
                EdgeCondition::Always => default_edge = Some(edge_ref.target()),
                EdgeCondition::OnCondition(_) => {}
            }
        }

        if let Some(target) = default_edge {
            if let Some(cond) = condition {
                tracing::warn!(
                    node = current_id,
                    condition = cond,
                    "condition not matched, using default edge"
                );
            }
            return Ok(target);
        }

        Err(GraphError::message(
            current_id,
            format!("no matching edge for condition {condition:?}"),
        ))
    }
}

/// Fluent constructor for a `GraphRuntime`.
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        if self.runtime.entry_node_id.is_empty() {
            return Err(GraphError::message("builder", "no entry node set"));
        }
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_edge(&from, &to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::errors::{LlmError, RetrievalError};
    use crate::llm::{ChatRequest, LlmProvider};
    use crate::retrieval::{Document, Retriever};
    use async_trait::async_trait;

    struct NullLlm;

    #[async_trait]
    impl LlmProvider for NullLlm {
        fn name(&self) -> &str {
            "null"
        }
        async fn chat(&self, _request: ChatRequest) -> Result<String, LlmError> {
            Ok(String::new())
        }
        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(Vec::new())
        }
    }

    struct NullRetriever;

    #[async_trait]
    impl Retriever for NullRetriever {
        async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<Document>, RetrievalError> {
            Ok(Vec::new())
        }
    }

    /// Node that loops back to itself via a branch condition forever.
    struct LoopNode;

    #[async_trait]
    impl Node for LoopNode {
        fn id(&self) -> &'static str {
            "loop"
        }
        async fn execute(
            &self,
            _state: &mut QueryState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            Ok(NodeOutput::Branch("again".to_string()))
        }
    }

    /// Node that finishes immediately.
    struct DoneNode;

    #[async_trait]
    impl Node for DoneNode {
        fn id(&self) -> &'static str {
            "done"
        }
        async fn execute(
            &self,
            _state: &mut QueryState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            Ok(NodeOutput::Final)
        }
    }

    fn test_ctx<'a>(
        llm: &'a NullLlm,
        retriever: &'a NullRetriever,
        config: &'a WorkflowConfig,
    ) -> NodeContext<'a> {
        NodeContext {
            llm,
            retriever,
            config,
        }
    }

    #[test]
    fn edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some("relevant")));

        assert!(EdgeCondition::on("relevant").matches(Some("relevant")));
        assert!(!EdgeCondition::on("relevant").matches(Some("irrelevant")));
        assert!(!EdgeCondition::on("relevant").matches(None));
    }

    #[test]
    fn build_rejects_missing_entry() {
        let result = GraphBuilder::new().node(Box::new(DoneNode)).build();
        assert!(result.is_err());
    }

    #[test]
    fn build_rejects_edge_to_unknown_node() {
        let result = GraphBuilder::new()
            .entry("done")
            .node(Box::new(DoneNode))
            .edge("done", "missing")
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_terminates_at_final_node() {
        let graph = GraphBuilder::new()
            .entry("done")
            .node(Box::new(DoneNode))
            .build()
            .unwrap();

        let llm = NullLlm;
        let retriever = NullRetriever;
        let config = WorkflowConfig::default();
        let mut ctx = test_ctx(&llm, &retriever, &config);
        let mut state = QueryState::new("s", "q");

        graph.run(&mut state, &mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn run_stops_at_step_ceiling() {
        let graph = GraphBuilder::new()
            .entry("loop")
            .max_steps(5)
            .node(Box::new(LoopNode))
            .conditional_edge("loop", "loop", "again")
            .build()
            .unwrap();

        let llm = NullLlm;
        let retriever = NullRetriever;
        let config = WorkflowConfig::default();
        let mut ctx = test_ctx(&llm, &retriever, &config);
        let mut state = QueryState::new("s", "q");

        let err = graph.run(&mut state, &mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("maximum steps"));
        assert_eq!(err.execution_trace.len(), 5);
    }

    #[tokio::test]
    async fn run_fails_on_unmatched_branch() {
        let graph = GraphBuilder::new()
            .entry("loop")
            .node(Box::new(LoopNode))
            .node(Box::new(DoneNode))
            .conditional_edge("loop", "done", "never")
            .build()
            .unwrap();

        let llm = NullLlm;
        let retriever = NullRetriever;
        let config = WorkflowConfig::default();
        let mut ctx = test_ctx(&llm, &retriever, &config);
        let mut state = QueryState::new("s", "q");

        let err = graph.run(&mut state, &mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("no matching edge"));
    }
}
