// Graph Builder
// Wires the self-correcting RAG state machine.

use super::node::GraphError;
use super::nodes::{
    GenerateNode, HallucinationGateNode, HelpfulnessGateNode, RelevanceGateNode, RetrieveNode,
    RewriteNode,
};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the conditional RAG graph:
///
/// retrieve -> check_relevance -(relevant)-> generate -> check_hallucination
///   -(grounded)-> check_helpfulness -(unhelpful)-> rewrite -> retrieve
///   -(hallucinated)-> generate
///
/// Irrelevant context, an accepted answer, and exhausted retry bounds
/// all terminate inside the gate nodes; the loops back to `generate`
/// and `retrieve` are the only cycles.
pub fn build_rag_graph(max_steps: usize) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("retrieve")
        .max_steps(max_steps)
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(RelevanceGateNode::new()))
        .node(Box::new(GenerateNode::new()))
        .node(Box::new(HallucinationGateNode::new()))
        .node(Box::new(HelpfulnessGateNode::new()))
        .node(Box::new(RewriteNode::new()))
        .edge("retrieve", "check_relevance")
        .conditional_edge("check_relevance", "generate", "relevant")
        .edge("generate", "check_hallucination")
        .conditional_edge("check_hallucination", "check_helpfulness", "grounded")
        .conditional_edge("check_hallucination", "generate", "hallucinated")
        .conditional_edge("check_helpfulness", "rewrite", "unhelpful")
        .edge("rewrite", "retrieve")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_builds_with_all_nodes() {
        let graph = build_rag_graph(50).unwrap();
        let mut ids = graph.node_ids();
        ids.sort_unstable();
        assert_eq!(
            ids,
            vec![
                "check_hallucination",
                "check_helpfulness",
                "check_relevance",
                "generate",
                "retrieve",
                "rewrite"
            ]
        );
    }

    #[test]
    fn graph_contains_the_retry_cycles() {
        let graph = build_rag_graph(50).unwrap();
        assert!(graph.has_cycle());
    }
}
