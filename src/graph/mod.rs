// Workflow graph module
// StateGraph-style conditional execution for the RAG pipeline

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;

pub use builder::build_rag_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::{EdgeCondition, GraphBuilder, GraphRuntime};
pub use state::{
    GroundingVerdict, HelpfulnessVerdict, QueryState, RelevanceVerdict, TerminalReason,
};
