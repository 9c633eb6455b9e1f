// Workflow node implementations

pub mod generate;
pub mod hallucination;
pub mod helpfulness;
pub mod relevance;
pub mod retrieve;
pub mod rewrite;

pub use generate::GenerateNode;
pub use hallucination::HallucinationGateNode;
pub use helpfulness::HelpfulnessGateNode;
pub use relevance::RelevanceGateNode;
pub use retrieve::RetrieveNode;
pub use rewrite::RewriteNode;
