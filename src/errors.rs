// Error taxonomy for the workflow and its collaborators.
//
// Transient collaborator failures are never retried here; retry policy
// belongs to the caller. Only the domain loops (hallucination retry,
// rewrite retry) are bounded inside the workflow, and hitting a bound is
// a terminal outcome, not an error.

use thiserror::Error;

/// Failures from the retriever collaborator.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retriever unavailable: {0}")]
    Unavailable(String),
    #[error("retriever request timed out")]
    Timeout,
}

/// Failures from the LLM provider, shared by the generator, the rewriter
/// and all three gate classifiers.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider request timed out")]
    Timeout,
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Hard failure surfaced to the workflow caller.
///
/// `RetriesExhausted` and `NoRelevantContext` are deliberately absent:
/// those are terminal reasons carried in the final state, and the caller
/// still receives the last-known partial state for degraded rendering.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("graph error in {node_id}: {message}")]
    Graph { node_id: String, message: String },
}

/// Failures from the session history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
