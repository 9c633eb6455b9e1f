//! Self-correcting RAG workflow.
//!
//! A directed graph of named nodes (retrieve, gates, generate, rewrite)
//! drives a shared state record to a terminal: an accepted answer, a
//! no-relevant-context abort, an exhausted retry bound, or a timeout.
//! The retriever and LLM are opaque collaborators behind traits.

pub mod config;
pub mod errors;
pub mod graph;
pub mod history;
pub mod hooks;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod workflow;

pub use config::{AppConfig, RewriteRule, WorkflowConfig};
pub use errors::{HistoryError, LlmError, RetrievalError, WorkflowError};
pub use graph::{QueryState, TerminalReason};
pub use history::{SessionHistory, SqliteHistoryStore};
pub use hooks::{Hooks, Transform, TranslateTransform};
pub use llm::{LlmProvider, OpenAiProvider};
pub use retrieval::{ChromaRetriever, Document, Retriever};
pub use workflow::{RagWorkflow, WorkflowOutcome};
