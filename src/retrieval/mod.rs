//! Retriever collaborator interface.
//!
//! The workflow only ever sees this narrow surface; embedding models and
//! vector-index internals stay behind the concrete implementation.

pub mod chroma;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RetrievalError;

pub use chroma::ChromaRetriever;

/// A retrieved passage. The workflow reads `content` (for grounding
/// checks) and optionally a numeric `score` metadata key; everything
/// else is opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Relevance score attached by the retriever, if any.
    pub fn score(&self) -> Option<f64> {
        self.metadata.get("score").and_then(Value::as_f64)
    }
}

/// Maps a query string to a ranked list of documents.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_reads_numeric_metadata() {
        let doc = Document::new("spring beans").with_metadata("score", json!(0.87));
        assert_eq!(doc.score(), Some(0.87));
    }

    #[test]
    fn score_is_none_without_metadata() {
        assert_eq!(Document::new("plain").score(), None);
    }

    #[test]
    fn score_ignores_non_numeric_metadata() {
        let doc = Document::new("x").with_metadata("score", json!("high"));
        assert_eq!(doc.score(), None);
    }
}
