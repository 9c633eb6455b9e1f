// Chroma-style HTTP vector store retriever.
//
// Embeds the query through the shared LLM provider, then runs a nearest
// neighbour query against the collection endpoint. Distances come back
// as cosine distance; they are folded into a `score` metadata key so the
// workflow sees higher-is-better.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{LlmError, RetrievalError};
use crate::llm::LlmProvider;

use super::{Document, Retriever};

pub struct ChromaRetriever {
    base_url: String,
    collection: String,
    client: Client,
    embedder: Arc<dyn LlmProvider>,
}

impl ChromaRetriever {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        embedder: Arc<dyn LlmProvider>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            embedder,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    // Chroma nests results per query embedding; we always send one.
    documents: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<HashMap<String, Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<f64>>,
}

fn documents_from_response(response: QueryResponse) -> Vec<Document> {
    let contents = response.documents.into_iter().next().unwrap_or_default();
    let mut metadatas = response
        .metadatas
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter();
    let mut distances = response.distances.into_iter().next().unwrap_or_default().into_iter();

    contents
        .into_iter()
        .map(|content| {
            let mut metadata = metadatas.next().flatten().unwrap_or_default();
            if let Some(distance) = distances.next() {
                metadata.insert("score".to_string(), json!(1.0 - distance));
            }
            Document { content, metadata }
        })
        .collect()
}

fn embed_error(err: LlmError) -> RetrievalError {
    match err {
        LlmError::Timeout => RetrievalError::Timeout,
        other => RetrievalError::Unavailable(format!("query embedding failed: {other}")),
    }
}

fn transport_error(err: reqwest::Error) -> RetrievalError {
    if err.is_timeout() {
        RetrievalError::Timeout
    } else {
        RetrievalError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl Retriever for ChromaRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, RetrievalError> {
        let embeddings = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(embed_error)?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Unavailable("embedder returned no vectors".to_string()))?;

        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, self.collection
        );
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RetrievalError::Unavailable(format!("{status}: {text}")));
        }

        let payload: QueryResponse = res
            .json()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("query decode failed: {e}")))?;

        Ok(documents_from_response(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_zips_documents_metadata_and_scores() {
        let payload: QueryResponse = serde_json::from_str(
            r#"{
                "documents": [["first passage", "second passage"]],
                "metadatas": [[{"source": "doc.md"}, null]],
                "distances": [[0.1, 0.4]]
            }"#,
        )
        .unwrap();

        let docs = documents_from_response(payload);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "first passage");
        assert_eq!(docs[0].metadata.get("source"), Some(&json!("doc.md")));
        assert!((docs[0].score().unwrap() - 0.9).abs() < 1e-9);
        assert!((docs[1].score().unwrap() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn response_without_metadata_still_yields_documents() {
        let payload: QueryResponse =
            serde_json::from_str(r#"{"documents": [["only content"]]}"#).unwrap();
        let docs = documents_from_response(payload);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].metadata.is_empty());
    }

    #[test]
    fn empty_response_yields_no_documents() {
        let payload: QueryResponse = serde_json::from_str(r#"{"documents": []}"#).unwrap();
        assert!(documents_from_response(payload).is_empty());
    }

    #[test]
    fn embed_timeout_maps_to_retrieval_timeout() {
        assert!(matches!(
            embed_error(LlmError::Timeout),
            RetrievalError::Timeout
        ));
        assert!(matches!(
            embed_error(LlmError::RateLimited),
            RetrievalError::Unavailable(_)
        ));
    }
}
