//! Semantic retrieval path: query embedding plus nearest-neighbor lookup
//! against an external vector similarity service.
//!
//! The adapter checks index existence once at construction. A missing or
//! unreachable index makes it permanently unavailable for the process
//! lifetime; queries then return no candidates without error.

pub mod client;

pub use client::{VectorMatch, VectorServiceClient};

use crate::config::SemanticConfig;
use crate::corpus::resolve_text;
use crate::embeddings::EmbeddingProvider;
use crate::types::Candidate;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SemanticIndex {
    client: VectorServiceClient,
    embedding: Arc<dyn EmbeddingProvider>,
    index_name: String,
    available: bool,
}

impl SemanticIndex {
    /// Probe the vector service and build the adapter. Never fails: a
    /// missing index or an unreachable service just leaves the adapter
    /// unavailable.
    pub async fn connect(config: &SemanticConfig, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        let client = VectorServiceClient::new(config.base_url.clone());

        let available = match client.index_exists(&config.index_name).await {
            Ok(true) => {
                info!("Initialized semantic retriever with index: {}", config.index_name);
                true
            }
            Ok(false) => {
                warn!("Vector index '{}' not found", config.index_name);
                false
            }
            Err(e) => {
                warn!("Semantic retriever not available: {e}");
                false
            }
        };

        Self {
            client,
            embedding,
            index_name: config.index_name.clone(),
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn embedding_provider_name(&self) -> &str {
        self.embedding.provider_name()
    }

    /// Up to `k` nearest-neighbor candidates for the query. Unavailable
    /// adapter yields an empty list, not an error; transient embed/query
    /// failures surface as errors for the caller to isolate.
    pub async fn top_k(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        if !self.available {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding.embed(query).await?;
        let matches = self.client.query(&self.index_name, &query_embedding, k).await?;

        Ok(matches.into_iter().map(candidate_from_match).collect())
    }
}

/// Map one vector-service match to a semantic candidate. The backend's raw
/// similarity is carried only for diagnostics; ranking uses a fixed semantic
/// relevance weight.
pub(crate) fn candidate_from_match(vector_match: VectorMatch) -> Candidate {
    let VectorMatch { id, score, mut metadata } = vector_match;

    let content = resolve_text(&metadata).unwrap_or_default();

    // Records stored without any identity field fall back to the backend's
    // vector id so deduplication and feedback still have a stable key.
    if !["doi", "url", "id"].iter().any(|k| metadata.contains_key(*k)) {
        metadata.insert("id".to_string(), Value::String(id));
    }

    metadata.insert(
        "retrieval_method".to_string(),
        Value::String("semantic".to_string()),
    );
    metadata.insert("similarity".to_string(), serde_json::json!(score));

    Candidate::semantic(content, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetrievalMethod;
    use serde_json::json;

    fn vector_match(metadata: serde_json::Value) -> VectorMatch {
        VectorMatch {
            id: "vec_42".to_string(),
            score: 0.87,
            metadata: metadata.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn test_match_maps_to_semantic_candidate() {
        let candidate = candidate_from_match(vector_match(json!({
            "id": "r1",
            "text": "Rabies is fatal once clinical signs appear",
            "species": "canine"
        })));

        assert_eq!(candidate.method, RetrievalMethod::Semantic);
        assert_eq!(candidate.lexical_score, 0.0);
        assert_eq!(candidate.content, "Rabies is fatal once clinical signs appear");
        assert_eq!(candidate.metadata["retrieval_method"], "semantic");
        assert_eq!(candidate.metadata["id"], "r1");
        assert!((candidate.metadata["similarity"].as_f64().unwrap() - 0.87).abs() < 1e-6);
    }

    #[test]
    fn test_match_without_identity_uses_vector_id() {
        let candidate = candidate_from_match(vector_match(json!({
            "text": "Feline asthma management"
        })));

        assert_eq!(candidate.metadata["id"], "vec_42");
    }

    #[test]
    fn test_match_without_text_falls_back_to_title() {
        let candidate = candidate_from_match(vector_match(json!({
            "id": "r2",
            "title": "Equine colic"
        })));

        assert_eq!(candidate.content, "Equine colic");
    }
}
