//! HTTP client for the external vector similarity service.

use crate::types::Metadata;
use crate::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    matches: Vec<VectorMatch>,
}

/// One nearest-neighbor match as reported by the vector service.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Clone)]
pub struct VectorServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl VectorServiceClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Whether the named index exists on the service. A 404 is a definitive
    /// "no"; connection failures surface as errors so the caller can decide
    /// how to degrade.
    pub async fn index_exists(&self, index_name: &str) -> Result<bool> {
        let url = format!("{}/indexes/{index_name}", self.base_url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Semantic(format!("Vector service unreachable: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Semantic(format!(
                    "Index existence check failed ({status}): {body}"
                )))
            }
        }
    }

    /// Nearest neighbors of `vector`, with stored metadata.
    pub async fn query(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let url = format!("{}/indexes/{index_name}/query", self.base_url);

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Semantic(format!("Vector query failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Semantic(format!("Vector query error ({status}): {body}")));
        }

        let query_response: QueryResponse = response.json().await
            .map_err(|e| Error::Semantic(format!("Vector query JSON parse error: {e}")))?;

        Ok(query_response.matches)
    }
}
