//! OpenAI embedding provider

use crate::{Error, Result};
use super::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct OpenAIEmbedding {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimension: usize,
    max_tokens: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    encoding_format: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAIEmbedding {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| "text-embedding-3-small".to_string());
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Self {
            client: Client::new(),
            api_key,
            model,
            base_url,
            dimension: 0,
            max_tokens: 8192,
        }
    }

    /// Embed a probe string to learn the model's output dimension.
    pub async fn detect_dimension(&mut self) -> Result<usize> {
        let result = self.embed("test").await?;
        self.dimension = result.len();
        Ok(self.dimension)
    }

    fn preprocess_text(&self, text: &str) -> String {
        if text.is_empty() {
            return " ".to_string();
        }

        let max_chars = self.max_tokens * 4;
        if text.len() > max_chars {
            text.chars().take(max_chars).collect()
        } else {
            text.to_string()
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: vec![self.preprocess_text(text)],
            encoding_format: "float".to_string(),
        };

        let url = format!("{}/embeddings", self.base_url);

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Embedding(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;

        embedding_response.data.into_iter()
            .map(|d| d.embedding)
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
