pub mod openai;
pub mod ollama;

use crate::Result;
use async_trait::async_trait;

/// Embeds query text into the fixed-dimension vector space the semantic
/// index was built with.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;

    fn provider_name(&self) -> &str;
}

pub use openai::OpenAIEmbedding;
pub use ollama::OllamaEmbedding;
