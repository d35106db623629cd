use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Vector similarity service configuration
    pub semantic: SemanticConfig,

    /// Corpus file locations
    pub corpus: CorpusConfig,

    /// Ranking configuration
    pub search: SearchConfig,

    /// Feedback persistence paths
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    pub base_url: String,
    pub index_name: String,
    /// Candidate pool requested from the vector service per query.
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Tried in order; the first path that opens wins.
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    pub feedback_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub scores_path: PathBuf,
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Ollama,
                api_key: None,
                model: "nomic-embed-text".to_string(),
                base_url: None,
            },
            semantic: SemanticConfig {
                base_url: "http://127.0.0.1:6333".to_string(),
                index_name: "vetrag-index".to_string(),
                pool_size: 8,
            },
            corpus: CorpusConfig {
                paths: vec![
                    PathBuf::from("/tmp/corpus.jsonl"),
                    PathBuf::from("corpus.jsonl"),
                ],
            },
            search: SearchConfig {
                default_top_k: 6,
                bm25_k1: 1.5,
                bm25_b: 0.75,
                lexical_weight: 0.3,
                semantic_weight: 0.7,
                feedback_weight: 0.1,
            },
            feedback: FeedbackConfig {
                scores_path: PathBuf::from("/tmp/feedback_scores.json"),
                log_path: PathBuf::from("/tmp/feedback_log.jsonl"),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = parse_provider(&provider)?;
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config.embedding.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(base_url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = Some(base_url);
        }

        if let Ok(url) = std::env::var("VECTOR_SERVICE_URL") {
            config.semantic.base_url = url;
        }

        if let Ok(index) = std::env::var("VECTOR_INDEX") {
            config.semantic.index_name = index;
        }

        if let Ok(corpus) = std::env::var("CORPUS_FILE") {
            // Keep the bundled file as a fallback behind the configured one.
            config.corpus.paths.insert(0, PathBuf::from(corpus));
        }

        if let Ok(data_dir) = std::env::var("DATA_DIR") {
            let data_path = PathBuf::from(data_dir);
            config.feedback.scores_path = data_path.join("feedback_scores.json");
            config.feedback.log_path = data_path.join("feedback_log.jsonl");
        }

        Ok(config)
    }
}

/// A misspelled provider fails startup instead of silently embedding with
/// the wrong backend.
fn parse_provider(value: &str) -> Result<EmbeddingProvider> {
    match value.to_lowercase().as_str() {
        "openai" => Ok(EmbeddingProvider::OpenAI),
        "ollama" => Ok(EmbeddingProvider::Ollama),
        other => Err(Error::Config(format!("Unknown embedding provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_accepts_known_values() {
        assert!(matches!(
            parse_provider("OpenAI").unwrap(),
            EmbeddingProvider::OpenAI
        ));
        assert!(matches!(
            parse_provider("ollama").unwrap(),
            EmbeddingProvider::Ollama
        ));
    }

    #[test]
    fn test_parse_provider_rejects_unknown_value() {
        assert!(parse_provider("cohere").is_err());
    }
}
