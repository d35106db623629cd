use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use vet_rag::corpus::load_corpus;
use vet_rag::embeddings::{EmbeddingProvider, OllamaEmbedding, OpenAIEmbedding};
use vet_rag::feedback::FeedbackStore;
use vet_rag::handlers::{Handlers, RetrieveArgs};
use vet_rag::search::HybridRetriever;
use vet_rag::semantic::SemanticIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting VetRAG retrieval service");

    let config = vet_rag::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // The semantic path is optional end to end: a provider that fails to
    // initialize disables it, it never aborts startup.
    let embedding: Option<Arc<dyn EmbeddingProvider>> = match config.embedding.provider {
        vet_rag::config::EmbeddingProvider::OpenAI => {
            match config.embedding.api_key.clone() {
                Some(api_key) => {
                    let mut openai = OpenAIEmbedding::new(
                        api_key,
                        Some(config.embedding.model.clone()),
                        config.embedding.base_url.clone(),
                    );
                    match openai.detect_dimension().await {
                        Ok(dimension) => {
                            tracing::info!(
                                "OpenAI initialized with model '{}' (dimension: {dimension})",
                                config.embedding.model
                            );
                            Some(Arc::new(openai))
                        }
                        Err(e) => {
                            tracing::warn!("Failed to initialize OpenAI embeddings: {e}");
                            None
                        }
                    }
                }
                None => {
                    tracing::warn!("OPENAI_API_KEY not set - semantic retrieval disabled");
                    None
                }
            }
        }
        vet_rag::config::EmbeddingProvider::Ollama => {
            let mut ollama = OllamaEmbedding::new(
                config.embedding.base_url.clone(),
                Some(config.embedding.model.clone()),
            );
            match ollama.initialize().await {
                Ok(()) => {
                    tracing::info!("Ollama initialized with model '{}'", config.embedding.model);
                    Some(Arc::new(ollama))
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize Ollama embeddings: {e}");
                    None
                }
            }
        }
    };

    let semantic = match embedding {
        Some(provider) => Some(SemanticIndex::connect(&config.semantic, provider).await),
        None => None,
    };

    let corpus = load_corpus(&config.corpus.paths);
    tracing::info!("Corpus loaded: {} documents", corpus.len());

    let feedback = Arc::new(FeedbackStore::new(
        config.feedback.scores_path.clone(),
        config.feedback.log_path.clone(),
    ));

    let retriever = Arc::new(HybridRetriever::new(
        corpus,
        semantic,
        Arc::clone(&feedback),
        config.search.clone(),
        config.semantic.pool_size,
    ));

    let handlers = Handlers::new(retriever, feedback, config.search.default_top_k);
    tracing::info!("Handlers initialized");

    println!("{}", handlers.handle_health()?);

    // Demo transport: one query per stdin line, one JSON response per line.
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let query = line.trim().to_string();
        if query.is_empty() {
            continue;
        }

        let response = handlers
            .handle_retrieve(RetrieveArgs {
                query,
                top_k: None,
            })
            .await?;
        println!("{response}");
    }

    Ok(())
}
