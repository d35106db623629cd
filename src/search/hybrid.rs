//! Hybrid retrieval core: merges lexical and semantic candidates,
//! deduplicates by document identity, blends in accumulated feedback, and
//! returns the top-K.
//!
//! Both retrieval paths are fault-isolated: a failed path contributes zero
//! candidates and is reported on the outcome instead of propagating. When
//! neither path produces anything the retriever degrades to a single fixed
//! fallback document rather than an unexplained empty list.

use crate::config::SearchConfig;
use crate::corpus::Corpus;
use crate::feedback::FeedbackStore;
use crate::search::{Bm25Index, Bm25Hit};
use crate::semantic::SemanticIndex;
use crate::types::{Candidate, Metadata, RankedDocument, RetrievalMethod};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of one `retrieve` call. `documents` always holds something
/// presentable; the error fields let callers tell "nothing matched" apart
/// from "a retrieval path degraded".
#[derive(Debug)]
pub struct RetrievalOutcome {
    pub documents: Vec<RankedDocument>,
    pub lexical_error: Option<String>,
    pub semantic_error: Option<String>,
    /// True when the fixed fallback document was substituted.
    pub fallback: bool,
}

impl RetrievalOutcome {
    fn empty() -> Self {
        Self {
            documents: Vec::new(),
            lexical_error: None,
            semantic_error: None,
            fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub embeddings_available: bool,
    pub bm25_available: bool,
    pub corpus_doc_count: usize,
    pub semantic_available: bool,
    pub semantic_index: Option<String>,
    pub embedding_provider: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentFlags {
    pub bm25_enabled: bool,
    pub semantic_enabled: bool,
    pub feedback_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalStats {
    pub total_corpus_docs: usize,
    pub feedback_scores_count: usize,
    pub average_feedback_score: f64,
    pub components: ComponentFlags,
}

pub struct HybridRetriever {
    corpus: Corpus,
    bm25: Option<Bm25Index>,
    semantic: Option<SemanticIndex>,
    feedback: Arc<FeedbackStore>,
    search: SearchConfig,
    /// Candidate pool requested from the semantic path, at least `top_k`.
    semantic_pool: usize,
}

impl HybridRetriever {
    pub fn new(
        corpus: Corpus,
        semantic: Option<SemanticIndex>,
        feedback: Arc<FeedbackStore>,
        search: SearchConfig,
        semantic_pool: usize,
    ) -> Self {
        let bm25 = Bm25Index::with_params(&corpus.texts, search.bm25_k1, search.bm25_b);

        match &bm25 {
            Some(index) => info!("Initialized BM25 with {} documents", index.doc_count()),
            None => warn!("No corpus texts found - BM25 retrieval disabled"),
        }

        Self {
            corpus,
            bm25,
            semantic,
            feedback,
            search,
            semantic_pool,
        }
    }

    /// Retrieve the `top_k` best documents for `query`.
    ///
    /// Empty or whitespace-only queries yield an empty outcome. Lexical and
    /// semantic candidates are gathered concurrently, concatenated (lexical
    /// first), deduplicated first-arrival by document identity, scored, and
    /// truncated.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalOutcome {
        if query.trim().is_empty() {
            warn!("Empty query provided");
            return RetrievalOutcome::empty();
        }

        let (lexical_result, semantic_result) = tokio::join!(
            async { self.lexical_candidates(query, top_k) },
            self.semantic_candidates(query, self.semantic_pool.max(top_k)),
        );

        let mut lexical_error = None;
        let lexical_candidates = match lexical_result {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Error in lexical retrieval: {e}");
                lexical_error = Some(e.to_string());
                Vec::new()
            }
        };

        let mut semantic_error = None;
        let semantic_candidates = match semantic_result {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Error in semantic retrieval: {e}");
                semantic_error = Some(e.to_string());
                Vec::new()
            }
        };

        let mut all_candidates = lexical_candidates;
        all_candidates.extend(semantic_candidates);

        if all_candidates.is_empty() {
            return RetrievalOutcome {
                documents: vec![fallback_document()],
                lexical_error,
                semantic_error,
                fallback: true,
            };
        }

        let total = all_candidates.len();
        let documents = self.dedup_and_rank(all_candidates, top_k);

        info!(
            "Ranked {} unique documents from {total} candidates for query: '{}'",
            documents.len(),
            truncate_for_log(query),
        );

        RetrievalOutcome {
            documents,
            lexical_error,
            semantic_error,
            fallback: false,
        }
    }

    /// Lexical hits mapped back to their corpus records. A hit whose index
    /// has no corpus record means the index and corpus fell out of sync and
    /// the whole lexical path is reported as failed rather than silently
    /// returning a partial list.
    fn lexical_candidates(&self, query: &str, pool: usize) -> Result<Vec<Candidate>> {
        let Some(bm25) = &self.bm25 else {
            return Ok(Vec::new());
        };

        bm25.top_k(query, pool)
            .into_iter()
            .map(|Bm25Hit { index, score }| {
                let record = self.corpus.docs.get(index).ok_or_else(|| {
                    Error::Lexical(format!("BM25 hit {index} has no corpus record"))
                })?;
                let text = self.corpus.texts.get(index).ok_or_else(|| {
                    Error::Lexical(format!("BM25 hit {index} has no corpus text"))
                })?;

                let mut metadata = record.clone();
                metadata.insert(
                    "retrieval_method".to_string(),
                    Value::String("lexical".to_string()),
                );
                metadata.insert("lexical_score".to_string(), serde_json::json!(score));

                Ok(Candidate::lexical(text.clone(), metadata, score))
            })
            .collect()
    }

    async fn semantic_candidates(&self, query: &str, pool: usize) -> Result<Vec<Candidate>> {
        match &self.semantic {
            Some(index) => index.top_k(query, pool).await,
            None => Ok(Vec::new()),
        }
    }

    /// First-arrival dedup, feedback lookup, composite scoring, stable sort,
    /// truncate. When both paths find a document the lexical copy arrives
    /// first and survives, so its semantic tag is lost; observed behavior of
    /// the ranking formula, kept as-is.
    fn dedup_and_rank(&self, candidates: Vec<Candidate>, top_k: usize) -> Vec<RankedDocument> {
        let feedback_scores = self.feedback.load();

        let mut seen: HashSet<String> = HashSet::new();
        let mut ranked: Vec<RankedDocument> = Vec::new();

        for candidate in candidates {
            let key = candidate.key();
            if !seen.insert(key.clone()) {
                continue;
            }

            let feedback_score = feedback_scores.get(&key).copied().unwrap_or(0.0);

            // Every candidate receives the constant semantic-relevance term,
            // lexical hits included.
            let composite_score = candidate.lexical_score * self.search.lexical_weight
                + 1.0 * self.search.semantic_weight
                + feedback_score * self.search.feedback_weight;

            let Candidate {
                content,
                mut metadata,
                method,
                ..
            } = candidate;

            metadata.insert("feedback_score".to_string(), serde_json::json!(feedback_score));
            metadata.insert("composite_score".to_string(), serde_json::json!(composite_score));

            ranked.push(RankedDocument {
                content,
                metadata,
                method,
                feedback_score,
                composite_score,
            });
        }

        ranked.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);
        ranked
    }

    /// Snapshot diagnostic of the retrieval components. No side effects.
    pub fn health_check(&self) -> HealthStatus {
        HealthStatus {
            embeddings_available: self.semantic.is_some(),
            bm25_available: self.bm25.is_some(),
            corpus_doc_count: self.corpus.len(),
            semantic_available: self
                .semantic
                .as_ref()
                .is_some_and(SemanticIndex::is_available),
            semantic_index: self.semantic.as_ref().map(|s| s.index_name().to_string()),
            embedding_provider: self
                .semantic
                .as_ref()
                .map(|s| s.embedding_provider_name().to_string()),
        }
    }

    pub fn stats(&self) -> RetrievalStats {
        let feedback_scores = self.feedback.load();
        let count = feedback_scores.len();
        let sum: f64 = feedback_scores.values().sum();

        RetrievalStats {
            total_corpus_docs: self.corpus.len(),
            feedback_scores_count: count,
            average_feedback_score: if count > 0 { sum / count as f64 } else { 0.0 },
            components: ComponentFlags {
                bm25_enabled: self.bm25.is_some(),
                semantic_enabled: self
                    .semantic
                    .as_ref()
                    .is_some_and(SemanticIndex::is_available),
                feedback_enabled: count > 0,
            },
        }
    }
}

/// The fixed document returned when no retrieval path produced anything.
fn fallback_document() -> RankedDocument {
    let mut metadata = Metadata::new();
    metadata.insert(
        "title".to_string(),
        Value::String("VetRAG Information".to_string()),
    );
    metadata.insert("source".to_string(), Value::String("system".to_string()));
    metadata.insert(
        "retrieval_method".to_string(),
        Value::String("fallback".to_string()),
    );

    RankedDocument {
        content: "VetRAG is a veterinary AI assistant. Please ensure your knowledge \
                  base is initialized with veterinary documents."
            .to_string(),
        metadata,
        method: RetrievalMethod::Fallback,
        feedback_score: 0.0,
        composite_score: 0.0,
    }
}

fn truncate_for_log(query: &str) -> String {
    query.chars().take(50).collect()
}
