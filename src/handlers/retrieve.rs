//! Retrieval handler: runs a hybrid query and shapes the ranked documents
//! into answer-source payloads for the request layer.

use super::{timestamp, Handlers};
use crate::types::RankedDocument;
use crate::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RetrieveArgs {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

const MAX_TOP_K: usize = 50;
const CONTENT_PREVIEW_CHARS: usize = 300;

impl Handlers {
    /// Handle a retrieval request - returns a JSON string.
    pub async fn handle_retrieve(&self, args: RetrieveArgs) -> Result<String> {
        let top_k = args.top_k.unwrap_or(self.default_top_k).min(MAX_TOP_K);

        info!("Processing query: {}", preview(&args.query, 50));

        let outcome = self.retriever.retrieve(&args.query, top_k).await;

        let sources: Vec<Value> = outcome.documents.iter().map(format_source).collect();

        info!("Retrieved {} sources", sources.len());

        let response = serde_json::json!({
            "sources": sources,
            "retrieval_info": {
                "total_sources": sources.len(),
                "hybrid_retrieval": true,
                "question_length": args.query.len(),
                "fallback": outcome.fallback,
                "lexical_error": outcome.lexical_error,
                "semantic_error": outcome.semantic_error,
            },
            "timestamp": timestamp(),
        });

        Ok(response.to_string())
    }
}

fn format_source(doc: &RankedDocument) -> Value {
    let mut source = serde_json::json!({
        "content": preview(&doc.content, CONTENT_PREVIEW_CHARS),
        "url": str_or(doc, "url", "N/A"),
        "title": str_or(doc, "title", "Veterinary Resource"),
        "category": str_or(doc, "category", "general"),
        "species": str_or(doc, "species", "multiple"),
        "retrieval_method": doc.method.as_str(),
        "relevance_score": round3(doc.composite_score),
        "feedback_score": doc.feedback_score,
    });

    if let Some(doi) = doc.metadata.get("doi").and_then(Value::as_str) {
        source["doi"] = Value::String(doi.to_string());
    }

    source
}

fn str_or<'a>(doc: &'a RankedDocument, key: &str, default: &'a str) -> &'a str {
    doc.metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_content() {
        let long = "x".repeat(400);
        let short = preview(&long, 300);
        assert_eq!(short.chars().count(), 303);
        assert!(short.ends_with("..."));

        assert_eq!(preview("short", 300), "short");
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(0.7), 0.7);
    }
}
