//! Health and statistics handlers. Snapshot diagnostics, no side effects.

use super::{timestamp, Handlers};
use crate::Result;

impl Handlers {
    /// Handle a retrieval health check - returns a JSON string.
    pub fn handle_health(&self) -> Result<String> {
        let health = self.retriever.health_check();
        let stats = self.retriever.stats();

        let degraded = !health.bm25_available || !health.semantic_available;

        let response = serde_json::json!({
            "status": if degraded { "degraded" } else { "healthy" },
            "health": health,
            "stats": stats,
            "timestamp": timestamp(),
        });

        Ok(response.to_string())
    }

    /// Handle a feedback statistics request - returns a JSON string.
    pub fn handle_feedback_stats(&self) -> Result<String> {
        let stats = self.feedback.stats();
        let top_sources = self.feedback.top_sources(10);

        let response = serde_json::json!({
            "status": "success",
            "stats": stats,
            "top_sources": top_sources,
            "timestamp": timestamp(),
        });

        Ok(response.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SearchConfig;
    use crate::corpus::load_corpus;
    use crate::feedback::FeedbackStore;
    use crate::handlers::{FeedbackArgs, Handlers, RetrieveArgs};
    use crate::search::HybridRetriever;
    use serde_json::Value;
    use std::io::Write;
    use std::sync::Arc;

    fn handlers(dir: &tempfile::TempDir, corpus_lines: &[&str]) -> Handlers {
        let corpus_path = dir.path().join("corpus.jsonl");
        let mut file = std::fs::File::create(&corpus_path).unwrap();
        for line in corpus_lines {
            writeln!(file, "{line}").unwrap();
        }

        let feedback = Arc::new(FeedbackStore::new(
            dir.path().join("feedback_scores.json"),
            dir.path().join("feedback_log.jsonl"),
        ));

        let retriever = Arc::new(HybridRetriever::new(
            load_corpus(&[corpus_path]),
            None,
            Arc::clone(&feedback),
            SearchConfig {
                default_top_k: 6,
                bm25_k1: 1.5,
                bm25_b: 0.75,
                lexical_weight: 0.3,
                semantic_weight: 0.7,
                feedback_weight: 0.1,
            },
            8,
        ));

        Handlers::new(retriever, feedback, 6)
    }

    #[tokio::test]
    async fn test_retrieve_handler_shapes_sources() {
        let dir = tempfile::tempdir().unwrap();
        let h = handlers(
            &dir,
            &[r#"{"title": "Rabies", "text": "Rabies is fatal...", "id": "r1", "species": "canine"}"#],
        );

        let raw = h
            .handle_retrieve(RetrieveArgs {
                query: "rabies prevention".to_string(),
                top_k: Some(3),
            })
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();

        let sources = response["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0]["title"], "Rabies");
        assert_eq!(sources[0]["species"], "canine");
        assert_eq!(sources[0]["category"], "general");
        assert_eq!(sources[0]["retrieval_method"], "lexical");
        assert_eq!(sources[0]["feedback_score"], 0.0);
        assert_eq!(response["retrieval_info"]["fallback"], false);
        assert_eq!(response["retrieval_info"]["total_sources"], 1);
    }

    #[tokio::test]
    async fn test_retrieve_handler_reports_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let h = handlers(&dir, &[]);

        let raw = h
            .handle_retrieve(RetrieveArgs {
                query: "anything".to_string(),
                top_k: None,
            })
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["retrieval_info"]["fallback"], true);
        assert_eq!(response["sources"][0]["retrieval_method"], "fallback");
    }

    #[tokio::test]
    async fn test_feedback_handler_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let h = handlers(&dir, &[r#"{"id": "r1", "text": "rabies"}"#]);

        let source = serde_json::json!({"id": "r1"}).as_object().unwrap().clone();
        let raw = h
            .handle_feedback(FeedbackArgs {
                question: "q".to_string(),
                answer: "a".to_string(),
                approved: true,
                sources: vec![source],
                user_comment: None,
            })
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["status"], "success");
        assert_eq!(response["sources_updated"], 1);
        assert_eq!(response["logged"], true);

        // The applied delta is visible on the next retrieval.
        let raw = h
            .handle_retrieve(RetrieveArgs {
                query: "rabies".to_string(),
                top_k: Some(1),
            })
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(response["sources"][0]["feedback_score"], 1.0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let dir = tempfile::tempdir().unwrap();
        let h = handlers(&dir, &[r#"{"id": "r1", "text": "rabies"}"#]);

        let raw = h.handle_health().unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["status"], "degraded");
        assert_eq!(response["health"]["bm25_available"], true);
        assert_eq!(response["health"]["semantic_available"], false);
        assert_eq!(response["health"]["corpus_doc_count"], 1);
        assert_eq!(response["stats"]["total_corpus_docs"], 1);
    }

    #[tokio::test]
    async fn test_feedback_stats_handler() {
        let dir = tempfile::tempdir().unwrap();
        let h = handlers(&dir, &[r#"{"id": "r1", "text": "rabies"}"#]);

        std::fs::write(
            dir.path().join("feedback_scores.json"),
            r#"{"r1": 2, "r2": -1}"#,
        )
        .unwrap();

        let raw = h.handle_feedback_stats().unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["status"], "success");
        assert_eq!(response["stats"]["total_documents"], 2);
        assert_eq!(response["top_sources"][0]["document_id"], "r1");
    }
}
