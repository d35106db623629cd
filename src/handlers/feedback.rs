//! Feedback handler: applies approval/rejection deltas to the score store
//! and appends an audit log entry.

use super::{timestamp, Handlers};
use crate::types::Metadata;
use crate::Result;
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct FeedbackArgs {
    pub question: String,
    pub answer: String,
    pub approved: bool,
    pub sources: Vec<Metadata>,
    #[serde(default)]
    pub user_comment: Option<String>,
}

impl Handlers {
    /// Handle a feedback submission - returns a JSON string. Persistence
    /// failure is reported through the `persisted` flag, never as an error
    /// that could take down the request layer.
    pub async fn handle_feedback(&self, args: FeedbackArgs) -> Result<String> {
        let outcome = self.feedback.update_scores(&args.sources, args.approved).await;

        let logged = self.feedback.log_feedback(
            &args.question,
            &args.answer,
            &args.sources,
            args.approved,
            args.user_comment.as_deref(),
        );

        if !outcome.persisted {
            error!("Feedback scores were applied in memory but not persisted");
        }

        let response = serde_json::json!({
            "status": if outcome.persisted { "success" } else { "partial" },
            "message": "Thank you for your feedback! It helps improve VetRAG.",
            "sources_updated": outcome.updated,
            "persisted": outcome.persisted,
            "logged": logged,
            "timestamp": timestamp(),
        });

        Ok(response.to_string())
    }
}
