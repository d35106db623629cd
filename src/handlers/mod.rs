pub mod retrieve;
pub mod feedback;
pub mod status;

pub use retrieve::RetrieveArgs;
pub use feedback::FeedbackArgs;

use crate::feedback::FeedbackStore;
use crate::search::HybridRetriever;
use std::sync::Arc;

/// Application context for the request layer: every collaborator is built
/// once at startup and injected here. Handlers return JSON strings so any
/// transport can mount them.
#[derive(Clone)]
pub struct Handlers {
    retriever: Arc<HybridRetriever>,
    feedback: Arc<FeedbackStore>,
    default_top_k: usize,
}

impl Handlers {
    pub fn new(
        retriever: Arc<HybridRetriever>,
        feedback: Arc<FeedbackStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            retriever,
            feedback,
            default_top_k,
        }
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
