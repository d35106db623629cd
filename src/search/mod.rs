pub mod bm25;
pub mod hybrid;

pub use bm25::Bm25Index;
pub use hybrid::{HybridRetriever, RetrievalOutcome};

/// One lexical hit: an index into the corpus plus its raw BM25 score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Hit {
    pub index: usize,
    pub score: f64,
}
