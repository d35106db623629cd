//! In-memory BM25 lexical index over the loaded corpus.
//!
//! Tokenization is deliberately simple (lowercase, split on whitespace) and
//! identical for documents and queries. IDF uses the non-negative Lucene
//! variant `ln(1 + (N - df + 0.5) / (df + 0.5))`.

use super::Bm25Hit;
use std::collections::HashMap;

const DEFAULT_K1: f64 = 1.5;
const DEFAULT_B: f64 = 0.75;

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

pub struct Bm25Index {
    k1: f64,
    b: f64,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    /// Build the index over the corpus texts. Returns `None` for an empty
    /// corpus; callers treat a missing index as "lexical retrieval disabled".
    pub fn build(texts: &[String]) -> Option<Self> {
        Self::with_params(texts, DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params(texts: &[String], k1: f64, b: f64) -> Option<Self> {
        if texts.is_empty() {
            return None;
        }

        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();

        let doc_lens: Vec<usize> = tokenized.iter().map(Vec::len).collect();
        let total_len: usize = doc_lens.iter().sum();
        let avg_doc_len = total_len as f64 / texts.len() as f64;

        let mut term_freqs = Vec::with_capacity(tokenized.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for tokens in &tokenized {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let n = texts.len() as f64;
        let idf = doc_freqs
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        Some(Self {
            k1,
            b,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        })
    }

    pub fn doc_count(&self) -> usize {
        self.term_freqs.len()
    }

    /// BM25 score of every document against the query, in corpus order.
    pub fn scores(&self, query: &str) -> Vec<f64> {
        let query_tokens = tokenize(query);

        self.term_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(freqs, &doc_len)| {
                let norm = 1.0 - self.b + self.b * doc_len as f64 / self.avg_doc_len;

                query_tokens
                    .iter()
                    .map(|token| {
                        let tf = freqs.get(token).copied().unwrap_or(0) as f64;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let idf = self.idf.get(token).copied().unwrap_or(0.0);
                        idf * tf * (self.k1 + 1.0) / (tf + self.k1 * norm)
                    })
                    .sum()
            })
            .collect()
    }

    /// The `k` highest-scoring documents, descending by score; ties keep
    /// ascending corpus order (stable sort).
    pub fn top_k(&self, query: &str, k: usize) -> Vec<Bm25Hit> {
        let mut hits: Vec<Bm25Hit> = self
            .scores(query)
            .into_iter()
            .enumerate()
            .map(|(index, score)| Bm25Hit { index, score })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_corpus_builds_no_index() {
        assert!(Bm25Index::build(&[]).is_none());
    }

    #[test]
    fn test_scores_cover_every_document() {
        let index = Bm25Index::build(&texts(&[
            "rabies is fatal in dogs",
            "feline leukemia virus",
            "canine parvovirus vaccination",
        ]))
        .unwrap();

        let scores = index.scores("rabies vaccination");
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert!(scores[2] > 0.0);
    }

    #[test]
    fn test_top_k_sorted_descending_with_valid_indices() {
        let corpus = texts(&[
            "dog vaccination schedule",
            "cat dental care",
            "dog dog dog kennel cough",
            "equine colic treatment",
        ]);
        let index = Bm25Index::build(&corpus).unwrap();

        let hits = index.top_k("dog", 3);
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for hit in &hits {
            assert!(hit.index < corpus.len());
        }
        // Term saturation, not raw frequency, but the repeated-term doc
        // still ranks first here.
        assert_eq!(hits[0].index, 2);
    }

    #[test]
    fn test_ties_break_by_corpus_order() {
        let index = Bm25Index::build(&texts(&[
            "unrelated text here",
            "more unrelated text",
            "still unrelated",
        ]))
        .unwrap();

        // No document matches: all scores are 0.0, order must be stable.
        let hits = index.top_k("zoonosis", 3);
        let indices: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_top_k_larger_than_corpus() {
        let index = Bm25Index::build(&texts(&["one document"])).unwrap();
        assert_eq!(index.top_k("document", 10).len(), 1);
    }

    #[test]
    fn test_query_tokenization_is_case_insensitive() {
        let index = Bm25Index::build(&texts(&["Rabies Prevention Guide"])).unwrap();
        let hits = index.top_k("RABIES prevention", 1);
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn test_single_document_rabies_scenario() {
        let index = Bm25Index::build(&texts(&["Rabies is fatal..."])).unwrap();
        let hits = index.top_k("rabies prevention", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
        assert!(hits[0].score > 0.0);
    }
}
