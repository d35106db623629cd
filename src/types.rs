use serde_json::{Map, Value};

/// Free-form record metadata, as decoded from one corpus line or one
/// feedback source payload.
pub type Metadata = Map<String, Value>;

/// Which retrieval path produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalMethod {
    Lexical,
    Semantic,
    Fallback,
}

impl RetrievalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::Lexical => "lexical",
            RetrievalMethod::Semantic => "semantic",
            RetrievalMethod::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document produced by one retrieval path, before merge and ranking.
/// Owned by the retriever for the duration of one query.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub content: String,
    pub metadata: Metadata,
    pub method: RetrievalMethod,
    /// Raw BM25 score for lexical hits, 0.0 for semantic hits.
    pub lexical_score: f64,
}

impl Candidate {
    pub fn lexical(content: String, metadata: Metadata, score: f64) -> Self {
        Self {
            content,
            metadata,
            method: RetrievalMethod::Lexical,
            lexical_score: score,
        }
    }

    pub fn semantic(content: String, metadata: Metadata) -> Self {
        Self {
            content,
            metadata,
            method: RetrievalMethod::Semantic,
            lexical_score: 0.0,
        }
    }

    /// Deduplication and feedback key for this candidate.
    pub fn key(&self) -> String {
        document_key(&self.metadata, &self.content)
    }
}

/// A candidate after feedback lookup and composite scoring. Query-scoped.
#[derive(Debug, Clone)]
pub struct RankedDocument {
    pub content: String,
    pub metadata: Metadata,
    pub method: RetrievalMethod,
    pub feedback_score: f64,
    pub composite_score: f64,
}

fn str_field<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn content_prefix(content: &str) -> String {
    content.chars().take(100).collect()
}

/// Resolve the identity of a retrieved document: `doi`, else `url`, else
/// `id`, else the first 100 characters of content. Two results for the same
/// underlying document must resolve to the same key or deduplication and
/// feedback association break.
pub fn document_key(metadata: &Metadata, content: &str) -> String {
    str_field(metadata, "doi")
        .or_else(|| str_field(metadata, "url"))
        .or_else(|| str_field(metadata, "id"))
        .map(str::to_string)
        .unwrap_or_else(|| content_prefix(content))
}

/// Resolve the identity of a feedback source record. Sources come back from
/// the request layer in a different shape than corpus records, so `title`
/// participates as an extra fallback before the content prefix. Unusable
/// identities (empty or the request layer's "N/A" placeholder) yield `None`
/// and the source is skipped.
pub fn source_key(source: &Metadata) -> Option<String> {
    let key = str_field(source, "doi")
        .or_else(|| str_field(source, "url"))
        .or_else(|| str_field(source, "id"))
        .or_else(|| str_field(source, "title"))
        .map(str::to_string)
        .or_else(|| {
            str_field(source, "content").map(content_prefix)
        })?;

    if key.is_empty() || key == "N/A" {
        None
    } else {
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: serde_json::Value) -> Metadata {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_document_key_priority() {
        let m = meta(json!({"doi": "10.1/x", "url": "https://a", "id": "r1"}));
        assert_eq!(document_key(&m, "body"), "10.1/x");

        let m = meta(json!({"url": "https://a", "id": "r1"}));
        assert_eq!(document_key(&m, "body"), "https://a");

        let m = meta(json!({"id": "r1"}));
        assert_eq!(document_key(&m, "body"), "r1");
    }

    #[test]
    fn test_document_key_content_fallback() {
        let m = Metadata::new();
        let long = "x".repeat(250);
        assert_eq!(document_key(&m, &long), "x".repeat(100));
    }

    #[test]
    fn test_document_key_ignores_empty_fields() {
        let m = meta(json!({"doi": "  ", "url": "", "id": "r1"}));
        assert_eq!(document_key(&m, "body"), "r1");
    }

    #[test]
    fn test_source_key_title_fallback() {
        let m = meta(json!({"title": "Rabies overview"}));
        assert_eq!(source_key(&m), Some("Rabies overview".to_string()));
    }

    #[test]
    fn test_source_key_rejects_placeholder() {
        let m = meta(json!({"url": "N/A"}));
        assert_eq!(source_key(&m), None);

        let m = Metadata::new();
        assert_eq!(source_key(&m), None);
    }

    #[test]
    fn test_source_key_content_prefix() {
        let m = meta(json!({"content": "Canine parvovirus is highly contagious"}));
        assert_eq!(
            source_key(&m),
            Some("Canine parvovirus is highly contagious".to_string())
        );
    }
}
