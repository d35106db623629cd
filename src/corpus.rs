//! Corpus loading from newline-delimited JSON record files.
//!
//! Each line is one record carrying at least one of `text`/`title`/
//! `abstract`/`content` plus optional identity and taxonomy fields. Malformed
//! lines are skipped, not fatal.

use crate::types::Metadata;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// The in-memory corpus: `texts[i]` is the resolved text of `docs[i]`.
/// Built once at startup, immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub texts: Vec<String>,
    pub docs: Vec<Metadata>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Resolve the text of one record: `text`, else `title`, else `abstract`,
/// else `content`. Empty after trimming means the record is unusable. The
/// semantic adapter applies the same rule to vector-service match metadata.
pub fn resolve_text(record: &Metadata) -> Option<String> {
    for key in ["text", "title", "abstract", "content"] {
        if let Some(value) = record.get(key).and_then(Value::as_str) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn has_identity(record: &Metadata) -> bool {
    ["id", "doi", "url"].iter().any(|k| record.contains_key(*k))
}

fn parse_lines(raw: &str, source: &Path) -> Corpus {
    let mut corpus = Corpus::default();

    for (line_num, line) in raw.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut record: Metadata = match serde_json::from_str(line) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Skipping non-object record on line {line_num} of {}", source.display());
                continue;
            }
            Err(e) => {
                warn!("Skipping invalid JSON on line {line_num} of {}: {e}", source.display());
                continue;
            }
        };

        let Some(text) = resolve_text(&record) else {
            continue;
        };

        // Guarantee deduplication always has a key to work with.
        if !has_identity(&record) {
            record.insert("id".to_string(), Value::String(format!("doc_{line_num}")));
        }

        corpus.texts.push(text);
        corpus.docs.push(record);
    }

    corpus
}

/// Load the corpus from the first openable path in `paths`. A path that opens
/// wins even if it yields zero usable records; only open/read failures fall
/// through to the next path. No openable path at all is non-fatal: lexical
/// retrieval simply stays disabled.
pub fn load_corpus(paths: &[PathBuf]) -> Corpus {
    for path in paths {
        if !path.exists() {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let corpus = parse_lines(&raw, path);
                info!("Loaded {} documents from {}", corpus.len(), path.display());
                return corpus;
            }
            Err(e) => {
                error!("Error reading corpus file {}: {e}", path.display());
                continue;
            }
        }
    }

    warn!("No corpus file found - lexical retrieval will be disabled");
    Corpus::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(dir: &tempfile::TempDir, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(
            &dir,
            "corpus.jsonl",
            &[
                r#"{"id": "r1", "text": "Rabies is fatal once symptoms appear"}"#,
                "not json at all",
                r#"{"id": "r2", "title": "Feline leukemia"}"#,
            ],
        );

        let corpus = load_corpus(&[path]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.texts[1], "Feline leukemia");
    }

    #[test]
    fn test_text_fallback_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(
            &dir,
            "corpus.jsonl",
            &[
                r#"{"id": "r1", "title": "Title", "text": "Text wins"}"#,
                r#"{"id": "r2", "abstract": "Abstract wins", "content": "ignored"}"#,
                r#"{"id": "r3", "content": "Content as last resort"}"#,
            ],
        );

        let corpus = load_corpus(&[path]);
        assert_eq!(
            corpus.texts,
            vec!["Text wins", "Abstract wins", "Content as last resort"]
        );
    }

    #[test]
    fn test_records_without_text_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(
            &dir,
            "corpus.jsonl",
            &[
                r#"{"id": "r1", "text": "   "}"#,
                r#"{"id": "r2", "species": "canine"}"#,
                r#"{"id": "r3", "text": "kept"}"#,
            ],
        );

        let corpus = load_corpus(&[path]);
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.docs[0]["id"], "r3");
    }

    #[test]
    fn test_synthesized_identity_uses_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(
            &dir,
            "corpus.jsonl",
            &[
                r#"{"id": "r1", "text": "has id"}"#,
                r#"{"text": "no id at all"}"#,
                r#"{"doi": "10.1/x", "text": "doi counts as identity"}"#,
            ],
        );

        let corpus = load_corpus(&[path]);
        assert_eq!(corpus.docs[1]["id"], "doc_2");
        assert!(!corpus.docs[2].contains_key("id"));
    }

    #[test]
    fn test_fallback_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jsonl");
        let backup = write_corpus(&dir, "backup.jsonl", &[r#"{"id": "b1", "text": "backup"}"#]);

        let corpus = load_corpus(&[missing, backup]);
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.docs[0]["id"], "b1");
    }

    #[test]
    fn test_first_openable_path_wins_even_if_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write_corpus(&dir, "empty.jsonl", &["garbage line"]);
        let backup = write_corpus(&dir, "backup.jsonl", &[r#"{"id": "b1", "text": "backup"}"#]);

        let corpus = load_corpus(&[empty, backup]);
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_no_path_yields_empty_corpus() {
        let corpus = load_corpus(&[PathBuf::from("/nonexistent/corpus.jsonl")]);
        assert!(corpus.is_empty());
    }
}
