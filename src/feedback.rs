//! Feedback persistence: per-document score accumulators plus an append-only
//! audit log.
//!
//! Scores live in one flat JSON object keyed by document identity. Every
//! read-modify-write cycle runs under the store's mutex and replaces the file
//! atomically (temp file + rename), so concurrent feedback submissions never
//! interleave partial writes. A corrupt or missing scores file loads as an
//! empty map; prior feedback is lost, not fatal.

use crate::types::{source_key, Metadata};
use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub type ScoreMap = HashMap<String, f64>;

/// Outcome of one feedback update. The in-memory map reflects the applied
/// deltas even when persistence failed, so the caller can still report the
/// attempted scores.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub scores: ScoreMap,
    pub updated: usize,
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub total_documents: usize,
    pub average_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    pub positive_scores: usize,
    pub negative_scores: usize,
    pub neutral_scores: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceScore {
    pub document_id: String,
    pub score: f64,
}

pub struct FeedbackStore {
    scores_path: PathBuf,
    log_path: PathBuf,
    // Single-writer serialization point for load+mutate+save cycles.
    write_lock: Mutex<()>,
}

impl FeedbackStore {
    pub fn new(scores_path: PathBuf, log_path: PathBuf) -> Self {
        Self {
            scores_path,
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the persisted score map. Missing file or parse failure yields an
    /// empty map; corruption is logged because it silently discards prior
    /// feedback.
    pub fn load(&self) -> ScoreMap {
        if !self.scores_path.exists() {
            debug!("No existing scores file found, starting fresh");
            return ScoreMap::new();
        }

        match std::fs::read_to_string(&self.scores_path) {
            Ok(raw) => match serde_json::from_str::<ScoreMap>(&raw) {
                Ok(scores) => {
                    debug!("Loaded {} feedback scores", scores.len());
                    scores
                }
                Err(e) => {
                    error!(
                        "Corrupt feedback scores file {} ({e}), treating as empty",
                        self.scores_path.display()
                    );
                    ScoreMap::new()
                }
            },
            Err(e) => {
                error!("Error loading scores: {e}");
                ScoreMap::new()
            }
        }
    }

    /// Replace the scores file atomically: write a sibling temp file, then
    /// rename over the old one. A failure leaves the prior file intact.
    fn save(&self, scores: &ScoreMap) -> Result<()> {
        if let Some(parent) = self.scores_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Persistence(format!("Cannot create scores dir: {e}")))?;
        }

        let tmp_path = self.scores_path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(scores)?;

        std::fs::write(&tmp_path, data)
            .map_err(|e| Error::Persistence(format!("Cannot write scores file: {e}")))?;
        std::fs::rename(&tmp_path, &self.scores_path)
            .map_err(|e| Error::Persistence(format!("Cannot replace scores file: {e}")))?;

        debug!("Saved {} feedback scores", scores.len());
        Ok(())
    }

    /// Apply +1 (approved) or -1 (rejected) to every source that resolves to
    /// a usable identity, then persist the full map.
    pub async fn update_scores(&self, sources: &[Metadata], approved: bool) -> UpdateOutcome {
        let _guard = self.write_lock.lock().await;

        let mut scores = self.load();
        let delta = if approved { 1.0 } else { -1.0 };
        let mut updated = 0;

        for source in sources {
            let Some(doc_id) = source_key(source) else {
                continue;
            };

            let entry = scores.entry(doc_id.clone()).or_insert(0.0);
            let old_score = *entry;
            *entry += delta;
            updated += 1;

            debug!("Updated score for {doc_id}: {old_score} -> {}", *entry);
        }

        let persisted = if updated > 0 {
            match self.save(&scores) {
                Ok(()) => {
                    info!("Updated scores for {updated} sources (approved: {approved})");
                    true
                }
                Err(e) => {
                    error!("Error saving scores: {e}");
                    false
                }
            }
        } else {
            warn!("No valid document IDs found in sources");
            true
        };

        UpdateOutcome {
            scores,
            updated,
            persisted,
        }
    }

    /// Append one audit entry to the feedback log. Returns whether the write
    /// succeeded; logging failure never fails the feedback request itself.
    pub fn log_feedback(
        &self,
        question: &str,
        answer: &str,
        sources: &[Metadata],
        approved: bool,
        user_comment: Option<&str>,
    ) -> bool {
        match self.append_log_entry(question, answer, sources, approved, user_comment) {
            Ok(()) => {
                info!("Logged feedback entry (approved: {approved})");
                true
            }
            Err(e) => {
                error!("Error logging feedback: {e}");
                false
            }
        }
    }

    fn append_log_entry(
        &self,
        question: &str,
        answer: &str,
        sources: &[Metadata],
        approved: bool,
        user_comment: Option<&str>,
    ) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Persistence(format!("Cannot create log dir: {e}")))?;
        }

        let logged_sources: Vec<Value> = sources
            .iter()
            .map(|source| {
                serde_json::json!({
                    "id": str_field(source, "doi")
                        .or_else(|| str_field(source, "url"))
                        .or_else(|| str_field(source, "title"))
                        .unwrap_or("unknown"),
                    "title": str_field(source, "title").unwrap_or("No title"),
                    "url": str_field(source, "url").unwrap_or("N/A"),
                    "category": str_field(source, "category").unwrap_or("general"),
                    "species": str_field(source, "species").unwrap_or("unknown"),
                })
            })
            .collect();

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "question": question,
            "answer": answer,
            "sources_count": sources.len(),
            "approved": approved,
            "user_comment": user_comment,
            "sources": logged_sources,
        });

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| Error::Persistence(format!("Cannot open feedback log: {e}")))?;

        writeln!(file, "{}", serde_json::to_string(&entry)?)
            .map_err(|e| Error::Persistence(format!("Cannot append feedback log: {e}")))?;

        Ok(())
    }

    /// Aggregate statistics over all stored scores.
    pub fn stats(&self) -> FeedbackStats {
        let scores = self.load();

        if scores.is_empty() {
            return FeedbackStats {
                total_documents: 0,
                average_score: 0.0,
                max_score: None,
                min_score: None,
                positive_scores: 0,
                negative_scores: 0,
                neutral_scores: 0,
            };
        }

        let values: Vec<f64> = scores.values().copied().collect();
        let sum: f64 = values.iter().sum();

        FeedbackStats {
            total_documents: scores.len(),
            average_score: sum / values.len() as f64,
            max_score: values.iter().copied().fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |m| m.max(v)))
            }),
            min_score: values.iter().copied().fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |m| m.min(v)))
            }),
            positive_scores: values.iter().filter(|&&s| s > 0.0).count(),
            negative_scores: values.iter().filter(|&&s| s < 0.0).count(),
            neutral_scores: values.iter().filter(|&&s| s == 0.0).count(),
        }
    }

    /// The highest-scored identities, descending, at most `limit` entries.
    pub fn top_sources(&self, limit: usize) -> Vec<SourceScore> {
        let scores = self.load();

        let mut sorted: Vec<(String, f64)> = scores.into_iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        sorted
            .into_iter()
            .take(limit)
            .map(|(document_id, score)| SourceScore { document_id, score })
            .collect()
    }
}

fn str_field<'a>(source: &'a Metadata, key: &str) -> Option<&'a str> {
    source
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
