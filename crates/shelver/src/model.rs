//! Statistical subject model
//!
//! The content signal comes from a trained artifact: a token -> subject
//! weight table built from labeled sample documents. Prediction is a
//! bag-of-tokens arg-max. The artifact is JSON on disk; a missing or
//! corrupt artifact is fatal at startup, never a silent no-op.

use crate::error::{Result, ShelverError};
use crate::extract::ContentExtractor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Predicts a subject label from extracted text.
///
/// Callers are responsible for the short-content gate; results on text
/// under the gate are unspecified.
pub trait SubjectModel: Send + Sync {
    fn predict(&self, text: &str) -> Option<String>;
}

/// Token -> per-subject weight table with arg-max prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWeightModel {
    /// Subjects the model was trained on.
    pub subjects: Vec<String>,
    /// token -> subject -> weight
    pub weights: HashMap<String, BTreeMap<String, f64>>,
}

impl TokenWeightModel {
    /// Load the artifact, failing loudly when it is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ShelverError::Model(format!(
                "Model artifact not found at {}: {} (run `shelver train` first)",
                path.display(),
                e
            ))
        })?;
        let model: TokenWeightModel = serde_json::from_str(&raw)
            .map_err(|e| ShelverError::Model(format!("Corrupt model artifact: {e}")))?;
        if model.subjects.is_empty() {
            return Err(ShelverError::Model(
                "Model artifact has no subjects".to_string(),
            ));
        }
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Train from a directory of per-subject sample folders:
    /// `<samples>/<subject>/<document>`. Token weights are relative
    /// frequencies within the subject, so large sample sets do not drown
    /// out small ones.
    pub fn train(samples_dir: &Path, extractor: &dyn ContentExtractor) -> Result<Self> {
        let mut counts: HashMap<String, HashMap<String, u64>> = HashMap::new();

        for entry in walkdir::WalkDir::new(samples_dir)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let subject = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .map(|s| s.to_string());
            let Some(subject) = subject else { continue };

            let text = match extractor.extract(entry.path()) {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "skipping unreadable sample");
                    continue;
                }
            };

            let subject_counts = counts.entry(subject).or_default();
            for token in tokenize(&text) {
                *subject_counts.entry(token).or_insert(0) += 1;
            }
        }

        if counts.is_empty() {
            return Err(ShelverError::Model(format!(
                "No usable samples under {} (expected <samples>/<subject>/<file>)",
                samples_dir.display()
            )));
        }

        let mut subjects: Vec<String> = counts.keys().cloned().collect();
        subjects.sort();

        let mut weights: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
        for (subject, subject_counts) in &counts {
            let total: u64 = subject_counts.values().sum();
            if total == 0 {
                continue;
            }
            for (token, count) in subject_counts {
                weights
                    .entry(token.clone())
                    .or_default()
                    .insert(subject.clone(), *count as f64 / total as f64);
            }
        }

        Ok(Self { subjects, weights })
    }
}

impl SubjectModel for TokenWeightModel {
    fn predict(&self, text: &str) -> Option<String> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(subject_weights) = self.weights.get(&token) {
                for (subject, weight) in subject_weights {
                    *totals.entry(subject.as_str()).or_insert(0.0) += *weight;
                }
            }
        }

        // BTreeMap iteration makes score ties deterministic (first label
        // in lexical order wins inside the model; the scoring engine
        // treats cross-subject ambiguity separately).
        let (best, score) = totals
            .iter()
            .fold(None::<(&str, f64)>, |acc, (subject, score)| match acc {
                Some((_, best_score)) if best_score >= *score => acc,
                _ => Some((*subject, *score)),
            })?;

        debug!(subject = best, score, "model prediction");
        if score > 0.0 {
            Some(best.to_string())
        } else {
            None
        }
    }
}

/// Split text into ASCII word tokens (lowercased) and single non-ASCII
/// alphabetic characters, which keeps CJK content usable without a
/// segmenter.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            word.push(ch.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if ch.is_alphabetic() {
            tokens.push(ch.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}
