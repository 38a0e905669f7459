//! Local terminology index over the regional drug reference dataset.
//!
//! Built once at startup and read-only afterwards. Lookups are pure: no I/O,
//! no interior mutability, so one index can be shared across threads behind an `Arc`.

use std::fs;
use std::path::Path;

use strsim::{jaro_winkler, normalized_levenshtein, osa_distance};
use thiserror::Error;

use super::query::clean_query;
use crate::models::{LocalEntry, LocalMatch};

/// Default minimum similarity for a local match.
///
/// Single-letter typos and OCR noise score above 0.9 ("paracetemol" ~0.94).
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.85;

/// Key length covered by each allowed edit beyond the first.
const CHARS_PER_EXTRA_EDIT: usize = 12;

/// Index build errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset contains no entries")]
    EmptyDataset,

    #[error("Dataset entry {0} has a blank name")]
    InvalidEntry(usize),

    #[error("Match threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Dataset entry with its precomputed match keys.
#[derive(Debug)]
struct IndexedEntry {
    entry: LocalEntry,
    keys: Vec<String>,
}

/// In-memory fuzzy index over local drug entries.
#[derive(Debug)]
pub struct LocalTerminologyIndex {
    entries: Vec<IndexedEntry>,
    threshold: f64,
}

impl LocalTerminologyIndex {
    /// Build an index from dataset entries, preserving their order for tie-breaks.
    pub fn from_entries(entries: Vec<LocalEntry>, threshold: f64) -> IndexResult<Self> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(IndexError::InvalidThreshold(threshold));
        }
        if entries.is_empty() {
            return Err(IndexError::EmptyDataset);
        }

        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(position, entry)| {
                if entry.name.trim().is_empty() {
                    return Err(IndexError::InvalidEntry(position));
                }
                let keys = entry.match_keys().collect();
                Ok(IndexedEntry { entry, keys })
            })
            .collect::<IndexResult<Vec<_>>>()?;

        Ok(Self { entries, threshold })
    }

    /// Build an index from a JSON array of entries.
    pub fn from_json(json: &str, threshold: f64) -> IndexResult<Self> {
        let entries: Vec<LocalEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries, threshold)
    }

    /// Load the dataset file at `path` and build an index from it.
    pub fn load<P: AsRef<Path>>(path: P, threshold: f64) -> IndexResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let index = Self::from_json(&json, threshold)?;
        tracing::info!(
            path = %path.display(),
            entries = index.len(),
            threshold,
            "Local terminology index loaded"
        );
        Ok(index)
    }

    /// Find the single best entry scoring at or above the threshold.
    ///
    /// Ties keep the entry that appears first in the dataset.
    pub fn fuzzy_match(&self, name: &str) -> Option<LocalMatch> {
        let cleaned = clean_query(name);
        let full = name.trim().to_lowercase();
        if full.is_empty() {
            return None;
        }

        let mut best: Option<(&IndexedEntry, f64)> = None;
        for indexed in &self.entries {
            let score = indexed
                .keys
                .iter()
                .map(|key| score_key(key, &cleaned).max(score_key(key, &full)))
                .fold(0.0_f64, f64::max);

            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((indexed, score));
            }
        }

        let (indexed, score) = best?;
        if score < self.threshold {
            return None;
        }

        Some(LocalMatch {
            name: indexed.entry.name.clone(),
            dosage_forms: indexed.entry.dosage_forms.clone(),
            score,
        })
    }

    /// Number of dataset entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Score one lowercased key against one lowercased query (0.0 - 1.0).
///
/// Pairs further apart than [`max_edits`] score 0.0 whatever their similarity:
/// look-alike drugs ("hydroxyzine" / "hydralazine") differ by several edits.
fn score_key(key: &str, query: &str) -> f64 {
    if key == query {
        return 1.0;
    }
    if osa_distance(query, key) > max_edits(key, query) {
        return 0.0;
    }
    similarity(query, key)
}

/// Edits (transpositions count as one) tolerated between a query and a key.
fn max_edits(key: &str, query: &str) -> usize {
    let shorter = key.chars().count().min(query.chars().count());
    1 + shorter / CHARS_PER_EXTRA_EDIT
}

/// Compute fuzzy string similarity using combined metrics.
fn similarity(a: &str, b: &str) -> f64 {
    // Jaro-Winkler rewards shared prefixes, Levenshtein penalises length mismatch
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);

    jw * 0.6 + lev * 0.4
}
