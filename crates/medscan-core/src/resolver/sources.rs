//! Lookup strategies composed by the orchestrator.
//!
//! Each strategy either resolves a name or reports a miss; it never fails.

use std::sync::Arc;

use crate::models::{GenericIngredient, MatchSource, NormalizedMedicine};
use crate::terminology::{LocalTerminologyIndex, TerminologyClient};

/// A successful resolution from one terminology tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub normalized: String,
    pub canonical_id: Option<String>,
    pub generics: Vec<GenericIngredient>,
    pub source: MatchSource,
    pub dosage_forms: Option<Vec<String>>,
}

impl Resolution {
    /// Attach the raw input name to produce the pipeline output record.
    pub fn into_medicine(self, raw: &str) -> NormalizedMedicine {
        NormalizedMedicine {
            raw: raw.to_string(),
            normalized: Some(self.normalized),
            canonical_id: self.canonical_id,
            generics: self.generics,
            source: self.source,
            dosage_forms: self.dosage_forms,
        }
    }
}

/// Candidate-or-miss lookup contract shared by every tier.
pub trait TerminologySource: Send + Sync {
    /// Short label for logs.
    fn label(&self) -> &'static str;

    /// Resolve a raw name, or `None` on a miss.
    fn lookup(&self, name: &str) -> Option<Resolution>;
}

/// Remote tier: approximate match, then related generics.
pub struct RemoteLookup {
    client: Arc<dyn TerminologyClient + Send + Sync>,
}

impl RemoteLookup {
    pub fn new(client: Arc<dyn TerminologyClient + Send + Sync>) -> Self {
        Self { client }
    }
}

impl TerminologySource for RemoteLookup {
    fn label(&self) -> &'static str {
        "remote"
    }

    fn lookup(&self, name: &str) -> Option<Resolution> {
        let candidate = self.client.approximate_match(name);
        let id = candidate.id?;
        let generics = self.client.related_generics(&id);

        Some(Resolution {
            // RxNav occasionally omits the name; the raw text is the best label left
            normalized: candidate
                .standardized_name
                .unwrap_or_else(|| name.to_string()),
            canonical_id: Some(id),
            generics,
            source: MatchSource::Remote,
            dosage_forms: None,
        })
    }
}

/// Local tier: fuzzy match against the regional dataset.
pub struct LocalLookup {
    index: Arc<LocalTerminologyIndex>,
}

impl LocalLookup {
    pub fn new(index: Arc<LocalTerminologyIndex>) -> Self {
        Self { index }
    }
}

impl TerminologySource for LocalLookup {
    fn label(&self) -> &'static str {
        "local"
    }

    fn lookup(&self, name: &str) -> Option<Resolution> {
        let hit = self.index.fuzzy_match(name)?;
        tracing::debug!(name, matched = %hit.name, score = hit.score, "Local match");

        Some(Resolution {
            // The dataset carries no ingredient identifiers; the matched name stands in
            generics: vec![GenericIngredient::named(hit.name.clone())],
            normalized: hit.name,
            canonical_id: None,
            source: MatchSource::Local,
            dosage_forms: hit.dosage_forms,
        })
    }
}
