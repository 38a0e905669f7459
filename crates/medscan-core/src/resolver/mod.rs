//! Normalization orchestrator for extracted medicine names.
//!
//! Pipeline: Remote terminology (approximate match → related generics) → Local index → Unresolved
//!
//! The tiers form a strict waterfall: the first strategy that resolves a name wins
//! and later strategies are never consulted. Partial results are not merged.

mod sources;

pub use sources::*;

use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

use crate::config::NormalizerConfig;
use crate::models::{NormalizedMedicine, RawMedicineEntry, ResolvedMedicine};
use crate::terminology::{LocalTerminologyIndex, RemoteError, RxNavClient, TerminologyClient};

/// Orchestrator construction errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Remote client error: {0}")]
    Remote(#[from] RemoteError),

    #[error("At least one terminology source is required")]
    NoSources,
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Main normalizer that walks the terminology tiers in order.
pub struct MedicineNormalizer {
    sources: Vec<Box<dyn TerminologySource>>,
    pool: rayon::ThreadPool,
}

impl MedicineNormalizer {
    /// Create a normalizer over an ordered strategy list.
    pub fn new(sources: Vec<Box<dyn TerminologySource>>, max_concurrency: usize) -> ResolverResult<Self> {
        if sources.is_empty() {
            return Err(ResolverError::NoSources);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrency.max(1))
            .thread_name(|i| format!("medscan-worker-{i}"))
            .build()?;

        Ok(Self { sources, pool })
    }

    /// Remote tier first, local index as the fallback.
    pub fn with_fallback(
        client: Arc<dyn TerminologyClient + Send + Sync>,
        index: Arc<LocalTerminologyIndex>,
        max_concurrency: usize,
    ) -> ResolverResult<Self> {
        Self::new(
            vec![
                Box::new(RemoteLookup::new(client)),
                Box::new(LocalLookup::new(index)),
            ],
            max_concurrency,
        )
    }

    /// Local index only, for offline use.
    pub fn local_only(index: Arc<LocalTerminologyIndex>, max_concurrency: usize) -> ResolverResult<Self> {
        Self::new(vec![Box::new(LocalLookup::new(index))], max_concurrency)
    }

    /// Full pipeline against RxNav as described by `config`.
    pub fn from_config(config: &NormalizerConfig, index: Arc<LocalTerminologyIndex>) -> ResolverResult<Self> {
        let client = RxNavClient::from_config(config)?;
        Self::with_fallback(Arc::new(client), index, config.max_concurrency)
    }

    /// Normalize one extracted entry.
    pub fn normalize(&self, entry: &RawMedicineEntry) -> NormalizedMedicine {
        self.normalize_name(&entry.name)
    }

    /// Normalize one raw medicine name. Always produces a record.
    pub fn normalize_name(&self, raw: &str) -> NormalizedMedicine {
        let name = raw.trim();
        if name.is_empty() {
            return NormalizedMedicine::unresolved(raw);
        }

        // Every tier sees the trimmed name; `raw` keeps the caller's text
        for source in &self.sources {
            if let Some(resolution) = source.lookup(name) {
                tracing::debug!(raw, tier = source.label(), normalized = %resolution.normalized, "Resolved medicine");
                return resolution.into_medicine(raw);
            }
            tracing::debug!(raw, tier = source.label(), "Tier missed");
        }

        NormalizedMedicine::unresolved(raw)
    }

    /// Normalize entries in parallel; output order matches input order.
    pub fn normalize_batch(&self, entries: &[RawMedicineEntry]) -> Vec<NormalizedMedicine> {
        let results: Vec<NormalizedMedicine> =
            self.pool.install(|| entries.par_iter().map(|e| self.normalize(e)).collect());

        let unresolved = results.iter().filter(|m| !m.is_resolved()).count();
        tracing::info!(total = results.len(), unresolved, "Normalized medicine batch");
        results
    }

    /// Normalize entries and pair each with its result.
    pub fn resolve_batch(&self, entries: Vec<RawMedicineEntry>) -> Vec<ResolvedMedicine> {
        let normalized = self.normalize_batch(&entries);
        entries
            .into_iter()
            .zip(normalized)
            .map(|(entry, normalization)| ResolvedMedicine {
                entry,
                normalization,
            })
            .collect()
    }

    /// Tier labels in consultation order.
    pub fn tiers(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.label()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenericIngredient, LocalEntry, MatchSource};
    use crate::terminology::{MockTerminologyClient, DEFAULT_MATCH_THRESHOLD};

    fn setup_index() -> Arc<LocalTerminologyIndex> {
        let entries = vec![
            LocalEntry::new("Paracetamol").with_dosage_forms(&["Tablet 500 mg", "Oral liquid 125 mg/5 mL"]),
            LocalEntry::new("Amoxicillin").with_dosage_forms(&["Capsule 250 mg"]),
            LocalEntry::new("Metformin"),
        ];
        Arc::new(LocalTerminologyIndex::from_entries(entries, DEFAULT_MATCH_THRESHOLD).unwrap())
    }

    fn setup_client() -> Arc<MockTerminologyClient> {
        Arc::new(
            MockTerminologyClient::unavailable()
                .with_candidate("Amoxicillin", "723", "amoxicillin")
                .with_generics("723", vec![GenericIngredient {
                    name: "amoxicillin".into(),
                    id: Some("723".into()),
                }]),
        )
    }

    #[test]
    fn test_remote_short_circuits_local() {
        let normalizer = MedicineNormalizer::with_fallback(setup_client(), setup_index(), 2).unwrap();
        let result = normalizer.normalize_name("Amoxicillin");

        assert_eq!(result.source, MatchSource::Remote);
        assert_eq!(result.canonical_id.as_deref(), Some("723"));
        assert_eq!(result.normalized.as_deref(), Some("amoxicillin"));
        // Local entry carries dosage forms; a remote hit must not pick them up
        assert!(result.dosage_forms.is_none());
    }

    #[test]
    fn test_local_fallback() {
        let normalizer = MedicineNormalizer::with_fallback(setup_client(), setup_index(), 2).unwrap();
        let result = normalizer.normalize_name("Paracetemol 500");

        assert_eq!(result.source, MatchSource::Local);
        assert_eq!(result.normalized.as_deref(), Some("Paracetamol"));
        assert!(result.canonical_id.is_none());
        assert_eq!(result.generics, vec![GenericIngredient::named("Paracetamol")]);
        assert_eq!(result.dosage_forms.as_ref().map(|f| f.len()), Some(2));
    }

    #[test]
    fn test_both_tiers_miss() {
        let normalizer = MedicineNormalizer::with_fallback(setup_client(), setup_index(), 2).unwrap();
        let result = normalizer.normalize_name("Xyzdrugnonexistent");
        assert_eq!(result, NormalizedMedicine::unresolved("Xyzdrugnonexistent"));
    }

    #[test]
    fn test_blank_name_skips_lookups() {
        let client = setup_client();
        let normalizer = MedicineNormalizer::with_fallback(client.clone(), setup_index(), 1).unwrap();

        let result = normalizer.normalize_name("   ");
        assert_eq!(result.raw, "   ");
        assert_eq!(result.source, MatchSource::None);
        assert_eq!(client.approximate_calls(), 0);
    }

    #[test]
    fn test_raw_is_preserved() {
        let normalizer = MedicineNormalizer::local_only(setup_index(), 1).unwrap();
        let result = normalizer.normalize_name("  Metformin  ");
        assert_eq!(result.raw, "  Metformin  ");
        assert_eq!(result.normalized.as_deref(), Some("Metformin"));
    }

    #[test]
    fn test_batch_preserves_order() {
        let normalizer = MedicineNormalizer::with_fallback(setup_client(), setup_index(), 4).unwrap();
        let names = ["Xyzdrugnonexistent", "Amoxicillin", "Paracetemol 500", "Metformin", "Unknownium"];
        let entries: Vec<RawMedicineEntry> = names.iter().map(|n| RawMedicineEntry::from(*n)).collect();

        let results = normalizer.normalize_batch(&entries);
        let raws: Vec<&str> = results.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(raws, names);

        let sources: Vec<MatchSource> = results.iter().map(|r| r.source).collect();
        assert_eq!(
            sources,
            vec![
                MatchSource::None,
                MatchSource::Remote,
                MatchSource::Local,
                MatchSource::Local,
                MatchSource::None,
            ]
        );
    }

    #[test]
    fn test_resolve_batch_pairs_entries() {
        let normalizer = MedicineNormalizer::local_only(setup_index(), 2).unwrap();
        let entry = RawMedicineEntry {
            name: "Paracetemol 500".into(),
            dosage: "500 mg".into(),
            frequency: "three times daily".into(),
            notes: Some("after food".into()),
            confidence: 0.82,
        };

        let resolved = normalizer.resolve_batch(vec![entry.clone()]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entry, entry);
        assert_eq!(resolved[0].normalization.source, MatchSource::Local);
    }

    #[test]
    fn test_requires_sources() {
        assert!(matches!(
            MedicineNormalizer::new(Vec::new(), 1),
            Err(ResolverError::NoSources)
        ));
    }

    #[test]
    fn test_tiers_order() {
        let normalizer = MedicineNormalizer::with_fallback(setup_client(), setup_index(), 1).unwrap();
        assert_eq!(normalizer.tiers(), vec!["remote", "local"]);
    }
}
