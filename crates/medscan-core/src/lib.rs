//! Medscan Core Library
//!
//! Resolves medicine names read from prescription images to standardized clinical
//! identities, with a regional fallback when the authoritative service cannot help.
//!
//! # Architecture
//!
//! ```text
//! Prescription image → Extraction model → RawMedicineEntry
//!                                               │
//!                                     ┌─────────▼─────────┐
//!                                     │ MedicineNormalizer │
//!                                     └─────────┬─────────┘
//!                                               │
//!                     ┌─────────────────────────┼─────────────────────────┐
//!                     │ 1. RemoteLookup                                   │
//!                     │    RxNav approximateTerm → related generics (IN)  │
//!                     │                  miss / failure                   │
//!                     │                        ▼                          │
//!                     │ 2. LocalLookup                                    │
//!                     │    fuzzy match over the regional dataset          │
//!                     │                        miss                       │
//!                     │                        ▼                          │
//!                     │ 3. Unresolved (source = NONE)                     │
//!                     └─────────────────────────┬─────────────────────────┘
//!                                               ▼
//!                                      NormalizedMedicine
//! ```
//!
//! # Core Principle
//!
//! **Every input name yields exactly one record.** Remote failures degrade to misses;
//! only a missing or corrupt local dataset stops the pipeline, and only at startup.
//!
//! # Modules
//!
//! - [`models`]: Domain types (RawMedicineEntry, NormalizedMedicine, LocalEntry, etc.)
//! - [`terminology`]: RxNav client and local fuzzy index
//! - [`resolver`]: Tier strategies and the normalization orchestrator
//! - [`config`]: Pipeline configuration

pub mod config;
pub mod models;
pub mod resolver;
pub mod terminology;

// Re-export commonly used types
pub use config::NormalizerConfig;
pub use models::{
    CanonicalCandidate, GenericIngredient, LocalEntry, LocalMatch, MatchSource, NormalizedMedicine,
    RawMedicineEntry, ResolvedMedicine,
};
pub use resolver::{LocalLookup, MedicineNormalizer, RemoteLookup, TerminologySource};
pub use terminology::{LocalTerminologyIndex, RxNavClient, TerminologyClient};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedscanError {
    #[error("Dataset error: {0}")]
    DatasetError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

impl From<terminology::IndexError> for MedscanError {
    fn from(e: terminology::IndexError) -> Self {
        MedscanError::DatasetError(e.to_string())
    }
}

impl From<config::ConfigError> for MedscanError {
    fn from(e: config::ConfigError) -> Self {
        MedscanError::ConfigError(e.to_string())
    }
}

impl From<resolver::ResolverError> for MedscanError {
    fn from(e: resolver::ResolverError) -> Self {
        MedscanError::InitError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Load the local dataset and build the full remote-then-local pipeline.
///
/// Unset config fields take their defaults.
#[uniffi::export]
pub fn open_normalizer(
    dataset_path: String,
    config: Option<FfiNormalizerConfig>,
) -> Result<Arc<MedscanCore>, MedscanError> {
    let config = config.unwrap_or_default().into_config();
    config.validate()?;

    let index = Arc::new(LocalTerminologyIndex::load(&dataset_path, config.match_threshold)?);
    let normalizer = MedicineNormalizer::from_config(&config, index.clone())?;
    Ok(Arc::new(MedscanCore { normalizer, index }))
}

/// Load the local dataset and build a pipeline that never calls the network.
#[uniffi::export]
pub fn open_offline_normalizer(
    dataset_path: String,
    match_threshold: f64,
) -> Result<Arc<MedscanCore>, MedscanError> {
    let index = Arc::new(LocalTerminologyIndex::load(&dataset_path, match_threshold)?);
    let normalizer = MedicineNormalizer::local_only(index.clone(), 1)?;
    Ok(Arc::new(MedscanCore { normalizer, index }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe normalization pipeline for FFI.
#[derive(uniffi::Object)]
pub struct MedscanCore {
    normalizer: MedicineNormalizer,
    index: Arc<LocalTerminologyIndex>,
}

#[uniffi::export]
impl MedscanCore {
    /// Normalize a single medicine name.
    pub fn normalize_name(&self, name: String) -> FfiNormalizedMedicine {
        self.normalizer.normalize_name(&name).into()
    }

    /// Normalize extracted entries, preserving their order.
    pub fn normalize_entries(&self, entries: Vec<FfiRawMedicine>) -> Vec<FfiNormalizedMedicine> {
        let entries: Vec<RawMedicineEntry> = entries.into_iter().map(|e| e.into()).collect();
        self.normalizer
            .normalize_batch(&entries)
            .into_iter()
            .map(|m| m.into())
            .collect()
    }

    /// Query the local index directly.
    pub fn lookup_local(&self, name: String) -> Option<FfiLocalMatch> {
        self.index.fuzzy_match(&name).map(|m| m.into())
    }

    /// Number of entries in the local dataset.
    pub fn dataset_size(&self) -> u32 {
        self.index.len() as u32
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe configuration. `None` fields keep their defaults.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiNormalizerConfig {
    pub rxnav_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub match_threshold: Option<f64>,
    pub max_concurrency: Option<u32>,
}

impl FfiNormalizerConfig {
    fn into_config(self) -> NormalizerConfig {
        let defaults = NormalizerConfig::default();
        NormalizerConfig {
            rxnav_base_url: self.rxnav_base_url.unwrap_or(defaults.rxnav_base_url),
            request_timeout_secs: self.request_timeout_secs.unwrap_or(defaults.request_timeout_secs),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            match_threshold: self.match_threshold.unwrap_or(defaults.match_threshold),
            max_concurrency: self
                .max_concurrency
                .map(|n| n as usize)
                .unwrap_or(defaults.max_concurrency),
            user_agent: defaults.user_agent,
        }
    }
}

/// FFI-safe extracted medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRawMedicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub notes: Option<String>,
    pub confidence: f64,
}

impl From<FfiRawMedicine> for RawMedicineEntry {
    fn from(entry: FfiRawMedicine) -> Self {
        RawMedicineEntry {
            name: entry.name,
            dosage: entry.dosage,
            frequency: entry.frequency,
            notes: entry.notes,
            confidence: entry.confidence,
        }
    }
}

/// FFI-safe generic ingredient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiGenericIngredient {
    pub name: String,
    pub id: Option<String>,
}

impl From<GenericIngredient> for FfiGenericIngredient {
    fn from(generic: GenericIngredient) -> Self {
        Self {
            name: generic.name,
            id: generic.id,
        }
    }
}

/// FFI-safe normalization result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNormalizedMedicine {
    pub raw: String,
    pub normalized: Option<String>,
    pub canonical_id: Option<String>,
    pub generics: Vec<FfiGenericIngredient>,
    /// "REMOTE", "LOCAL" or "NONE"
    pub source: String,
    pub dosage_forms: Option<Vec<String>>,
}

impl From<NormalizedMedicine> for FfiNormalizedMedicine {
    fn from(medicine: NormalizedMedicine) -> Self {
        Self {
            raw: medicine.raw,
            normalized: medicine.normalized,
            canonical_id: medicine.canonical_id,
            generics: medicine.generics.into_iter().map(|g| g.into()).collect(),
            source: medicine.source.as_str().to_string(),
            dosage_forms: medicine.dosage_forms,
        }
    }
}

/// FFI-safe local index hit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLocalMatch {
    pub name: String,
    pub dosage_forms: Option<Vec<String>>,
    pub score: f64,
}

impl From<LocalMatch> for FfiLocalMatch {
    fn from(hit: LocalMatch) -> Self {
        Self {
            name: hit.name,
            dosage_forms: hit.dosage_forms,
            score: hit.score,
        }
    }
}
