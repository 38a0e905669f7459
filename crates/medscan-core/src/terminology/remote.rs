//! Remote terminology client for the RxNav REST service.
//!
//! Every failure mode (connect, timeout, non-2xx, malformed payload) degrades to a
//! miss at the [`TerminologyClient`] boundary so callers can move to the next tier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::NormalizerConfig;
use crate::models::{CanonicalCandidate, GenericIngredient};

/// Public RxNav REST endpoint.
pub const DEFAULT_RXNAV_URL: &str = "https://rxnav.nlm.nih.gov/REST";

/// Remote lookup errors. Recovered as misses, never surfaced to pipeline callers.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Terminology service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid canonical identifier: {0:?}")]
    InvalidId(String),
}

impl RemoteError {
    /// Failures worth another attempt against the same service.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(e) => e.is_timeout() || e.is_connect(),
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Decode(_) | RemoteError::InvalidId(_) => false,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Canonical drug-naming service contract.
///
/// Both operations are total: a miss or failure yields an empty result.
pub trait TerminologyClient {
    /// Best approximate match for a free-text name (at most one candidate).
    fn approximate_match(&self, name: &str) -> CanonicalCandidate;

    /// Ingredient-level concepts related to a canonical identifier.
    fn related_generics(&self, canonical_id: &str) -> Vec<GenericIngredient>;
}

/// Response body from /approximateTerm.json
#[derive(Deserialize)]
struct ApproximateTermResponse {
    #[serde(rename = "approximateGroup", default)]
    approximate_group: Option<ApproximateGroup>,
}

#[derive(Deserialize)]
struct ApproximateGroup {
    #[serde(default)]
    candidate: Vec<ApproximateCandidate>,
}

#[derive(Deserialize)]
struct ApproximateCandidate {
    #[serde(default)]
    rxcui: Option<String>,
    #[serde(default, alias = "rxnormName")]
    name: Option<String>,
}

/// Response body from /rxcui/{id}/related.json
#[derive(Deserialize)]
struct RelatedResponse {
    #[serde(rename = "relatedGroup", default)]
    related_group: Option<RelatedGroup>,
}

#[derive(Deserialize)]
struct RelatedGroup {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Vec<ConceptGroup>,
}

#[derive(Deserialize)]
struct ConceptGroup {
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Vec<ConceptProperty>,
}

#[derive(Deserialize)]
struct ConceptProperty {
    name: String,
    #[serde(default)]
    rxcui: Option<String>,
}

/// Blocking HTTP client for RxNav.
pub struct RxNavClient {
    base_url: String,
    client: reqwest::blocking::Client,
    max_retries: u32,
}

impl RxNavClient {
    /// Create a client for the RxNav instance at `base_url`.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> RemoteResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            max_retries: 0,
        })
    }

    /// Create a client from pipeline configuration.
    pub fn from_config(config: &NormalizerConfig) -> RemoteResult<Self> {
        Ok(Self::new(
            &config.rxnav_base_url,
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )?
        .with_max_retries(config.max_retries))
    }

    /// Retry transient failures up to `max_retries` extra times.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Approximate-term lookup, surfacing failures.
    pub fn try_approximate_match(&self, name: &str) -> RemoteResult<CanonicalCandidate> {
        let url = format!("{}/approximateTerm.json", self.base_url);
        let parsed: ApproximateTermResponse =
            self.get_json(&url, &[("term", name), ("maxEntries", "1")])?;

        let candidate = parsed
            .approximate_group
            .and_then(|group| group.candidate.into_iter().next());

        Ok(match candidate {
            Some(c) => CanonicalCandidate {
                id: c.rxcui.filter(|id| !id.trim().is_empty()),
                standardized_name: c.name.filter(|n| !n.trim().is_empty()),
            },
            None => CanonicalCandidate::miss(),
        })
    }

    /// Related ingredient lookup, surfacing failures.
    pub fn try_related_generics(&self, canonical_id: &str) -> RemoteResult<Vec<GenericIngredient>> {
        if canonical_id.is_empty() || !canonical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RemoteError::InvalidId(canonical_id.to_string()));
        }

        let url = format!("{}/rxcui/{}/related.json", self.base_url, canonical_id);
        let parsed: RelatedResponse = self.get_json(&url, &[("tty", "IN")])?;

        Ok(parsed
            .related_group
            .map(|group| group.concept_group)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|group| group.concept_properties)
            .map(|p| GenericIngredient {
                name: p.name,
                id: p.rxcui,
            })
            .collect())
    }

    /// GET a JSON document, retrying transient failures.
    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> RemoteResult<T> {
        let mut attempt = 0;
        loop {
            match self.get_json_once(url, query) {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(url, attempt, error = %e, "Terminology request failed, retrying");
                }
                result => return result,
            }
        }
    }

    fn get_json_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> RemoteResult<T> {
        let response = self.client.get(url).query(query).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

impl TerminologyClient for RxNavClient {
    fn approximate_match(&self, name: &str) -> CanonicalCandidate {
        match self.try_approximate_match(name) {
            Ok(candidate) => {
                if !candidate.is_match() {
                    tracing::debug!(name, "No remote candidate");
                }
                candidate
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "Approximate match failed, treating as miss");
                CanonicalCandidate::miss()
            }
        }
    }

    fn related_generics(&self, canonical_id: &str) -> Vec<GenericIngredient> {
        self.try_related_generics(canonical_id).unwrap_or_else(|e| {
            tracing::warn!(canonical_id, error = %e, "Related generics lookup failed");
            Vec::new()
        })
    }
}

/// In-memory terminology client for tests and offline fixtures.
#[derive(Default)]
pub struct MockTerminologyClient {
    candidates: HashMap<String, CanonicalCandidate>,
    generics: HashMap<String, Vec<GenericIngredient>>,
    approximate_calls: AtomicUsize,
    related_calls: AtomicUsize,
}

impl MockTerminologyClient {
    /// Client that misses on every name, as an unreachable service would.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Register a candidate for a name (matched case-insensitively).
    pub fn with_candidate(mut self, name: &str, id: &str, standardized_name: &str) -> Self {
        self.candidates.insert(
            name.to_lowercase(),
            CanonicalCandidate {
                id: Some(id.to_string()),
                standardized_name: Some(standardized_name.to_string()),
            },
        );
        self
    }

    /// Register related ingredients for a canonical identifier.
    pub fn with_generics(mut self, id: &str, generics: Vec<GenericIngredient>) -> Self {
        self.generics.insert(id.to_string(), generics);
        self
    }

    pub fn approximate_calls(&self) -> usize {
        self.approximate_calls.load(Ordering::SeqCst)
    }

    pub fn related_calls(&self) -> usize {
        self.related_calls.load(Ordering::SeqCst)
    }
}

impl TerminologyClient for MockTerminologyClient {
    fn approximate_match(&self, name: &str) -> CanonicalCandidate {
        self.approximate_calls.fetch_add(1, Ordering::SeqCst);
        self.candidates
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn related_generics(&self, canonical_id: &str) -> Vec<GenericIngredient> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        self.generics.get(canonical_id).cloned().unwrap_or_default()
    }
}
