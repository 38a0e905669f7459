//! Medicine records flowing through the normalization pipeline.

use serde::{Deserialize, Serialize};

/// Medicine entry as produced by the prescription extraction model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawMedicineEntry {
    /// Medicine name as read from the prescription
    pub name: String,
    /// Dosage amount (e.g., "500 mg")
    #[serde(default)]
    pub dosage: String,
    /// How often to take it (e.g., "twice daily")
    #[serde(default)]
    pub frequency: String,
    /// Additional instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Extraction confidence (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,
}

impl RawMedicineEntry {
    /// Create an entry carrying only a name.
    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dosage: String::new(),
            frequency: String::new(),
            notes: None,
            confidence: 0.0,
        }
    }
}

impl From<&str> for RawMedicineEntry {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<String> for RawMedicineEntry {
    fn from(name: String) -> Self {
        Self::from_name(name)
    }
}

/// Active ingredient associated with a medicine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenericIngredient {
    pub name: String,
    /// Canonical identifier, only when sourced from the remote service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl GenericIngredient {
    /// Ingredient without a canonical identifier.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

/// Which terminology tier produced a normalization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchSource {
    /// Authoritative remote terminology service
    Remote,
    /// Regional local dataset
    Local,
    /// No tier matched
    None,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Remote => "REMOTE",
            MatchSource::Local => "LOCAL",
            MatchSource::None => "NONE",
        }
    }
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the normalization pipeline for one raw name.
///
/// `normalized` is present exactly when some tier matched; `canonical_id` only
/// when that tier was the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMedicine {
    /// Original input name, unmodified
    pub raw: String,
    pub normalized: Option<String>,
    pub canonical_id: Option<String>,
    pub generics: Vec<GenericIngredient>,
    pub source: MatchSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_forms: Option<Vec<String>>,
}

impl NormalizedMedicine {
    /// Result for a name neither tier could resolve.
    pub fn unresolved(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            normalized: None,
            canonical_id: None,
            generics: Vec::new(),
            source: MatchSource::None,
            dosage_forms: None,
        }
    }

    /// Whether some terminology tier matched.
    pub fn is_resolved(&self) -> bool {
        self.source != MatchSource::None
    }
}

/// An extracted entry paired with its normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedicine {
    #[serde(flatten)]
    pub entry: RawMedicineEntry,
    pub normalization: NormalizedMedicine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_shape() {
        let med = NormalizedMedicine::unresolved("Xyz");
        assert_eq!(med.raw, "Xyz");
        assert!(med.normalized.is_none());
        assert!(med.canonical_id.is_none());
        assert!(med.generics.is_empty());
        assert_eq!(med.source, MatchSource::None);
        assert!(med.dosage_forms.is_none());
        assert!(!med.is_resolved());
    }

    #[test]
    fn test_source_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&MatchSource::Remote).unwrap(), "\"REMOTE\"");
        assert_eq!(serde_json::to_string(&MatchSource::Local).unwrap(), "\"LOCAL\"");
        assert_eq!(serde_json::to_string(&MatchSource::None).unwrap(), "\"NONE\"");
        assert_eq!(MatchSource::Local.to_string(), "LOCAL");
    }

    #[test]
    fn test_normalized_json_layout() {
        let med = NormalizedMedicine {
            raw: "Amoxicillin".into(),
            normalized: Some("amoxicillin".into()),
            canonical_id: Some("723".into()),
            generics: vec![GenericIngredient {
                name: "amoxicillin".into(),
                id: Some("723".into()),
            }],
            source: MatchSource::Remote,
            dosage_forms: None,
        };

        let value = serde_json::to_value(&med).unwrap();
        assert_eq!(value["canonicalId"], "723");
        assert_eq!(value["source"], "REMOTE");
        assert_eq!(value["generics"][0]["id"], "723");
        assert!(value.get("dosageForms").is_none());

        let unresolved = serde_json::to_value(NormalizedMedicine::unresolved("x")).unwrap();
        assert!(unresolved["normalized"].is_null());
        assert_eq!(unresolved["generics"], serde_json::json!([]));
    }

    #[test]
    fn test_raw_entry_defaults() {
        let entry: RawMedicineEntry = serde_json::from_str(r#"{"name":"Dolo 650"}"#).unwrap();
        assert_eq!(entry.name, "Dolo 650");
        assert_eq!(entry.dosage, "");
        assert!(entry.notes.is_none());
        assert_eq!(entry, RawMedicineEntry::from("Dolo 650"));
    }

    #[test]
    fn test_resolved_flattens_entry() {
        let resolved = ResolvedMedicine {
            entry: RawMedicineEntry {
                name: "Crocin".into(),
                dosage: "500 mg".into(),
                frequency: "twice daily".into(),
                notes: None,
                confidence: 0.9,
            },
            normalization: NormalizedMedicine::unresolved("Crocin"),
        };

        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(value["name"], "Crocin");
        assert_eq!(value["dosage"], "500 mg");
        assert_eq!(value["normalization"]["source"], "NONE");
    }
}
