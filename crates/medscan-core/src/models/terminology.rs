//! Terminology models: remote candidates and local dataset entries.

use serde::{Deserialize, Serialize};

/// Result of an approximate-name lookup against the remote terminology service.
///
/// `id == None` means no confident remote match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalCandidate {
    pub id: Option<String>,
    pub standardized_name: Option<String>,
}

impl CanonicalCandidate {
    /// Candidate representing a remote miss.
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.id.is_some()
    }
}

/// One record of the regional drug reference dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalEntry {
    /// Canonical drug name
    pub name: String,
    /// Known dosage forms (e.g., "Tablet 500 mg", "Oral liquid 125 mg/5 mL")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_forms: Option<Vec<String>>,
    /// Alternative names/spellings for fuzzy matching
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl LocalEntry {
    /// Create an entry with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dosage_forms: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_dosage_forms(mut self, forms: &[&str]) -> Self {
        self.dosage_forms = Some(forms.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Lowercased match keys: the name followed by each alias.
    pub fn match_keys(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
    }
}

/// A local index hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalMatch {
    /// Canonical name of the matched entry
    pub name: String,
    pub dosage_forms: Option<Vec<String>>,
    /// Similarity score (0.0 - 1.0)
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_miss() {
        let miss = CanonicalCandidate::miss();
        assert!(!miss.is_match());
        assert!(miss.standardized_name.is_none());

        let hit = CanonicalCandidate {
            id: Some("723".into()),
            standardized_name: Some("amoxicillin".into()),
        };
        assert!(hit.is_match());
    }

    #[test]
    fn test_entry_deserializes_dataset_shape() {
        let json = r#"{"name":"Paracetamol","dosageForms":["Tablet 500 mg","Syrup 125 mg/5 mL"]}"#;
        let entry: LocalEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.name, "Paracetamol");
        assert_eq!(entry.dosage_forms.as_ref().map(|f| f.len()), Some(2));
        assert!(entry.aliases.is_empty());
    }

    #[test]
    fn test_match_keys() {
        let entry = LocalEntry::new("Paracetamol").with_aliases(&["Acetaminophen", "  "]);
        let keys: Vec<String> = entry.match_keys().collect();
        assert_eq!(keys, vec!["paracetamol".to_string(), "acetaminophen".to_string()]);
    }
}
