//! Property tests for the normalization waterfall.

use std::sync::Arc;

use proptest::prelude::*;

use medscan_core::terminology::{clean_query, MockTerminologyClient, DEFAULT_MATCH_THRESHOLD};
use medscan_core::{
    LocalEntry, LocalTerminologyIndex, MatchSource, MedicineNormalizer, RawMedicineEntry,
};

fn index() -> Arc<LocalTerminologyIndex> {
    let entries = vec![
        LocalEntry::new("Paracetamol")
            .with_dosage_forms(&["Tablet 500 mg"])
            .with_aliases(&["Crocin", "Dolo"]),
        LocalEntry::new("Amoxicillin"),
        LocalEntry::new("Pantoprazole"),
        LocalEntry::new("Metformin"),
    ];
    Arc::new(LocalTerminologyIndex::from_entries(entries, DEFAULT_MATCH_THRESHOLD).unwrap())
}

fn normalizer() -> MedicineNormalizer {
    let client = MockTerminologyClient::unavailable().with_candidate("Amoxicillin", "723", "amoxicillin");
    MedicineNormalizer::with_fallback(Arc::new(client), index(), 3).unwrap()
}

fn medicine_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z]{1,14}( [0-9]{2,4}(mg)?)?",
        Just("Amoxicillin".to_string()),
        Just("Paracetemol 500".to_string()),
        Just("Dolo 650".to_string()),
        ".{0,24}",
    ]
}

proptest! {
    #[test]
    fn every_name_yields_one_record_with_raw_preserved(name in medicine_name()) {
        let result = normalizer().normalize_name(&name);
        prop_assert_eq!(&result.raw, &name);

        match result.source {
            MatchSource::None => {
                prop_assert!(result.normalized.is_none());
                prop_assert!(result.canonical_id.is_none());
                prop_assert!(result.generics.is_empty());
            }
            MatchSource::Local => {
                prop_assert!(result.normalized.is_some());
                prop_assert!(result.canonical_id.is_none());
                prop_assert_eq!(result.generics.len(), 1);
            }
            MatchSource::Remote => {
                prop_assert!(result.canonical_id.is_some());
                prop_assert!(result.dosage_forms.is_none());
            }
        }
    }

    #[test]
    fn normalization_is_deterministic(name in medicine_name()) {
        let normalizer = normalizer();
        prop_assert_eq!(normalizer.normalize_name(&name), normalizer.normalize_name(&name));
    }

    #[test]
    fn batch_matches_single_calls(names in prop::collection::vec(medicine_name(), 0..12)) {
        let normalizer = normalizer();
        let entries: Vec<RawMedicineEntry> = names.iter().map(|n| RawMedicineEntry::from(n.as_str())).collect();

        let batch = normalizer.normalize_batch(&entries);
        prop_assert_eq!(batch.len(), names.len());
        for (name, result) in names.iter().zip(&batch) {
            prop_assert_eq!(result, &normalizer.normalize_name(name));
        }
    }

    #[test]
    fn local_matches_respect_threshold(name in medicine_name()) {
        if let Some(hit) = index().fuzzy_match(&name) {
            prop_assert!(hit.score >= DEFAULT_MATCH_THRESHOLD);
            prop_assert!(hit.score <= 1.0);
        }
    }

    #[test]
    fn clean_query_is_idempotent(name in medicine_name()) {
        let once = clean_query(&name);
        prop_assert_eq!(clean_query(&once), once.clone());
        prop_assert_eq!(once.to_lowercase(), once);
    }
}
