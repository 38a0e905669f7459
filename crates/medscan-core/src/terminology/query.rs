//! Query cleaning for local fuzzy lookups.
//!
//! Extracted names often carry strength and form noise ("Tab. Paracetemol 500mg").
//! The local dataset only holds drug names, so that noise is stripped before scoring.

/// Dosage-form and unit words that never identify a drug on their own.
const FORM_WORDS: &[&str] = &[
    // Forms
    "tab", "tabs", "tablet", "tablets", "cap", "caps", "capsule", "capsules", "syp", "syrup",
    "susp", "suspension", "inj", "injection", "oint", "ointment", "cream", "gel", "drop",
    "drops", "sachet", "lotion", "inhaler", "oral", "solution",
    // Units
    "mg", "mcg", "µg", "g", "gm", "ml", "iu", "units",
    // Release modifiers
    "sr", "er", "xr", "cr", "dr",
];

/// Characters trimmed from token edges.
const EDGE_PUNCTUATION: &[char] = &['.', ',', ';', ':', '(', ')', '[', ']', '*', '"', '\''];

/// Reduce a raw medicine name to the words that can identify the drug.
///
/// Lowercases, trims punctuation, and drops tokens containing digits or naming a
/// dosage form/unit. Falls back to the lowercased input if nothing survives.
pub fn clean_query(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();

    let kept: Vec<&str> = lower
        .split_whitespace()
        .map(|token| token.trim_matches(EDGE_PUNCTUATION))
        .filter(|token| !token.is_empty())
        .filter(|token| !token.chars().any(|c| c.is_ascii_digit()))
        .filter(|token| !FORM_WORDS.contains(token))
        .collect();

    if kept.is_empty() {
        lower
    } else {
        kept.join(" ")
    }
}
