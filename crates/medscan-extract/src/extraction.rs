//! Medicine extraction from model output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Structured output of the extraction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub medicines: Vec<ExtractedMedicine>,
}

/// One medicine as read from a prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMedicine {
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Generic names the model proposed itself; the normalizer does not trust these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generics: Option<Vec<String>>,
    #[serde(default)]
    pub confidence: f64,
}

impl ExtractedMedicine {
    /// Frequency with prescription shorthand spelled out.
    pub fn readable_frequency(&self) -> String {
        expand_frequency_abbreviation(&self.frequency)
    }
}

/// Parse model output into structured medicines.
///
/// The model sometimes wraps the JSON object in prose, so the outermost braces are
/// located first. Entries without a name are dropped and confidence is clamped to [0, 1].
pub fn parse_extraction_output(text: &str) -> ExtractionResult<ExtractionOutput> {
    // Try to find JSON in the response (in case the model adds extra text)
    let json_start = text.find('{').ok_or_else(|| {
        ExtractionError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = text.rfind('}').ok_or_else(|| {
        ExtractionError::InvalidFormat("No closing brace found in response".into())
    })?;
    if json_end < json_start {
        return Err(ExtractionError::InvalidFormat(
            "Closing brace precedes opening brace".into(),
        ));
    }

    let output: ExtractionOutput = serde_json::from_str(&text[json_start..=json_end])?;
    Ok(sanitize(output))
}

fn sanitize(output: ExtractionOutput) -> ExtractionOutput {
    let total = output.medicines.len();

    let medicines: Vec<ExtractedMedicine> = output
        .medicines
        .into_iter()
        .filter(|m| !m.name.trim().is_empty())
        .map(|mut m| {
            m.confidence = if m.confidence.is_nan() {
                0.0
            } else {
                m.confidence.clamp(0.0, 1.0)
            };
            m
        })
        .collect();

    let dropped = total - medicines.len();
    if dropped > 0 {
        tracing::warn!(dropped, total, "Dropped extracted medicines without a name");
    }

    ExtractionOutput { medicines }
}

/// Prescription frequency shorthand and its plain reading.
const FREQUENCY_ABBREVIATIONS: &[(&str, &str)] = &[
    ("od", "once daily"),
    ("bd", "twice daily"),
    ("bid", "twice daily"),
    ("tds", "three times daily"),
    ("tid", "three times daily"),
    ("qid", "four times daily"),
    ("hs", "at bedtime"),
    ("sos", "when required"),
    ("prn", "when required"),
];

/// Spell out frequency shorthand, word by word ("1 tab BD" → "1 tab twice daily").
///
/// Words that are not shorthand pass through unchanged.
pub fn expand_frequency_abbreviation(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let key = word.trim_end_matches('.').to_lowercase();
            FREQUENCY_ABBREVIATIONS
                .iter()
                .find(|(abbrev, _)| *abbrev == key)
                .map(|(_, expansion)| *expansion)
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
