//! Prompts for prescription image extraction.
//!
//! The model receives the prescription image alongside these instructions and must
//! answer with a `{"medicines": [...]}` object that [`crate::parse_extraction_output`] accepts.

/// System prompt for prescription reading.
pub const SYSTEM_PROMPT: &str = r#"You are a medical prescription interpreter. You read handwritten or printed doctor prescriptions and extract structured information. The input may contain messy handwriting, abbreviations or medical shorthand.

Follow these rules strictly:

1. For each medicine, extract:
   - name: the medicine name as written, corrected only for obvious misreadings
   - dosage: strength or amount (e.g. "500 mg")
   - frequency: how often it is taken (e.g. "twice daily")
   - notes: optional duration, timing or unclear instructions
   - confidence: a number from 0 to 1 for how sure you are of the name

2. Expand common prescription abbreviations:
   - BD = twice daily
   - OD = once daily
   - TDS = three times daily
   - QID = four times daily
   - HS = at bedtime
   - SOS = when required
   - Cap = capsule
   - Tab = tablet

3. If handwriting is ambiguous, make the best possible guess and lower the confidence.

4. Do not invent medicines that are not on the prescription. If a name cannot be read, use "unreadable" with a confidence of 0.

Output only a JSON object with a "medicines" array."#;

/// User instruction sent with the prescription image.
pub const EXTRACTION_INSTRUCTION: &str = r#"Extract all medicines from this prescription image.

Return a JSON object with a "medicines" array. Each medicine should have:
- name: The medicine name
- dosage: Dosage (empty string if not written)
- frequency: Frequency (empty string if not written)
- notes: Extra instructions (null if none)
- confidence: Number between 0 and 1"#;

/// Example prescription lines and the expected model answer.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Tab. Dolo 650  1-0-1 x 5 days\nCap Amoxycillin 500mg TDS",
        r#"{"medicines":[{"name":"Dolo 650","dosage":"650 mg","frequency":"twice daily","notes":"5 days","confidence":0.92},{"name":"Amoxycillin","dosage":"500 mg","frequency":"three times daily","notes":null,"confidence":0.85}]}"#,
    ),
    (
        "Pan 40 OD before breakfast\nCetrizine 10mg HS",
        r#"{"medicines":[{"name":"Pan 40","dosage":"40 mg","frequency":"once daily","notes":"before breakfast","confidence":0.8},{"name":"Cetrizine","dosage":"10 mg","frequency":"at bedtime","notes":null,"confidence":0.9}]}"#,
    ),
];

/// Build the text part of a chat prompt, optionally with worked examples.
pub fn build_full_prompt(include_examples: bool) -> String {
    let mut prompt = String::new();

    prompt.push_str("<|system|>\n");
    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n<|end|>\n");

    if include_examples {
        for (transcription, output) in FEW_SHOT_EXAMPLES {
            prompt.push_str("<|user|>\n");
            prompt.push_str("Prescription text:\n");
            prompt.push_str(transcription);
            prompt.push_str("\n<|end|>\n");
            prompt.push_str("<|assistant|>\n");
            prompt.push_str(output);
            prompt.push_str("\n<|end|>\n");
        }
    }

    prompt.push_str("<|user|>\n");
    prompt.push_str(EXTRACTION_INSTRUCTION);
    prompt.push_str("\n<|end|>\n");
    prompt.push_str("<|assistant|>\n");

    prompt
}
