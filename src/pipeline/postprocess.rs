//! Post-processing: turn the raw model reply into an [`AnalysisResult`].
//!
//! Even when told to return bare JSON, models sometimes wrap the object in
//! ```` ```json ```` fences, prepend a BOM, or add a sentence of commentary.
//! These wrappers are stripped deterministically before parsing. The JSON
//! itself is never repaired: a reply that does not match the declared shape
//! is a parse failure.

use crate::error::AnalysisError;
use crate::output::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Parse a raw reply into an [`AnalysisResult`].
///
/// A blank reply is [`AnalysisError::EmptyResponse`]; anything that fails to
/// deserialise (missing mandatory field, out-of-range score, unknown level)
/// is [`AnalysisError::Parse`].
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    if raw.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    let json = extract_json(raw);
    serde_json::from_str(&json).map_err(|e| AnalysisError::Parse {
        detail: e.to_string(),
    })
}

/// Strip the wrappers around the JSON object in a reply.
///
/// Rules (applied in order):
/// 1. Remove a leading BOM and zero-width characters
/// 2. Strip outer code fences (` ```json ` or bare ` ``` `)
/// 3. Slice from the first `{` to the last `}` to drop surrounding prose
pub fn extract_json(raw: &str) -> String {
    let s = remove_invisible_prefix(raw);
    let s = strip_code_fences(s);
    slice_object(&s).to_string()
}

// ── Rule 1: Invisible prefix ─────────────────────────────────────────────────

fn remove_invisible_prefix(input: &str) -> &str {
    input.trim_start_matches(['\u{FEFF}', '\u{200B}', '\u{200C}', '\u{200D}'])
}

// ── Rule 2: Code fences ──────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.trim().to_string(),
    }
}

// ── Rule 3: Surrounding prose ────────────────────────────────────────────────

fn slice_object(input: &str) -> &str {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => &input[start..=end],
        _ => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RiskLevel;

    const REPLY: &str = r#"{
  "extraction": {
    "bankName": "First Example Bank",
    "payeeName": "Jane Doe",
    "date": "2024-03-01",
    "amountNumeric": "1,250.00",
    "isSigned": true
  },
  "fraudAnalysis": {
    "riskScore": 12,
    "riskLevel": "SAFE",
    "reasoning": "No anomalies.",
    "alerts": []
  }
}"#;

    #[test]
    fn parses_bare_json() {
        let result = parse_analysis(REPLY).unwrap();
        assert_eq!(result.fraud_analysis.risk_score, 12);
        assert_eq!(result.fraud_analysis.risk_level, RiskLevel::Safe);
        assert_eq!(result.extraction.amount_numeric, "1,250.00");
    }

    #[test]
    fn strips_json_fences() {
        let fenced = format!("```json\n{}\n```", REPLY);
        assert_eq!(parse_analysis(&fenced).unwrap(), parse_analysis(REPLY).unwrap());

        let bare = format!("```\n{}\n```\n", REPLY);
        assert!(parse_analysis(&bare).is_ok());
    }

    #[test]
    fn strips_bom_and_prose() {
        let noisy = format!("\u{FEFF}Here is the analysis:\n{}\nLet me know!", REPLY);
        assert!(parse_analysis(&noisy).is_ok());
    }

    #[test]
    fn blank_reply_is_empty_response() {
        assert_eq!(parse_analysis(""), Err(AnalysisError::EmptyResponse));
        assert_eq!(parse_analysis("  \n\t"), Err(AnalysisError::EmptyResponse));
    }

    #[test]
    fn malformed_reply_is_parse_error() {
        assert!(matches!(
            parse_analysis("I cannot analyze this image."),
            Err(AnalysisError::Parse { .. })
        ));
        let missing_score = REPLY.replace("\"riskScore\": 12,", "");
        assert!(matches!(
            parse_analysis(&missing_score),
            Err(AnalysisError::Parse { .. })
        ));
    }

    #[test]
    fn extract_json_leaves_clean_input_alone() {
        assert_eq!(extract_json("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_json("no braces"), "no braces");
    }
}
