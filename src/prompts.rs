//! Prompts and the output-shape declaration sent with every analysis.
//!
//! Centralising the instruction and the schema here keeps them in one place
//! and lets unit tests inspect them without a live model.
//!
//! Callers can override the system prompt via
//! [`crate::config::AnalysisConfig::system_prompt`]; the schema is never
//! overridable because [`crate::output`] deserialises against it.

use serde_json::{json, Value};

/// Default system prompt: the two tasks and the fraud signals to evaluate.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert forensic document examiner and banking AI.
Analyze the provided image or PDF of a bank check.

Task 1: Extract structured data from the check. Accurately transcribe names,
dates, and amounts exactly as printed. Keep the numeric amount's formatting.

Task 2: Perform a fraud risk assessment. Look for:
  - Inconsistencies between the numeric amount and the written legal amount.
  - Signs of digital alteration (blurring, font mismatches, pasted text).
  - Missing or suspicious signatures.
  - Date anomalies (stale checks, future dates).
  - MICR line inconsistencies.
  - High-risk payee names or memo fields.

Score the risk from 0 to 100, where 100 is the highest fraud risk, and
choose the matching risk level: SAFE, CAUTION, SUSPICIOUS, or CRITICAL.

OUTPUT FORMAT
  - Return ONLY a single JSON object conforming to the schema you are given
  - Do NOT wrap it in ```json fences
  - Do NOT add commentary before or after the JSON"#;

/// Build the user-turn text that accompanies the document attachment.
pub fn user_instruction() -> String {
    format!(
        "Analyze the attached check. Respond with JSON matching this schema:\n\n{}",
        // The schema is a literal; serialisation cannot fail.
        serde_json::to_string_pretty(&response_schema()).unwrap_or_default()
    )
}

/// JSON Schema for [`crate::output::AnalysisResult`].
///
/// Mandatory fields here must stay in sync with the fields in
/// [`crate::output`] that have no `#[serde(default)]`.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "extraction": {
                "type": "object",
                "properties": {
                    "bankName": { "type": "string" },
                    "payerName": { "type": "string" },
                    "payerAddress": { "type": "string" },
                    "payeeName": { "type": "string" },
                    "date": { "type": "string" },
                    "amountNumeric": { "type": "string" },
                    "amountText": { "type": "string" },
                    "checkNumber": { "type": "string" },
                    "routingNumber": { "type": "string" },
                    "accountNumber": { "type": "string" },
                    "memo": { "type": "string" },
                    "isSigned": { "type": "boolean" },
                    "micrLine": { "type": "string" }
                },
                "required": ["bankName", "payeeName", "amountNumeric", "date", "isSigned"]
            },
            "fraudAnalysis": {
                "type": "object",
                "properties": {
                    "riskScore": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 100,
                        "description": "0 to 100, where 100 is high fraud risk"
                    },
                    "riskLevel": {
                        "type": "string",
                        "enum": ["SAFE", "CAUTION", "SUSPICIOUS", "CRITICAL"]
                    },
                    "reasoning": { "type": "string" },
                    "digitalAlterationDetected": { "type": "boolean" },
                    "alerts": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "severity": { "type": "string", "enum": ["LOW", "MEDIUM", "HIGH"] },
                                "flag": { "type": "string" },
                                "description": { "type": "string" }
                            },
                            "required": ["severity", "flag", "description"]
                        }
                    }
                },
                "required": ["riskScore", "riskLevel", "reasoning", "alerts"]
            }
        },
        "required": ["extraction", "fraudAnalysis"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(v: &Value) -> Vec<&str> {
        v["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect()
    }

    #[test]
    fn schema_declares_mandatory_fields() {
        let schema = response_schema();
        let ex = &schema["properties"]["extraction"];
        assert_eq!(
            required(ex),
            vec!["bankName", "payeeName", "amountNumeric", "date", "isSigned"]
        );
        let fa = &schema["properties"]["fraudAnalysis"];
        assert_eq!(
            required(fa),
            vec!["riskScore", "riskLevel", "reasoning", "alerts"]
        );
    }

    #[test]
    fn prompt_lists_every_fraud_signal() {
        for signal in [
            "numeric amount and the written legal amount",
            "digital alteration",
            "signatures",
            "Date anomalies",
            "MICR line",
            "payee names or memo",
        ] {
            assert!(DEFAULT_SYSTEM_PROMPT.contains(signal), "missing: {signal}");
        }
    }

    #[test]
    fn user_instruction_embeds_schema() {
        let text = user_instruction();
        assert!(text.contains("\"fraudAnalysis\""));
        assert!(text.contains("\"SUSPICIOUS\""));
    }
}
