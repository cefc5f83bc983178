//! Result types returned by the analysis service.
//!
//! The serde shapes here ARE the wire contract: field names are camelCase
//! exactly as declared in [`crate::prompts::response_schema`]. Fields the
//! schema marks as required carry no `#[serde(default)]`, so a reply that
//! omits one fails to deserialise instead of being patched with a zero.

use crate::error::SentinelError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// Fields transcribed from the check.
///
/// Every value is an opaque string as printed on the document; nothing is
/// validated for format (no routing-number checksum, no date parsing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckExtraction {
    pub bank_name: String,
    #[serde(default)]
    pub payer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_address: Option<String>,
    pub payee_name: String,
    /// Free text, as printed.
    pub date: String,
    /// Keeps the printed formatting, e.g. `"1,250.00"`.
    pub amount_numeric: String,
    #[serde(default)]
    pub amount_text: String,
    #[serde(default)]
    pub check_number: String,
    #[serde(default)]
    pub routing_number: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub memo: String,
    pub is_signed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micr_line: Option<String>,
}

/// Severity attached to a single fraud alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

/// Risk label assigned by the external service. Never derived locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Safe,
    Caution,
    Suspicious,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Caution => "CAUTION",
            RiskLevel::Suspicious => "SUSPICIOUS",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAlert {
    pub severity: Severity,
    /// Short label, e.g. "Amount mismatch".
    pub flag: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAnalysis {
    /// 0–100, where 100 is the highest fraud risk.
    #[serde(deserialize_with = "deserialize_risk_score")]
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    #[serde(default)]
    pub digital_alteration_detected: bool,
    /// In the order the service listed them.
    pub alerts: Vec<FraudAlert>,
}

/// The complete, immutable outcome of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub extraction: CheckExtraction,
    pub fraud_analysis: FraudAnalysis,
}

impl AnalysisResult {
    /// Write the result as pretty JSON to `path`.
    ///
    /// Atomic: the JSON goes to a sibling temp file first, then is renamed
    /// over `path`, so readers never see a half-written file.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SentinelError> {
        let path = path.as_ref();
        let write_err = |e: std::io::Error| SentinelError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        };

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SentinelError::Internal(format!("Failed to serialise result: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }
}

/// Accept any JSON number in `0..=100`; fractional scores round to nearest.
fn deserialize_risk_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
        return Err(serde::de::Error::custom(format!(
            "riskScore must be between 0 and 100, got {raw}"
        )));
    }
    Ok(raw.round() as u8)
}
