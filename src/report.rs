//! Terminal rendering of an [`AnalysisResult`].
//!
//! The report has two regions, mirroring a dashboard:
//!
//! 1. **Fraud summary**: shield, risk-level badge, a half-gauge showing the
//!    score against its complement, the model's reasoning, and the alert list.
//! 2. **Extracted data**: every [`CheckExtraction`] field in two groups,
//!    followed by the signature indicator and the MICR line.
//!
//! Nothing here computes risk. The only derived values are the gauge
//! complement (`100 − score`) and the colour band.
//!
//! ## One source of truth for colour
//!
//! The service returns both a numeric score and a label. They are not
//! guaranteed to agree, so every colour in the report (gauge, badge, shield)
//! comes from the score via [`RiskThresholds`]. The badge still prints the
//! label verbatim.

use crate::error::SentinelError;
use crate::output::{AnalysisResult, CheckExtraction, FraudAlert, FraudAnalysis, Severity};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Shown in place of a missing or blank field.
pub const PLACEHOLDER: &str = "—";

/// Shown when the alert list is empty.
pub const NO_ALERTS: &str = "No active fraud alerts detected.";

// ── Bands ────────────────────────────────────────────────────────────────────

/// Score cut-offs that split 0–100 into three colour bands.
///
/// `score > high` is [`RiskBand::High`], `score > elevated` is
/// [`RiskBand::Elevated`], anything else is [`RiskBand::Low`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub high: u8,
    pub elevated: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 75,
            elevated: 40,
        }
    }
}

impl RiskThresholds {
    /// Bands must be non-empty and ordered.
    pub fn validate(&self) -> Result<(), SentinelError> {
        if self.elevated >= self.high || self.high >= 100 {
            return Err(SentinelError::InvalidConfig(format!(
                "risk thresholds must satisfy elevated < high < 100, got elevated={} high={}",
                self.elevated, self.high
            )));
        }
        Ok(())
    }

    pub fn band(&self, score: u8) -> RiskBand {
        if score > self.high {
            RiskBand::High
        } else if score > self.elevated {
            RiskBand::Elevated
        } else {
            RiskBand::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskBand {
    Low,
    Elevated,
    High,
}

impl RiskBand {
    fn paint(&self, style: &ReportStyle, s: &str) -> String {
        match self {
            RiskBand::Low => style.green(s),
            RiskBand::Elevated => style.yellow(s),
            RiskBand::High => style.red(s),
        }
    }
}

/// Score against its complement, the two slices of the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gauge {
    pub risk: u8,
    pub safe: u8,
}

impl Gauge {
    pub fn from_score(score: u8) -> Self {
        let risk = score.min(100);
        Self {
            risk,
            safe: 100 - risk,
        }
    }

    /// Number of filled cells out of `width`, rounded to nearest.
    pub fn filled(&self, width: usize) -> usize {
        (self.risk as usize * width + 50) / 100
    }
}

// ── Style ────────────────────────────────────────────────────────────────────

/// Presentation options for [`render_report`].
#[derive(Debug, Clone)]
pub struct ReportStyle {
    /// Emit ANSI colour codes.
    pub color: bool,
    /// Width of the score gauge in cells.
    pub gauge_width: usize,
    pub thresholds: RiskThresholds,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            color: true,
            gauge_width: 40,
            thresholds: RiskThresholds::default(),
        }
    }
}

impl ReportStyle {
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    fn ansi(&self, code: &str, s: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.ansi("32", s)
    }
    pub fn yellow(&self, s: &str) -> String {
        self.ansi("33", s)
    }
    pub fn red(&self, s: &str) -> String {
        self.ansi("31", s)
    }
    pub fn blue(&self, s: &str) -> String {
        self.ansi("34", s)
    }
    pub fn cyan(&self, s: &str) -> String {
        self.ansi("36", s)
    }
    pub fn dim(&self, s: &str) -> String {
        self.ansi("2", s)
    }
    pub fn bold(&self, s: &str) -> String {
        self.ansi("1", s)
    }
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Render the full report: fraud summary, then extracted data.
pub fn render_report(result: &AnalysisResult, style: &ReportStyle) -> String {
    let mut out = render_fraud_summary(&result.fraud_analysis, style);
    out.push('\n');
    out.push_str(&render_extraction(&result.extraction, style));
    out
}

pub fn render_fraud_summary(analysis: &FraudAnalysis, style: &ReportStyle) -> String {
    let band = style.thresholds.band(analysis.risk_score);
    let gauge = Gauge::from_score(analysis.risk_score);
    let mut out = String::new();

    let shield = if band == RiskBand::Low { "🛡" } else { "⚠" };
    let _ = writeln!(
        out,
        "{} {}  {}",
        band.paint(style, shield),
        style.bold("Fraud Analysis"),
        band.paint(style, &format!("[{}]", analysis.risk_level)),
    );

    let filled = gauge.filled(style.gauge_width);
    let bar = format!(
        "{}{}",
        band.paint(style, &"█".repeat(filled)),
        style.dim(&"░".repeat(style.gauge_width - filled)),
    );
    let _ = writeln!(
        out,
        "  {bar}  {} {}",
        style.bold(&format!("{:>3}", gauge.risk)),
        style.dim(&format!("Risk Score  ({} safe)", gauge.safe)),
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style.bold("Analysis Summary"));
    for line in non_blank(&analysis.reasoning).lines() {
        let _ = writeln!(out, "  {line}");
    }

    let _ = writeln!(
        out,
        "  Digital alteration: {}",
        if analysis.digital_alteration_detected {
            style.red("Detected")
        } else {
            style.green("Not detected")
        }
    );

    let _ = writeln!(out);
    if analysis.alerts.is_empty() {
        let _ = writeln!(out, "  {}", style.dim(NO_ALERTS));
    } else {
        for alert in &analysis.alerts {
            out.push_str(&render_alert(alert, style));
        }
    }
    out
}

fn render_alert(alert: &FraudAlert, style: &ReportStyle) -> String {
    let (icon, paint): (&str, fn(&ReportStyle, &str) -> String) = match alert.severity {
        Severity::Low => ("✓", ReportStyle::blue),
        Severity::Medium => ("⚠", ReportStyle::yellow),
        Severity::High => ("✗", ReportStyle::red),
    };
    format!(
        "  {} {} {}\n      {}\n",
        paint(style, icon),
        paint(style, &format!("{:<6}", alert.severity.as_str())),
        style.bold(non_blank(&alert.flag)),
        style.dim(non_blank(&alert.description)),
    )
}

pub fn render_extraction(extraction: &CheckExtraction, style: &ReportStyle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style.bold("Extracted Data"));

    let amount = dollar_amount(&extraction.amount_numeric);
    let _ = writeln!(out, "  {}", style.dim("TRANSACTION DETAILS"));
    for (label, value) in [
        ("Amount (Numeric)", amount.as_str()),
        ("Amount (Text)", extraction.amount_text.as_str()),
        ("Date", extraction.date.as_str()),
        ("Check Number", extraction.check_number.as_str()),
        ("Memo", extraction.memo.as_str()),
    ] {
        out.push_str(&detail_row(label, value));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style.dim("PARTIES INVOLVED"));
    for (label, value) in [
        ("Payee", extraction.payee_name.as_str()),
        ("Payer", extraction.payer_name.as_str()),
        ("Payer Address", extraction.payer_address.as_deref().unwrap_or("")),
        ("Bank Name", extraction.bank_name.as_str()),
        ("Routing Number", extraction.routing_number.as_str()),
        ("Account Number", extraction.account_number.as_str()),
    ] {
        out.push_str(&detail_row(label, value));
    }

    let _ = writeln!(out);
    let (dot, answer) = if extraction.is_signed {
        (style.green("●"), style.bold("Yes"))
    } else {
        (style.red("●"), style.bold("No"))
    };
    let _ = writeln!(out, "  {dot} Signature Detected: {answer}");
    if let Some(micr) = extraction.micr_line.as_deref().filter(|m| !m.trim().is_empty()) {
        let _ = writeln!(out, "  MICR  {}", style.dim(micr));
    }
    out
}

fn detail_row(label: &str, value: &str) -> String {
    format!("    {:<18}{}\n", label, non_blank(value))
}

/// The value itself, or [`PLACEHOLDER`] when blank.
pub fn non_blank(value: &str) -> &str {
    if value.trim().is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

/// Prefix a numeric amount with `$` unless blank or already prefixed.
fn dollar_amount(amount: &str) -> String {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('$') {
        trimmed.to_string()
    } else {
        format!("${trimmed}")
    }
}

/// The extraction serialised verbatim as pretty JSON, for "copy as JSON".
pub fn extraction_json(extraction: &CheckExtraction) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(extraction)
}
