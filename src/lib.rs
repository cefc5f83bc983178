//! # sentinelcheck
//!
//! Bank-check analysis with Vision Language Models (VLMs).
//!
//! A scanned check (JPEG, PNG, WEBP or PDF) is sent to a multimodal model
//! that transcribes its fields and scores the fraud risk. This crate owns
//! everything around that single call: accepting the file, encoding it,
//! declaring the expected reply shape, parsing the reply strictly, driving
//! the upload → analyze → display → reset workflow, and rendering the
//! result as a terminal report.
//!
//! No fraud heuristics run locally. The score and label shown are the
//! model's, passed through unchanged.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / URL / data: URI
//!  │
//!  ├─ 1. Upload    first dropped/picked entry, allow-listed media type
//!  ├─ 2. Encode    bytes → base64 payload + temp preview (PDF optionally
//!  │               rasterised via pdfium)
//!  ├─ 3. Analyze   one VLM call: forensic prompt + JSON schema + document
//!  ├─ 4. Parse     strip fences/prose, strict serde into AnalysisResult
//!  └─ 5. Render    risk gauge, badge, alerts, extracted fields
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentinelcheck::{
//!     render_report, resolve_source, AnalysisConfig, ReportStyle, Session, VisionAnalyzer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = AnalysisConfig::default();
//!     config.ensure_credentials()?;
//!
//!     let session = Session::new(VisionAnalyzer::from_config(&config)?, config);
//!     session.submit(resolve_source("check.jpg")?).await?;
//!
//!     let snapshot = session.snapshot();
//!     if let Some(result) = snapshot.result {
//!         println!("{}", render_report(&result, &ReportStyle::default()));
//!     } else if let Some(message) = snapshot.error {
//!         eprintln!("{message}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sentinelcheck` binary (clap, indicatif, arboard, tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! sentinelcheck = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFs
//!
//! Gemini models read PDFs natively, so by default a PDF is sent as-is
//! ([`PdfMode::Inline`]). For providers that only take images, use
//! [`PdfMode::Rasterise`]: page 1 is rendered to PNG through pdfium, which
//! must be installed or pointed to with `PDFIUM_LIB_PATH`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyzer;
pub mod config;
pub mod error;
pub mod media;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod upload;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyzer::CheckAnalyzer;
pub use config::{AnalysisConfig, AnalysisConfigBuilder, PdfMode};
pub use error::{AnalysisError, AnalysisErrorKind, SentinelError, GENERIC_FAILURE_MESSAGE};
pub use media::MediaType;
pub use observer::{NoopObserver, Observer, WorkflowObserver};
pub use output::{AnalysisResult, CheckExtraction, FraudAlert, FraudAnalysis, RiskLevel, Severity};
pub use pipeline::encode::{encode_file, EncodedDocument, PreviewHandle};
pub use pipeline::input::{resolve_source, FileSource, SelectedFile};
pub use pipeline::llm::VisionAnalyzer;
pub use report::{
    extraction_json, render_extraction, render_fraud_summary, render_report, Gauge, ReportStyle,
    RiskBand, RiskThresholds,
};
pub use upload::{parse_drop_payload, UploadEvent, UploadSurface};
pub use workflow::{
    FileSummary, RunId, Session, StateMachine, Transition, UploadedFile, WorkflowPhase,
    WorkflowSnapshot, WorkflowState,
};
