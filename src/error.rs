//! Error types for the sentinelcheck library.
//!
//! Two distinct error types reflect two distinct failure surfaces:
//!
//! * [`SentinelError`]: everything the workflow itself can hit, such as a file that
//!   cannot be read, a media type outside the allow-list, a provider that is
//!   not configured, a selection made while another run is still active.
//!
//! * [`AnalysisError`]: failures at the boundary with the external analysis
//!   service. They are produced by [`crate::analyzer::CheckAnalyzer`]
//!   implementations and wrapped into [`SentinelError::Analysis`] when they
//!   need to travel further.
//!
//! Keeping the service errors separate lets callers tell "the model said
//! something unusable" apart from "the network is down" without string
//! matching, via [`AnalysisError::kind`].

use crate::workflow::WorkflowPhase;
use std::path::PathBuf;
use thiserror::Error;

/// Fallback message shown when an error carries no usable text.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to analyze the check. Please try again.";

/// All workflow-level errors returned by the sentinelcheck library.
#[derive(Debug, Error)]
pub enum SentinelError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a file path, an HTTP/HTTPS URL, or a data URI.
    #[error("Invalid input '{input}': not a file path, HTTP/HTTPS URL, or data URI")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The document is not a JPEG, PNG, WEBP image or a PDF.
    #[error("Unsupported file type '{mime}' for '{name}'\nAccepted: JPEG, PNG, WEBP images or PDF.")]
    UnsupportedMediaType { name: String, mime: String },

    // ── Encoding errors ───────────────────────────────────────────────────
    /// The selected file could not be read or turned into a payload.
    #[error("Could not read '{name}': {detail}")]
    EncodingFailed { name: String, detail: String },

    /// pdfium could not render the first page of a PDF.
    #[error("Rasterisation failed for '{name}': {detail}")]
    RasterisationFailed { name: String, detail: String },

    // ── Provider / config errors ──────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Workflow errors ───────────────────────────────────────────────────
    /// A file was selected while a run was not idle. Reset first.
    #[error("Cannot start a new analysis while the workflow is {phase}; reset first")]
    WorkflowBusy { phase: WorkflowPhase },

    /// The analysis service failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the JSON result file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures at the boundary with the external analysis service.
///
/// None of these are retried by the client; retry policy belongs to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The encoded document handed to the client was empty.
    #[error("Refusing to analyze an empty document payload")]
    EmptyPayload,

    /// The service answered without any textual content.
    #[error("The analysis service returned no content; the check could not be analyzed")]
    EmptyResponse,

    /// The reply was not JSON or did not match the declared result shape.
    #[error("The analysis service returned an unusable result: {detail}")]
    Parse { detail: String },

    /// Network or service-level failure.
    #[error("Analysis service error: {message}")]
    Transport { message: String },

    /// The service did not answer within the configured bound.
    #[error("Analysis service did not respond within {secs}s")]
    Timeout { secs: u64 },
}

/// Coarse classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    Input,
    EmptyResponse,
    Parse,
    Transport,
}

impl AnalysisError {
    pub fn kind(&self) -> AnalysisErrorKind {
        match self {
            AnalysisError::EmptyPayload => AnalysisErrorKind::Input,
            AnalysisError::EmptyResponse => AnalysisErrorKind::EmptyResponse,
            AnalysisError::Parse { .. } => AnalysisErrorKind::Parse,
            AnalysisError::Transport { .. } | AnalysisError::Timeout { .. } => {
                AnalysisErrorKind::Transport
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == AnalysisErrorKind::Transport
    }
}

/// Turn any error text into a message fit for the Error phase.
///
/// Blank text falls back to [`GENERIC_FAILURE_MESSAGE`].
pub fn user_message(text: impl AsRef<str>) -> String {
    let text = text.as_ref().trim();
    if text.is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        text.to_string()
    }
}
