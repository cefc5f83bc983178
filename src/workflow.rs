//! The application state machine: upload → analyze → display → reset.
//!
//! [`StateMachine`] owns the per-run data and implements the transition
//! table; it never performs I/O. [`Session`] drives one run at a time
//! through the encoder and a [`CheckAnalyzer`], taking the machine's lock
//! only for the instant of each transition.
//!
//! ## Phases
//!
//! ```text
//!            begin            encoded            completed
//!   IDLE ──────────▶ UPLOADING ───────▶ ANALYZING ─────────▶ COMPLETE
//!     ▲                  │ failed           │ failed
//!     │                  ▼                  ▼
//!     └──── reset ──── ERROR ◀──────────────┘
//! ```
//!
//! Reset returns to Idle from any phase.
//!
//! ## Stale responses
//!
//! Every run gets a fresh [`RunId`]. Stage outcomes carry the id captured at
//! `begin`; if the machine has since been reset (or moved on to another run)
//! the outcome is dropped as [`Transition::Stale`] and the current state is
//! left untouched.

use crate::analyzer::CheckAnalyzer;
use crate::config::AnalysisConfig;
use crate::error::{user_message, SentinelError};
use crate::media::MediaType;
use crate::observer::{NoopObserver, Observer};
use crate::output::AnalysisResult;
use crate::pipeline::encode::{encode_file, EncodedDocument, PreviewHandle};
use crate::pipeline::input::SelectedFile;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// The externally visible phase of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Idle,
    Uploading,
    Analyzing,
    Complete,
    Error,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Idle => "IDLE",
            WorkflowPhase::Uploading => "UPLOADING",
            WorkflowPhase::Analyzing => "ANALYZING",
            WorkflowPhase::Complete => "COMPLETE",
            WorkflowPhase::Error => "ERROR",
        }
    }

    /// Uploading or Analyzing.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowPhase::Uploading | WorkflowPhase::Analyzing)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation counter for one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RunId(u64);

impl RunId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The encoded document owned by the state machine for one run.
#[derive(Debug)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: MediaType,
    /// Base64 body without any `data:` prefix.
    pub payload: Arc<str>,
    preview: PreviewHandle,
}

impl UploadedFile {
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn preview_path(&self) -> &Path {
        self.preview.path()
    }
}

impl From<EncodedDocument> for UploadedFile {
    fn from(doc: EncodedDocument) -> Self {
        Self {
            name: doc.name,
            media_type: doc.media_type,
            payload: Arc::from(doc.payload),
            preview: doc.preview,
        }
    }
}

/// Run-scoped data per phase.
#[derive(Debug, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Uploading {
        run: RunId,
        name: String,
    },
    Analyzing {
        run: RunId,
        file: UploadedFile,
    },
    Complete {
        run: RunId,
        file: UploadedFile,
        result: AnalysisResult,
    },
    Error {
        run: RunId,
        /// Present when encoding had already succeeded.
        file: Option<UploadedFile>,
        message: String,
    },
}

impl WorkflowState {
    pub fn phase(&self) -> WorkflowPhase {
        match self {
            WorkflowState::Idle => WorkflowPhase::Idle,
            WorkflowState::Uploading { .. } => WorkflowPhase::Uploading,
            WorkflowState::Analyzing { .. } => WorkflowPhase::Analyzing,
            WorkflowState::Complete { .. } => WorkflowPhase::Complete,
            WorkflowState::Error { .. } => WorkflowPhase::Error,
        }
    }

    pub fn run(&self) -> Option<RunId> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::Uploading { run, .. }
            | WorkflowState::Analyzing { run, .. }
            | WorkflowState::Complete { run, .. }
            | WorkflowState::Error { run, .. } => Some(*run),
        }
    }
}

/// Outcome of a run-scoped trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied(WorkflowPhase),
    /// The trigger belonged to a run that is no longer current.
    Stale,
}

/// The transition table. Pure state; no I/O.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: WorkflowState,
    last_run: u64,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle → Uploading. Any other phase is rejected.
    pub fn begin(&mut self, name: impl Into<String>) -> Result<RunId, SentinelError> {
        let phase = self.phase();
        if phase != WorkflowPhase::Idle {
            return Err(SentinelError::WorkflowBusy { phase });
        }
        self.last_run += 1;
        let run = RunId(self.last_run);
        self.state = WorkflowState::Uploading {
            run,
            name: name.into(),
        };
        Ok(run)
    }

    /// Uploading → Analyzing, storing the encoded file.
    ///
    /// A stale `file` is dropped here, which releases its preview.
    pub fn encoded(&mut self, run: RunId, file: UploadedFile) -> Transition {
        if !matches!(&self.state, WorkflowState::Uploading { run: current, .. } if *current == run) {
            return Transition::Stale;
        }
        self.state = WorkflowState::Analyzing { run, file };
        Transition::Applied(WorkflowPhase::Analyzing)
    }

    /// Analyzing → Complete.
    pub fn completed(&mut self, run: RunId, result: AnalysisResult) -> Transition {
        if !matches!(&self.state, WorkflowState::Analyzing { run: current, .. } if *current == run) {
            return Transition::Stale;
        }
        match std::mem::take(&mut self.state) {
            WorkflowState::Analyzing { run, file } => {
                self.state = WorkflowState::Complete { run, file, result };
                Transition::Applied(WorkflowPhase::Complete)
            }
            other => {
                self.state = other;
                Transition::Stale
            }
        }
    }

    /// Uploading or Analyzing → Error.
    ///
    /// A blank `message` is replaced by the generic failure message.
    pub fn failed(&mut self, run: RunId, message: impl AsRef<str>) -> Transition {
        if self.state.run() != Some(run) || !self.phase().is_busy() {
            return Transition::Stale;
        }
        let file = match std::mem::take(&mut self.state) {
            WorkflowState::Analyzing { file, .. } => Some(file),
            _ => None,
        };
        self.state = WorkflowState::Error {
            run,
            file,
            message: user_message(message),
        };
        Transition::Applied(WorkflowPhase::Error)
    }

    /// Any → Idle. Idempotent; returns the phase that was left.
    pub fn reset(&mut self) -> WorkflowPhase {
        let previous = self.phase();
        self.state = WorkflowState::Idle;
        previous
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.state.phase()
    }

    pub fn run(&self) -> Option<RunId> {
        self.state.run()
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        match &self.state {
            WorkflowState::Analyzing { file, .. } | WorkflowState::Complete { file, .. } => {
                Some(file)
            }
            WorkflowState::Error { file, .. } => file.as_ref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            WorkflowState::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// A cloned, serialisable view of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub run: Option<RunId>,
    pub file: Option<FileSummary>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,
    pub media_type: MediaType,
    pub preview_path: PathBuf,
    pub payload_len: usize,
}

/// One workflow instance: a state machine plus the stages that drive it.
///
/// Share it behind an `Arc` to reset from another task while a run is in
/// flight.
pub struct Session<A> {
    analyzer: A,
    config: AnalysisConfig,
    machine: Mutex<StateMachine>,
    observer: Observer,
}

impl<A: CheckAnalyzer> Session<A> {
    pub fn new(analyzer: A, config: AnalysisConfig) -> Self {
        Self {
            analyzer,
            config,
            machine: Mutex::new(StateMachine::new()),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run one selected file through encode and analysis.
    ///
    /// Returns the phase the run ended in (Complete or Error), or the phase
    /// found after a reset overtook the run. Only a busy workflow is an
    /// `Err`; every failure inside the run becomes the Error phase.
    pub async fn submit(&self, file: SelectedFile) -> Result<WorkflowPhase, SentinelError> {
        let run = self.lock().begin(file.name.clone())?;
        info!("Run {}: analyzing {} ({})", run, file.name, file.media_type);
        self.notify(run, Transition::Applied(WorkflowPhase::Uploading));

        let doc = match encode_file(&file, &self.config).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Run {}: encoding failed: {}", run, e);
                let transition = self.lock().failed(run, e.to_string());
                self.notify(run, transition);
                return Ok(self.phase());
            }
        };

        let uploaded = UploadedFile::from(doc);
        let payload = Arc::clone(&uploaded.payload);
        let media_type = uploaded.media_type;
        let transition = self.lock().encoded(run, uploaded);
        self.notify(run, transition);
        if transition == Transition::Stale {
            return Ok(self.phase());
        }

        let outcome = self.analyzer.analyze(&payload, media_type).await;
        let transition = match outcome {
            Ok(result) => {
                info!(
                    "Run {}: risk score {} ({})",
                    run, result.fraud_analysis.risk_score, result.fraud_analysis.risk_level
                );
                self.lock().completed(run, result)
            }
            Err(e) => {
                warn!("Run {}: analysis failed: {}", run, e);
                self.lock().failed(run, e.to_string())
            }
        };
        self.notify(run, transition);
        Ok(self.phase())
    }

    /// Return to Idle, releasing the preview. Safe to call at any time.
    pub fn reset(&self) {
        let previous = self.lock().reset();
        if previous != WorkflowPhase::Idle {
            debug!("Reset from {}", previous);
            self.observer.on_phase_change(None, WorkflowPhase::Idle);
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.lock().phase()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let machine = self.lock();
        WorkflowSnapshot {
            phase: machine.phase(),
            run: machine.run(),
            file: machine.file().map(|f| FileSummary {
                name: f.name.clone(),
                media_type: f.media_type,
                preview_path: f.preview_path().to_path_buf(),
                payload_len: f.payload.len(),
            }),
            result: machine.result().cloned(),
            error: machine.error().map(str::to_string),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateMachine> {
        self.machine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, run: RunId, transition: Transition) {
        match transition {
            Transition::Applied(phase) => self.observer.on_phase_change(Some(run), phase),
            Transition::Stale => {
                warn!("Run {}: outcome arrived after reset; discarded", run);
                self.observer.on_discarded(run);
            }
        }
    }
}

impl<A> fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}
