//! Observer hook for workflow phase changes.
//!
//! Inject an [`Observer`] via [`crate::workflow::Session::with_observer`] to
//! follow a run as it moves through its phases, e.g. to drive a terminal
//! spinner. The observer is always called after the session's lock has been
//! released, so implementations may call back into the session.
//!
//! # Example
//!
//! ```rust
//! use sentinelcheck::{RunId, WorkflowObserver, WorkflowPhase};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct PhaseLog(Mutex<Vec<WorkflowPhase>>);
//!
//! impl WorkflowObserver for PhaseLog {
//!     fn on_phase_change(&self, _run: Option<RunId>, phase: WorkflowPhase) {
//!         self.0.lock().unwrap().push(phase);
//!     }
//! }
//! ```

use crate::workflow::{RunId, WorkflowPhase};
use std::sync::Arc;

/// Receives workflow events. All methods default to no-ops.
pub trait WorkflowObserver: Send + Sync {
    /// The session entered `phase`. `run` is `None` for a reset to Idle.
    fn on_phase_change(&self, run: Option<RunId>, phase: WorkflowPhase) {
        let _ = (run, phase);
    }

    /// A stage of `run` finished after the run had been reset or replaced;
    /// its outcome was dropped.
    fn on_discarded(&self, run: RunId) {
        let _ = run;
    }
}

/// An observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Shared observer handle.
pub type Observer = Arc<dyn WorkflowObserver>;
