//! Pipeline stages between a selected file and a parsed result.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable and the VLM integration can change without
//! touching file handling.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──(render)──▶ llm ──▶ postprocess
//! (path/URL/data:)  (base64 + preview)  (VLM)   (reply → AnalysisResult)
//! ```
//!
//! 1. [`input`] resolves what the user selected and fetches its bytes
//! 2. [`encode`] produces the base64 payload plus a local preview file
//! 3. [`render`] optionally rasterises a PDF's first page via pdfium, inside
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`llm`] makes the single VLM call; the only stage talking to the
//!    analysis service
//! 5. [`postprocess`] strips reply wrappers and parses strictly against the
//!    declared shape

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
