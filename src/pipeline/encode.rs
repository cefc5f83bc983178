//! File encoding: bytes → base64 payload plus a local preview file.
//!
//! The payload is the bare base64 body the analysis service expects; a
//! `data:` prefix is never part of it. The preview is a temporary copy of
//! what was sent, so the user can open exactly the document that was
//! analysed. It is deleted when the [`PreviewHandle`] is dropped.

use crate::config::{AnalysisConfig, PdfMode};
use crate::error::SentinelError;
use crate::media::MediaType;
use crate::pipeline::input::{read_source, SelectedFile};
use crate::pipeline::render::rasterise_first_page;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tracing::debug;

/// A temporary on-disk copy of the analysed document.
///
/// Releasing the handle (drop or [`PreviewHandle::release`]) removes the file.
#[derive(Debug)]
pub struct PreviewHandle {
    path: TempPath,
}

impl PreviewHandle {
    /// Write `bytes` to a fresh temp file with the type's extension.
    ///
    /// Blocking; [`encode_file`] runs it on the blocking pool.
    pub fn create(bytes: &[u8], media_type: MediaType) -> std::io::Result<Self> {
        let suffix = format!(".{}", media_type.extension());
        let mut file = tempfile::Builder::new()
            .prefix("sentinelcheck-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the preview file now.
    pub fn release(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// The result of encoding a selected file.
#[derive(Debug)]
pub struct EncodedDocument {
    pub name: String,
    /// Base64 body, no `data:` prefix.
    pub payload: String,
    /// Type of what was actually encoded; PNG for a rasterised PDF.
    pub media_type: MediaType,
    pub preview: PreviewHandle,
    /// Size of the encoded bytes before base64.
    pub byte_len: usize,
}

/// Read, verify and encode a selected file.
///
/// The content is sniffed again here: a file whose bytes turn out to be a
/// type outside the allow-list is rejected even if its name looked fine.
pub async fn encode_file(
    file: &SelectedFile,
    config: &AnalysisConfig,
) -> Result<EncodedDocument, SentinelError> {
    let bytes = read_source(file, config.download_timeout_secs).await?;
    if bytes.is_empty() {
        return Err(SentinelError::EncodingFailed {
            name: file.name.clone(),
            detail: "file is empty".to_string(),
        });
    }

    let media_type = MediaType::from_content(&bytes, Some(file.media_type)).map_err(|mime| {
        SentinelError::UnsupportedMediaType {
            name: file.name.clone(),
            mime,
        }
    })?;

    let (bytes, media_type) = if media_type.is_pdf() && config.pdf_mode == PdfMode::Rasterise {
        let png = rasterise_first_page(&file.name, bytes, config.max_rendered_pixels).await?;
        (png, MediaType::Png)
    } else {
        (bytes, media_type)
    };

    let payload = encode_payload(&bytes);
    let byte_len = bytes.len();

    let preview = tokio::task::spawn_blocking(move || PreviewHandle::create(&bytes, media_type))
        .await
        .map_err(|e| SentinelError::Internal(format!("Preview task panicked: {}", e)))?
        .map_err(|e| SentinelError::EncodingFailed {
            name: file.name.clone(),
            detail: format!("could not write preview: {e}"),
        })?;

    debug!(
        "Encoded {} ({}) → {} bytes base64",
        file.name,
        media_type,
        payload.len()
    );

    Ok(EncodedDocument {
        name: file.name.clone(),
        payload,
        media_type,
        preview,
        byte_len,
    })
}

/// Base64-encode bytes into a bare payload.
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
