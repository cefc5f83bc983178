//! PDF rasterisation: render the first page of a PDF to PNG via pdfium.
//!
//! Only used in [`PdfMode::Rasterise`](crate::config::PdfMode), for providers
//! that cannot read PDF attachments. A check is a single page, so only page 1
//! is ever rendered.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on a Tokio worker. Rendering is CPU-bound anyway.

use crate::error::SentinelError;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Environment variable pointing at a pdfium shared library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Render page 1 of `bytes` and return it PNG-encoded.
///
/// `max_pixels` caps the longest edge of the rendered page.
pub async fn rasterise_first_page(
    name: &str,
    bytes: Vec<u8>,
    max_pixels: u32,
) -> Result<Vec<u8>, SentinelError> {
    let owned_name = name.to_string();

    tokio::task::spawn_blocking(move || rasterise_blocking(&owned_name, &bytes, max_pixels))
        .await
        .map_err(|e| SentinelError::Internal(format!("Render task panicked: {}", e)))?
}

fn rasterise_blocking(name: &str, bytes: &[u8], max_pixels: u32) -> Result<Vec<u8>, SentinelError> {
    let fail = |detail: String| SentinelError::RasterisationFailed {
        name: name.to_string(),
        detail,
    };

    let pdfium = Pdfium::new(bind_pdfium().map_err(|e| fail(format!("pdfium unavailable: {:?}", e)))?);

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| fail(format!("{:?}", e)))?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(fail("document has no pages".to_string()));
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let page = pages.get(0).map_err(|e| fail(format!("{:?}", e)))?;
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| fail(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 of {} → {}x{} px", name, image.width(), image.height());

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| fail(e.to_string()))?;
    Ok(png)
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library.
fn bind_pdfium() -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_ENV) {
        if !path.trim().is_empty() {
            return Pdfium::bind_to_library(path.trim());
        }
    }
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
}
