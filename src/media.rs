//! The media-type allow-list.
//!
//! Only four document types are ever sent to the analysis service. Modelling
//! them as an enum means the allow-list is enforced by the type system from
//! the Upload Surface all the way down to [`crate::analyzer::CheckAnalyzer`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A document type the analysis service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl MediaType {
    /// Every accepted type, in the order used for the file-picker filter.
    pub const ALL: [MediaType; 4] = [
        MediaType::Jpeg,
        MediaType::Png,
        MediaType::Webp,
        MediaType::Pdf,
    ];

    /// Parse a mime string, ignoring parameters and case.
    ///
    /// Returns `None` for anything outside the allow-list.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MediaType::Jpeg),
            "image/png" => Some(MediaType::Png),
            "image/webp" => Some(MediaType::Webp),
            "application/pdf" => Some(MediaType::Pdf),
            _ => None,
        }
    }

    /// Detect the type from the leading bytes of the content.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        infer::get(bytes).and_then(|t| Self::from_mime(t.mime_type()))
    }

    /// Classify content by magic bytes, falling back to `declared` when the
    /// bytes are not recognised at all.
    ///
    /// Recognised content outside the allow-list is an error carrying the
    /// detected mime type, even when `declared` is allowed.
    pub fn from_content(bytes: &[u8], declared: Option<Self>) -> Result<Self, String> {
        match infer::get(bytes) {
            Some(t) => Self::from_mime(t.mime_type()).ok_or_else(|| t.mime_type().to_string()),
            None => declared.ok_or_else(|| "application/octet-stream".to_string()),
        }
    }

    /// Guess the type from a file name or URL path extension.
    pub fn from_extension(name: &str) -> Option<Self> {
        mime_guess::from_path(name)
            .iter()
            .find_map(|m| Self::from_mime(m.essence_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
            MediaType::Pdf => "application/pdf",
        }
    }

    /// File extension used for preview files.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
            MediaType::Webp => "webp",
            MediaType::Pdf => "pdf",
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, MediaType::Pdf)
    }

    /// The comma-separated filter string, e.g. for a picker's `accept` list.
    pub fn accept_filter() -> String {
        Self::ALL
            .iter()
            .map(MediaType::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mime_allow_list() {
        assert_eq!(MediaType::from_mime("image/jpeg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_mime("IMAGE/PNG"), Some(MediaType::Png));
        assert_eq!(
            MediaType::from_mime("application/pdf; charset=binary"),
            Some(MediaType::Pdf)
        );
        assert_eq!(MediaType::from_mime("image/gif"), None);
        assert_eq!(MediaType::from_mime("text/plain"), None);
        assert_eq!(MediaType::from_mime(""), None);
    }

    #[test]
    fn sniff_magic_bytes() {
        assert_eq!(MediaType::sniff(b"%PDF-1.7\n%\xe2\xe3"), Some(MediaType::Pdf));
        assert_eq!(
            MediaType::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]),
            Some(MediaType::Png)
        );
        assert_eq!(MediaType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some(MediaType::Jpeg));
        assert_eq!(MediaType::sniff(b"GIF89a......"), None);
        assert_eq!(MediaType::sniff(b"hello world"), None);
    }

    #[test]
    fn content_overrides_declared_type() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(MediaType::from_content(&png, Some(MediaType::Jpeg)), Ok(MediaType::Png));
        assert_eq!(
            MediaType::from_content(b"GIF89a......", Some(MediaType::Png)),
            Err("image/gif".to_string())
        );
        assert_eq!(
            MediaType::from_content(b"not a known format", Some(MediaType::Pdf)),
            Ok(MediaType::Pdf)
        );
        assert!(MediaType::from_content(b"not a known format", None).is_err());
    }

    #[test]
    fn extension_guess() {
        assert_eq!(MediaType::from_extension("check.JPG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("scan.webp"), Some(MediaType::Webp));
        assert_eq!(MediaType::from_extension("deposit.pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_extension("notes.txt"), None);
        assert_eq!(MediaType::from_extension("no_extension"), None);
    }

    #[test]
    fn accept_filter_lists_every_type() {
        assert_eq!(
            MediaType::accept_filter(),
            "image/jpeg,image/png,image/webp,application/pdf"
        );
    }
}
