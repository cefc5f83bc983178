//! Input resolution: turn what the user selected into a [`SelectedFile`], and
//! later fetch its bytes.
//!
//! Three kinds of source are accepted:
//!
//! * a local path (optionally written as a `file://` URI, which is what many
//!   terminals paste on drag-and-drop),
//! * an HTTP/HTTPS URL,
//! * a `data:` URI, the same shape a browser `FileReader` produces.
//!
//! Resolution only decides the declared media type; nothing is encoded here.
//! Local files are classified by their magic bytes and fall back to the
//! extension, URLs by extension, data URIs by their header.

use crate::error::SentinelError;
use crate::media::MediaType;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where the selected document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Local(PathBuf),
    Remote(String),
    DataUri(String),
}

/// The raw file handle passed to the selection callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub source: FileSource,
    /// Display name: file name, last URL segment, or a synthetic name.
    pub name: String,
    /// Declared type; re-checked against the content by the encoder.
    pub media_type: MediaType,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

pub fn is_data_uri(input: &str) -> bool {
    input
        .get(..5)
        .is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// Everything after the first comma of a `data:` URI; other input is unchanged.
pub fn strip_data_uri_prefix(input: &str) -> &str {
    if is_data_uri(input) {
        match input.split_once(',') {
            Some((_, body)) => body,
            None => input,
        }
    } else {
        input
    }
}

/// Resolve a user-supplied string to a [`SelectedFile`].
pub fn resolve_source(input: &str) -> Result<SelectedFile, SentinelError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SentinelError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_data_uri(input) {
        resolve_data_uri(input)
    } else if is_url(input) {
        resolve_url(input)
    } else if let Some(uri_path) = input.strip_prefix("file://") {
        resolve_local(&file_uri_path(uri_path))
    } else {
        resolve_local(input)
    }
}

/// Decode the percent-escapes of a `file://` path; undecodable paths are
/// kept as written.
pub fn file_uri_path(uri_path: &str) -> String {
    urlencoding::decode(uri_path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| uri_path.to_string())
}

fn resolve_local(path_str: &str) -> Result<SelectedFile, SentinelError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(SentinelError::FileNotFound { path });
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());
    let declared = MediaType::from_extension(&name);

    // Read enough of the header for magic-byte detection
    let mut head = [0u8; 64];
    let read = match std::fs::File::open(&path) {
        Ok(mut f) => f.read(&mut head).unwrap_or(0),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SentinelError::PermissionDenied { path });
        }
        Err(_) => return Err(SentinelError::FileNotFound { path }),
    };

    let media_type = if read == 0 {
        // Empty files keep their declared type; the encoder rejects them.
        declared
    } else {
        Some(MediaType::from_content(&head[..read], declared).map_err(|mime| {
            SentinelError::UnsupportedMediaType {
                name: name.clone(),
                mime,
            }
        })?)
    };
    let media_type = media_type.ok_or_else(|| SentinelError::UnsupportedMediaType {
        name: name.clone(),
        mime: mime_guess::from_path(&path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    })?;

    debug!("Resolved local file: {} ({})", path.display(), media_type);
    Ok(SelectedFile {
        source: FileSource::Local(path),
        name,
        media_type,
    })
}

fn resolve_url(url: &str) -> Result<SelectedFile, SentinelError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| SentinelError::InvalidInput {
        input: url.to_string(),
    })?;
    let name = parsed
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string();
    let media_type =
        MediaType::from_extension(&name).ok_or_else(|| SentinelError::UnsupportedMediaType {
            name: name.clone(),
            mime: mime_guess::from_path(&name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        })?;

    Ok(SelectedFile {
        source: FileSource::Remote(url.to_string()),
        name,
        media_type,
    })
}

fn resolve_data_uri(uri: &str) -> Result<SelectedFile, SentinelError> {
    let header = data_uri_header(uri)?;
    let mime = header.split(';').next().unwrap_or("").trim();
    let media_type = MediaType::from_mime(mime).ok_or_else(|| SentinelError::UnsupportedMediaType {
        name: "data URI".to_string(),
        mime: if mime.is_empty() { "text/plain" } else { mime }.to_string(),
    })?;

    Ok(SelectedFile {
        source: FileSource::DataUri(uri.to_string()),
        name: format!("pasted.{}", media_type.extension()),
        media_type,
    })
}

/// The part between `data:` and the first comma.
fn data_uri_header(uri: &str) -> Result<&str, SentinelError> {
    uri.get(5..)
        .and_then(|rest| rest.split_once(','))
        .map(|(header, _)| header)
        .ok_or_else(|| SentinelError::InvalidInput {
            input: truncate(uri, 48),
        })
}

// ── Reading ──────────────────────────────────────────────────────────────────

/// Fetch the bytes behind a source.
///
/// Read failures are reported as [`SentinelError::EncodingFailed`] so that
/// they surface as an encoding failure of the run.
pub async fn read_source(
    file: &SelectedFile,
    download_timeout_secs: u64,
) -> Result<Vec<u8>, SentinelError> {
    match &file.source {
        FileSource::Local(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|e| SentinelError::EncodingFailed {
                    name: file.name.clone(),
                    detail: e.to_string(),
                })
        }
        FileSource::Remote(url) => download_url(url, download_timeout_secs).await,
        FileSource::DataUri(uri) => decode_data_uri(uri).map_err(|detail| {
            SentinelError::EncodingFailed {
                name: file.name.clone(),
                detail,
            }
        }),
    }
}

/// Decode the body of a `data:` URI into bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let header = data_uri_header(uri).map_err(|e| e.to_string())?;
    let body = strip_data_uri_prefix(uri);
    let is_base64 = header
        .split(';')
        .any(|p| p.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| format!("invalid base64 in data URI: {e}"))
    } else {
        Ok(urlencoding::decode_binary(body.as_bytes()).into_owned())
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, SentinelError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SentinelError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SentinelError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SentinelError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SentinelError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SentinelError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEAD: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/check.png"));
        assert!(is_url("http://example.com/check.pdf"));
        assert!(!is_url("/tmp/check.png"));
        assert!(!is_url("data:image/png;base64,AAAA"));
        assert!(!is_url(""));
    }

    #[test]
    fn strip_prefix_up_to_first_comma() {
        assert_eq!(strip_data_uri_prefix("data:image/jpeg;base64,/9j/4AAQ"), "/9j/4AAQ");
        assert_eq!(strip_data_uri_prefix("DATA:application/pdf;base64,JVBE,rest"), "JVBE,rest");
        assert_eq!(strip_data_uri_prefix("iVBORw0KGgo"), "iVBORw0KGgo");
        assert_eq!(strip_data_uri_prefix("data:no-comma"), "data:no-comma");
    }

    #[test]
    fn resolves_data_uri_by_header() {
        let f = resolve_source("data:image/webp;base64,UklGRg==").unwrap();
        assert_eq!(f.media_type, MediaType::Webp);
        assert_eq!(f.name, "pasted.webp");

        let err = resolve_source("data:image/gif;base64,R0lGOD").unwrap_err();
        assert!(matches!(err, SentinelError::UnsupportedMediaType { .. }));
        assert!(resolve_source("data:image/png;base64").is_err());
    }

    #[test]
    fn decodes_base64_and_percent_bodies() {
        assert_eq!(decode_data_uri("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_data_uri("data:image/png;base64,aG k=\n").unwrap(), b"hi");
        assert_eq!(decode_data_uri("data:application/pdf,%25PDF").unwrap(), b"%PDF");
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
        assert_eq!(decode_data_uri("data:image/png,%89PNG").unwrap(), b"\x89PNG");
    }

    #[test]
    fn resolves_url_by_extension() {
        let f = resolve_source("https://bank.example/scans/check-1042.JPG").unwrap();
        assert_eq!(f.media_type, MediaType::Jpeg);
        assert_eq!(f.name, "check-1042.JPG");
        assert!(resolve_source("https://bank.example/scans/readme.txt").is_err());
    }

    #[test]
    fn local_file_sniffed_over_extension() {
        let mut tmp = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        tmp.write_all(&PNG_HEAD).unwrap();
        let f = resolve_source(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(f.media_type, MediaType::Png);
    }

    #[test]
    fn local_file_uri_prefix_is_stripped() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4\n").unwrap();
        let uri = format!("file://{}", tmp.path().display());
        let f = resolve_source(&uri).unwrap();
        assert_eq!(f.media_type, MediaType::Pdf);
        assert_eq!(f.source, FileSource::Local(tmp.path().to_path_buf()));
    }

    #[test]
    fn file_uri_escapes_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my check.png");
        std::fs::write(&path, PNG_HEAD).unwrap();

        let uri = format!("file://{}/my%20check.png", dir.path().display());
        let f = resolve_source(&uri).unwrap();
        assert_eq!(f.name, "my check.png");
        assert_eq!(f.source, FileSource::Local(path));
    }

    #[test]
    fn non_ascii_file_name_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ééé.png");
        std::fs::write(&path, PNG_HEAD).unwrap();

        assert!(!is_data_uri("ééé.png"));
        assert!(!is_data_uri("dat\u{e9}.png"));
        let f = resolve_source(path.to_str().unwrap()).unwrap();
        assert_eq!(f.name, "ééé.png");
        assert_eq!(f.media_type, MediaType::Png);

        assert!(matches!(
            resolve_source("ééé.png"),
            Err(SentinelError::FileNotFound { .. })
        ));
    }

    #[test]
    fn disallowed_content_is_rejected() {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(b"GIF89a\x01\x00\x01\x00").unwrap();
        let err = resolve_source(tmp.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SentinelError::UnsupportedMediaType { ref mime, .. } if mime == "image/gif"));
    }

    #[test]
    fn missing_file_and_blank_input() {
        assert!(matches!(
            resolve_source("/definitely/not/a/real/check.png"),
            Err(SentinelError::FileNotFound { .. })
        ));
        assert!(matches!(
            resolve_source("   "),
            Err(SentinelError::InvalidInput { .. })
        ));
    }
}
