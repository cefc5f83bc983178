//! The upload surface: turns drop and pick events into a single selected
//! file for the caller.
//!
//! In a terminal a "drop" is a line of text: dragging a file onto most
//! terminal emulators pastes its path, quoted or backslash-escaped, often
//! as a `file://` URI. [`parse_drop_payload`] splits such a line back into
//! entries.

use crate::media::MediaType;
use crate::pipeline::input::{file_uri_path, resolve_source, SelectedFile};
use tracing::{debug, warn};

/// An interaction with the upload surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    DragEnter,
    DragLeave,
    /// Dropped entries (paths, URLs or data URIs); only the first is used.
    Drop(Vec<String>),
    /// The picker's result; `None` when the user cancelled.
    Pick(Option<String>),
}

/// Accepts files by drop or pick and hands the first acceptable one to
/// `on_select`.
pub struct UploadSurface<F> {
    on_select: F,
    drag_active: bool,
    last_rejection: Option<String>,
}

impl<F: FnMut(SelectedFile)> UploadSurface<F> {
    pub fn new(on_select: F) -> Self {
        Self {
            on_select,
            drag_active: false,
            last_rejection: None,
        }
    }

    /// Process one event. Returns `true` if `on_select` was invoked.
    pub fn handle(&mut self, event: UploadEvent) -> bool {
        match event {
            UploadEvent::DragEnter => {
                self.drag_active = true;
                false
            }
            UploadEvent::DragLeave => {
                self.drag_active = false;
                false
            }
            UploadEvent::Drop(entries) => {
                self.drag_active = false;
                if entries.len() > 1 {
                    debug!("Ignoring {} extra dropped entries", entries.len() - 1);
                }
                match entries.into_iter().next() {
                    Some(first) => self.select(&first),
                    None => false,
                }
            }
            UploadEvent::Pick(Some(entry)) => self.select(&entry),
            UploadEvent::Pick(None) => false,
        }
    }

    /// Visual hint only.
    pub fn is_drag_active(&self) -> bool {
        self.drag_active
    }

    /// Why the most recent entry was refused, if it was.
    pub fn last_rejection(&self) -> Option<&str> {
        self.last_rejection.as_deref()
    }

    /// The accepted types, e.g. for a picker filter or help text.
    pub fn accept(&self) -> String {
        MediaType::accept_filter()
    }

    fn select(&mut self, entry: &str) -> bool {
        if entry.trim().is_empty() {
            return false;
        }
        match resolve_source(entry) {
            Ok(file) => {
                self.last_rejection = None;
                (self.on_select)(file);
                true
            }
            Err(e) => {
                warn!("Rejected upload: {}", e);
                self.last_rejection = Some(e.to_string());
                false
            }
        }
    }
}

/// Split a line pasted by a terminal drag-and-drop into entries.
///
/// Honours single quotes, double quotes and backslash escapes. A `file://`
/// entry becomes its percent-decoded path.
pub fn parse_drop_payload(line: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_entry = false;
    let mut quote: Option<char> = None;
    let mut chars = line.trim().chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_entry = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    in_entry = true;
                }
            }
            (None, c) if c.is_whitespace() => {
                if in_entry {
                    entries.push(std::mem::take(&mut current));
                    in_entry = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_entry = true;
            }
        }
    }
    if in_entry {
        entries.push(current);
    }

    entries
        .into_iter()
        .map(|e| match e.strip_prefix("file://") {
            Some(path) => file_uri_path(path),
            None => e,
        })
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn surface() -> (UploadSurface<impl FnMut(SelectedFile)>, std::rc::Rc<std::cell::RefCell<Vec<SelectedFile>>>) {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        (UploadSurface::new(move |f| sink.borrow_mut().push(f)), seen)
    }

    fn png_file() -> tempfile::NamedTempFile {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        tmp
    }

    #[test]
    fn drop_uses_first_entry_only() {
        let a = png_file();
        let b = png_file();
        let (mut s, seen) = surface();
        let fired = s.handle(UploadEvent::Drop(vec![
            a.path().display().to_string(),
            b.path().display().to_string(),
        ]));
        assert!(fired);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].media_type, MediaType::Png);
    }

    #[test]
    fn empty_drop_and_cancelled_pick_do_nothing() {
        let (mut s, seen) = surface();
        assert!(!s.handle(UploadEvent::Drop(vec![])));
        assert!(!s.handle(UploadEvent::Pick(None)));
        assert!(!s.handle(UploadEvent::Pick(Some("   ".into()))));
        assert!(seen.borrow().is_empty());
        assert!(s.last_rejection().is_none());
    }

    #[test]
    fn disallowed_type_is_rejected() {
        let mut gif = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        gif.write_all(b"GIF89a\x01\x00\x01\x00").unwrap();
        let (mut s, seen) = surface();
        assert!(!s.handle(UploadEvent::Pick(Some(gif.path().display().to_string()))));
        assert!(seen.borrow().is_empty());
        assert!(s.last_rejection().unwrap().contains("image/gif"));
    }

    #[test]
    fn escaped_file_uri_drop_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my check.png"), b"\x89PNG\r\n\x1a\n").unwrap();
        let line = format!("file://{}/my%20check.png", dir.path().display());

        let (mut s, seen) = surface();
        assert!(s.handle(UploadEvent::Drop(parse_drop_payload(&line))));
        assert!(s.last_rejection().is_none());
        assert_eq!(seen.borrow()[0].name, "my check.png");
    }

    #[test]
    fn drag_state_toggles() {
        let (mut s, _) = surface();
        assert!(!s.is_drag_active());
        s.handle(UploadEvent::DragEnter);
        assert!(s.is_drag_active());
        s.handle(UploadEvent::DragLeave);
        assert!(!s.is_drag_active());
        s.handle(UploadEvent::DragEnter);
        s.handle(UploadEvent::Drop(vec![]));
        assert!(!s.is_drag_active());
    }

    #[test]
    fn parses_terminal_drops() {
        assert_eq!(parse_drop_payload("/tmp/check.png"), vec!["/tmp/check.png"]);
        assert_eq!(
            parse_drop_payload("'/tmp/my check.pdf' /tmp/b.jpg"),
            vec!["/tmp/my check.pdf", "/tmp/b.jpg"]
        );
        assert_eq!(
            parse_drop_payload(r"/tmp/my\ check.webp "),
            vec!["/tmp/my check.webp"]
        );
        assert_eq!(
            parse_drop_payload(r#""/tmp/say \"hi\".png""#),
            vec![r#"/tmp/say "hi".png"#]
        );
        assert_eq!(
            parse_drop_payload("file:///tmp/scan.pdf"),
            vec!["/tmp/scan.pdf"]
        );
        assert_eq!(
            parse_drop_payload("file:///home/u/my%20check%C3%A9.png"),
            vec!["/home/u/my checké.png"]
        );
        assert!(parse_drop_payload("   ").is_empty());
        assert!(parse_drop_payload("''").is_empty());
    }
}
