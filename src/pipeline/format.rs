//! Format detection and raw text extraction.
//!
//! Detection prefers the file extension. Files with no recognized extension
//! are sniffed: a PDF marker anywhere in the leading window wins, then a
//! JSON parse of the window, and anything else is treated as email text.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::MIN_SNIFF_BYTES;
use crate::error::ExtractionError;
use crate::pipeline::types::Format;

/// Marker that identifies PDF content.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Keys searched, in order, for the primary text of a JSON document.
const JSON_TEXT_KEYS: &[&str] = &["body", "text", "content", "message"];

/// An input document. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Document {
    source: Option<PathBuf>,
    format: Format,
    bytes: Vec<u8>,
}

impl Document {
    /// Read a file from disk and detect its format.
    pub fn load(path: &Path, sniff_bytes: usize) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let format = detect_from(Some(path), &bytes[..sniff_len(bytes.len(), sniff_bytes)]);
        debug!(path = %path.display(), format = %format, "Detected document format");
        Ok(Self {
            source: Some(path.to_path_buf()),
            format,
            bytes,
        })
    }

    /// Wrap an uploaded byte stream. `file_name` supplies the extension hint.
    pub fn from_bytes(bytes: Vec<u8>, file_name: Option<&str>, sniff_bytes: usize) -> Self {
        let format = detect_from(
            file_name.map(Path::new),
            &bytes[..sniff_len(bytes.len(), sniff_bytes)],
        );
        Self {
            source: file_name.map(PathBuf::from),
            format,
            bytes,
        }
    }

    /// Raw email text supplied directly. Format is always `Email`.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            source: None,
            format: Format::Email,
            bytes: text.into().into_bytes(),
        }
    }

    /// Override the detected format, for callers that already know it.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File name used as the routing identifier.
    pub fn file_name(&self) -> Option<String> {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Extract the text payload according to the detected format.
    pub fn extract_text(&self) -> Result<String, ExtractionError> {
        match self.format {
            Format::Json => {
                let value: Value = serde_json::from_slice(&self.bytes)?;
                Ok(primary_json_text(&value))
            }
            Format::Pdf => extract_pdf_text(&self.bytes),
            Format::Email | Format::Unknown => {
                Ok(String::from_utf8_lossy(&self.bytes).into_owned())
            }
        }
    }

    /// Raw content decoded as text, used when format-specific extraction fails.
    pub fn lossy_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Detect the format of a file on disk without reading all of it.
pub fn detect_format(path: &Path, sniff_bytes: usize) -> Result<Format, ExtractionError> {
    if let Some(format) = Format::from_extension(path) {
        return Ok(format);
    }
    let limit = sniff_bytes.max(MIN_SNIFF_BYTES) as u64;
    let mut window = Vec::new();
    File::open(path)?.take(limit).read_to_end(&mut window)?;
    Ok(detect_from(Some(path), &window))
}

/// Extension first, then the content window.
fn detect_from(name: Option<&Path>, window: &[u8]) -> Format {
    name.and_then(Format::from_extension).unwrap_or_else(|| sniff_format(window))
}

/// Length of the sniff window for a document of `len` bytes.
fn sniff_len(len: usize, sniff_bytes: usize) -> usize {
    len.min(sniff_bytes.max(MIN_SNIFF_BYTES))
}

/// Infer a format from the leading bytes of a document.
pub fn sniff_format(window: &[u8]) -> Format {
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Format::Pdf;
    }
    if looks_like_json(window) {
        return Format::Json;
    }
    Format::Email
}

/// A window counts as JSON if it parses, or if it opens an object/array
/// and only fails because the window cut the document short.
fn looks_like_json(window: &[u8]) -> bool {
    let text = String::from_utf8_lossy(window);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(_) => true,
        Err(e) => {
            e.is_eof()
                && window.len() >= MIN_SNIFF_BYTES
                && (trimmed.starts_with('{') || trimmed.starts_with('['))
        }
    }
}

/// Pick the primary text from a decoded JSON document.
///
/// Falls back to the whole document re-serialized when none of the
/// well-known text keys is present.
pub fn primary_json_text(value: &Value) -> String {
    if let Value::Object(map) = value {
        for key in JSON_TEXT_KEYS {
            if let Some(found) = map.get(*key) {
                return match found {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
            }
        }
    }
    value.to_string()
}

/// Concatenate per-page PDF text with newlines.
///
/// Pages without a text layer contribute empty strings.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    let empty = pages.iter().filter(|p| p.trim().is_empty()).count();
    if empty > 0 {
        warn!(pages = pages.len(), empty, "PDF pages without extractable text");
    }
    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::pipeline::test_support::make_test_pdf;

    fn write_temp(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn extension_wins_without_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        // Content says PDF, extension says JSON: extension wins.
        let path = write_temp(&dir, "event.json", b"%PDF-1.4 not really");
        assert_eq!(detect_format(&path, 2048).unwrap(), Format::Json);

        let path = write_temp(&dir, "mail.eml", b"{\"event\": \"x\"}");
        assert_eq!(detect_format(&path, 2048).unwrap(), Format::Email);
    }

    #[test]
    fn sniffs_pdf_magic_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "upload", b"%PDF-1.7\n%binary");
        assert_eq!(detect_format(&path, 2048).unwrap(), Format::Pdf);
    }

    #[test]
    fn sniffs_json_for_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "payload.dat", br#"{"event": "signup"}"#);
        assert_eq!(detect_format(&path, 2048).unwrap(), Format::Json);
    }

    #[test]
    fn sniffs_truncated_json_as_json() {
        let mut big = String::from("{\"event\": \"bulk\", \"items\": [");
        while big.len() < 5000 {
            big.push_str("\"padding-value\",");
        }
        big.push_str("\"end\"]}");
        assert_eq!(sniff_format(&big.as_bytes()[..2048]), Format::Json);
    }

    #[test]
    fn falls_back_to_email() {
        assert_eq!(sniff_format(b"From: a@b.com\nHello there"), Format::Email);
        assert_eq!(sniff_format(b""), Format::Email);
        assert_eq!(sniff_format(b"{ not json"), Format::Email);
    }

    #[test]
    fn nul_bytes_still_fall_back_to_email() {
        assert_eq!(sniff_format(b"\x00\x01\x02blob"), Format::Email);
        assert_eq!(
            sniff_format(b"From: a@b.com\nURGENT: this is not acceptable\x00\n"),
            Format::Email
        );
        assert_eq!(sniff_format(b"\x00%PDF-1.4"), Format::Pdf);
    }

    #[test]
    fn load_and_detect_agree() {
        let dir = tempfile::tempdir().unwrap();
        for (name, bytes) in [
            ("upload", &b"%PDF-1.7\n%binary"[..]),
            ("payload.dat", &br#"{"event": "signup"}"#[..]),
            ("notes", &b"From: a@b.com\x00\nhello"[..]),
            ("event.json", &b"%PDF-1.4 not really"[..]),
        ] {
            let path = write_temp(&dir, name, bytes);
            assert_eq!(
                Document::load(&path, 2048).unwrap().format(),
                detect_format(&path, 2048).unwrap(),
                "{name}"
            );
            assert_eq!(
                Document::from_bytes(bytes.to_vec(), Some(name), 2048).format(),
                detect_format(&path, 2048).unwrap(),
                "{name}"
            );
        }
    }

    #[test]
    fn from_bytes_honours_sniff_window() {
        // PDF marker beyond the minimum window only counts with a wider one.
        let mut bytes = vec![b' '; 3000];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert_eq!(
            Document::from_bytes(bytes.clone(), Some("scan"), 2048).format(),
            Format::Email
        );
        assert_eq!(
            Document::from_bytes(bytes, Some("scan"), 4096).format(),
            Format::Pdf
        );
    }

    #[test]
    fn format_override_replaces_detection() {
        let doc = Document::from_bytes(b"plain words".to_vec(), None, 2048)
            .with_format(Format::Unknown);
        assert_eq!(doc.format(), Format::Unknown);
        assert_eq!(doc.extract_text().unwrap(), "plain words");
    }

    #[test]
    fn unreadable_path_is_an_error() {
        let err = detect_format(Path::new("/nonexistent/docflow/input.bin"), 2048).unwrap_err();
        assert!(matches!(err, ExtractionError::Io(_)));
        let err = Document::load(Path::new("/nonexistent/docflow/input.txt"), 2048).unwrap_err();
        assert!(matches!(err, ExtractionError::Io(_)));
    }

    #[test]
    fn json_text_uses_priority_keys() {
        let value = serde_json::json!({"message": "second", "body": "first"});
        assert_eq!(primary_json_text(&value), "first");

        let value = serde_json::json!({"content": {"nested": true}});
        assert_eq!(primary_json_text(&value), r#"{"nested":true}"#);

        let value = serde_json::json!({"event": "x"});
        assert_eq!(primary_json_text(&value), r#"{"event":"x"}"#);
    }

    #[test]
    fn malformed_json_surfaces_error() {
        let doc = Document::from_bytes(b"{\"event\": ".to_vec(), Some("broken.json"), 2048);
        assert_eq!(doc.format(), Format::Json);
        assert!(matches!(doc.extract_text(), Err(ExtractionError::Json(_))));
        assert_eq!(doc.lossy_text(), "{\"event\": ");
    }

    #[test]
    fn raw_text_is_email() {
        let doc = Document::from_text("hello");
        assert_eq!(doc.format(), Format::Email);
        assert!(doc.source().is_none());
        assert_eq!(doc.extract_text().unwrap(), "hello");
    }

    #[test]
    fn pdf_pages_concatenate() {
        let bytes = make_test_pdf(&["Invoice 42", "Total 100"]);
        let doc = Document::from_bytes(bytes, Some("invoice.pdf"), 2048);
        let text = doc.extract_text().unwrap();
        assert!(text.contains("Invoice"), "got: {text}");
        assert!(text.contains("Total"), "got: {text}");
    }

    #[test]
    fn pdf_with_blank_page_still_extracts() {
        let bytes = make_test_pdf(&["", "GDPR notice"]);
        let text = extract_pdf_text(&bytes).unwrap();
        assert!(text.contains("GDPR"), "got: {text}");
    }

    #[test]
    fn garbage_pdf_is_an_error() {
        assert!(matches!(
            extract_pdf_text(b"%PDF-1.4 garbage"),
            Err(ExtractionError::Pdf(_))
        ));
    }
}
