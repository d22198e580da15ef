//! Text extraction for uploaded documents (PDF, DOCX, plain text).
//!
//! Handlers supply bytes plus the declared content type; this module returns
//! plain UTF-8 text or a typed error. PDF output is whitespace-normalized
//! (line endings to `\n`, runs collapsed to single spaces, trimmed); DOCX and
//! plain text are passed through as extracted. A zero-length result is never
//! treated as success — every path rejects empty output with
//! [`ApiError::EmptyExtraction`].

use std::io::Read;

use crate::error::ApiError;

/// MIME types accepted for upload.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TXT: &str = "text/plain";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Returns true if the declared content type is in the allowed set.
///
/// Exported so the ingress handler can reject unsupported uploads before
/// staging any bytes to disk. A `text/plain; charset=utf-8` label matches
/// the plain-text type.
pub fn is_supported(content_type: &str) -> bool {
    matches!(base_type(content_type), MIME_PDF | MIME_DOCX | MIME_TXT)
}

/// Strips any MIME parameters (`; charset=...`) from a content-type label.
fn base_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Extracts plain text from uploaded bytes. Dispatch is by declared content
/// type; anything outside the allowed set fails before parsing is attempted.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ApiError> {
    let text = match base_type(content_type) {
        MIME_PDF => extract_pdf(bytes)?,
        MIME_DOCX => extract_docx(bytes)?,
        MIME_TXT => extract_plain(bytes)?,
        other => return Err(ApiError::UnsupportedFormat(other.to_string())),
    };
    if text.trim().is_empty() {
        return Err(ApiError::EmptyExtraction);
    }
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ApiError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ApiError::ExtractionFailed(format!("PDF: {}", e)))?;
    Ok(normalize_whitespace(&raw))
}

/// Collapses raw extracted text into a single normalized line: CRLF/CR
/// become `\n`, then every whitespace run becomes one space, then the
/// result is trimmed.
pub fn normalize_whitespace(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut in_run = false;
    for ch in unified.chars() {
        if ch.is_whitespace() {
            in_run = true;
        } else {
            if in_run && !out.is_empty() {
                out.push(' ');
            }
            in_run = false;
            out.push(ch);
        }
    }
    out
}

fn extract_plain(bytes: &[u8]) -> Result<String, ApiError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ApiError::ExtractionFailed(format!("text file is not valid UTF-8: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ApiError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ApiError::ExtractionFailed(format!("DOCX: {}", e)))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ApiError::ExtractionFailed("DOCX: word/document.xml not found".to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ApiError::ExtractionFailed(format!("DOCX: {}", e)))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ApiError::ExtractionFailed(
            "DOCX: word/document.xml exceeds size limit".to_string(),
        ));
    }
    collect_text_runs(&doc_xml)
}

/// Walks `word/document.xml` collecting the text of every `w:t` element.
/// Paragraph boundaries (`w:p`) become newlines so the result reads like
/// the document body.
fn collect_text_runs(xml: &[u8]) -> Result<String, ApiError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        if !out.ends_with('\n') && !out.is_empty() {
                            out.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ApiError::ExtractionFailed(format!("DOCX XML: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
