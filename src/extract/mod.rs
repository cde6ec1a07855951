//! Text extraction from uploaded files
//!
//! Extraction is keyed on the MIME type the uploader declared, not on file
//! extension sniffing. Parsing failures are deterministic, so nothing here
//! retries.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// MIME type of a PDF document
pub const MIME_PDF: &str = "application/pdf";
/// MIME type of a DOCX document
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// MIME type of a plain text file
pub const MIME_TXT: &str = "text/plain";

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Docx,
    Txt,
}

impl FileFormat {
    /// Resolve a declared MIME type to a supported format
    pub fn from_mime(mime_type: &str) -> Result<Self> {
        match mime_type {
            MIME_PDF => Ok(Self::Pdf),
            MIME_DOCX => Ok(Self::Docx),
            MIME_TXT => Ok(Self::Txt),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    /// Whether a MIME type can be ingested at all; used to reject uploads
    /// before any bytes are stored
    pub fn is_supported(mime_type: &str) -> bool {
        Self::from_mime(mime_type).is_ok()
    }
}

/// Extract plain text from raw file bytes
///
/// Returns an empty string for empty-but-valid input; the caller decides
/// whether that is fatal. Pure function of its input: identical bytes and
/// MIME type always yield identical text.
pub fn extract_text(data: &[u8], mime_type: &str) -> Result<String> {
    let text = match FileFormat::from_mime(mime_type)? {
        FileFormat::Pdf => extract_pdf(data)?,
        FileFormat::Docx => extract_docx(data)?,
        FileFormat::Txt => String::from_utf8_lossy(data).into_owned(),
    };
    // Null bytes from broken encoders upset downstream storage
    Ok(text.replace('\0', ""))
}

/// Extract text from a PDF, falling back to page-level extraction when the
/// primary extractor chokes on unusual font encodings
fn extract_pdf(data: &[u8]) -> Result<String> {
    match pdf_extract::extract_text_from_mem(data) {
        Ok(text) => Ok(text),
        Err(primary_err) => {
            tracing::warn!("pdf-extract failed: {}, trying lopdf fallback", primary_err);
            extract_pdf_fallback(data).map_err(|_| Error::extraction("pdf", primary_err))
        }
    }
}

fn extract_pdf_fallback(data: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(data).map_err(|e| Error::extraction("pdf", e))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .map_err(|e| Error::extraction("pdf", e))
}

/// Extract text from a DOCX by walking `word/document.xml`
fn extract_docx(data: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| Error::extraction("docx", e))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::extraction("docx", e))?
        .read_to_string(&mut document_xml)
        .map_err(|e| Error::extraction("docx", e))?;

    let mut reader = Reader::from_str(&document_xml);
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let fragment = t.unescape().map_err(|e| Error::extraction("docx", e))?;
                text.push_str(&fragment);
            }
            // Paragraph ends become line breaks so chunk boundaries stay sane
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => text.push('\n'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => text.push('\t'),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::extraction("docx", e)),
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(body_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer
                .write_all(
                    format!(
                        r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
                    )
                    .as_bytes(),
                )
                .unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn txt_passes_through() {
        let text = extract_text(b"hello world", MIME_TXT).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn empty_txt_is_empty_not_error() {
        let text = extract_text(b"", MIME_TXT).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn extraction_is_deterministic() {
        let data = b"The same bytes. Twice.";
        let first = extract_text(data, MIME_TXT).unwrap();
        let second = extract_text(data, MIME_TXT).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unsupported_mime_rejected() {
        let err = extract_text(b"x", "application/msword").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!FileFormat::is_supported("image/png"));
    }

    #[test]
    fn corrupt_pdf_reports_extraction_failure() {
        let err = extract_text(b"not a pdf at all", MIME_PDF).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let data = docx_bytes(
            "<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p><w:p><w:r><w:t>Second paragraph.</w:t></w:r></w:p>",
        );
        let text = extract_text(&data, MIME_DOCX).unwrap();
        assert_eq!(text, "First paragraph.\nSecond paragraph.\n");
    }

    #[test]
    fn corrupt_docx_reports_extraction_failure() {
        let err = extract_text(b"PK\x03\x04 garbage", MIME_DOCX).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }
}
