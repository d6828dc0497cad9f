//! DOCX text extraction.
//!
//! A .docx file is a ZIP archive whose body lives in `word/document.xml`.
//! The walk keeps text runs, paragraph ends, line breaks and tabs; all
//! other markup is dropped.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::ZipArchive;

use super::ExtractionError;

pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Container(format!("Not a valid DOCX archive: {e}")))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Container(format!("word/document.xml missing: {e}")))?
        .read_to_string(&mut document_xml)
        .map_err(|e| ExtractionError::Container(format!("Could not read document body: {e}")))?;

    let text = flatten_document_xml(&document_xml)?;
    debug!(chars = text.len(), "DOCX text extracted");
    Ok(text)
}

/// Walk the WordprocessingML event stream and flatten it to plain text.
///
/// `<w:t>` content is kept; `</w:p>` becomes a newline so paragraphs stay
/// separated; `<w:br/>` and `<w:cr/>` become newlines; `<w:tab/>` becomes
/// a tab.
fn flatten_document_xml(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:tab" => text.push('\t'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let decoded = t.unescape().map_err(|e| {
                    ExtractionError::Container(format!("Malformed document XML: {e}"))
                })?;
                text.push_str(&decoded);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractionError::Container(format!(
                    "Malformed document XML: {e}"
                )))
            }
        }
    }

    Ok(text)
}
