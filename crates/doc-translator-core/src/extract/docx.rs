//! DOCX text extraction.
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml`:
//! ```xml
//! <w:document>
//!   <w:body>
//!     <w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world.</w:t></w:r></w:p>
//!     <w:p/>
//!   </w:body>
//! </w:document>
//! ```
//! Every `<w:p>` is a paragraph whose text is the concatenation of its
//! `<w:t>` runs.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::document::DocumentFormat;
use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";

fn docx_error(reason: impl Into<String>) -> Error {
    Error::Extraction {
        format: DocumentFormat::Docx,
        reason: reason.into(),
    }
}

/// Extract the paragraphs of a DOCX file in document order, joined with
/// newlines. Blank paragraphs are dropped.
pub fn extract_docx(path: &Path) -> Result<String> {
    let file =
        File::open(path).map_err(|e| super::read_failure(DocumentFormat::Docx, path, &e))?;

    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| docx_error(format!("not a valid DOCX archive: {e}")))?;

    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| docx_error(format!("missing {DOCUMENT_PART}: {e}")))?;

    let paragraphs = parse_document_xml(BufReader::new(part))?;
    tracing::debug!("Extracted {} DOCX paragraphs", paragraphs.len());

    let text = paragraphs
        .iter()
        .map(|p| p.trim_end())
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text.trim().to_string())
}

/// Parse `word/document.xml`, returning one string per paragraph (blank
/// paragraphs included).
pub fn parse_document_xml<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut xml_reader = Reader::from_reader(reader);
    let mut buf = Vec::new();

    let mut paragraphs: Vec<String> = Vec::new();
    // Paragraphs can nest (text boxes inside a run). Each takes its slot when
    // it opens, so an outer paragraph precedes the ones nested in it.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    open.pop();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" => push_text(&mut paragraphs, &open, "\t"),
                b"br" | b"cr" => push_text(&mut paragraphs, &open, "\n"),
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| docx_error(format!("bad text in {DOCUMENT_PART}: {e}")))?;
                push_text(&mut paragraphs, &open, &text);
            }
            Ok(Event::CData(ref t)) if in_text => {
                push_text(&mut paragraphs, &open, &String::from_utf8_lossy(t));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(docx_error(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    xml_reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// Append to the innermost open paragraph; text outside any is ignored.
fn push_text(paragraphs: &mut [String], open: &[usize], text: &str) {
    if let Some(paragraph) = open.last().and_then(|&i| paragraphs.get_mut(i)) {
        paragraph.push_str(text);
    }
}
