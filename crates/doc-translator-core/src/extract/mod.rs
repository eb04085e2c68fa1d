//! Plain-text extraction from uploaded documents.
//!
//! Each format module turns a file into a list of text units (pages for PDF,
//! paragraphs for DOCX). Units are joined with newlines and the result is
//! trimmed; a document with nothing but whitespace is an
//! [`Error::EmptyDocument`].

mod docx;
mod pdf;

pub use docx::{extract_docx, parse_document_xml};
pub use pdf::extract_pdf;

use std::path::{Path, PathBuf};

use crate::document::{DocumentFormat, ExtractedText};
use crate::error::{Error, Result};

/// Extract the text of `path`, parsed as `format`.
///
/// Reads the file and nothing else.
pub fn extract_text(path: impl AsRef<Path>, format: DocumentFormat) -> Result<ExtractedText> {
    let path = path.as_ref();
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(path)?,
        DocumentFormat::Docx => extract_docx(path)?,
    };
    ExtractedText::new(text)
}

/// [`extract_text`] on the blocking thread pool.
pub async fn extract_text_blocking(path: PathBuf, format: DocumentFormat) -> Result<ExtractedText> {
    tokio::task::spawn_blocking(move || extract_text(&path, format))
        .await
        .map_err(|e| Error::Extraction {
            format,
            reason: format!("extraction task failed: {e}"),
        })?
}

pub(crate) fn read_failure(format: DocumentFormat, path: &Path, e: &std::io::Error) -> Error {
    Error::Extraction {
        format,
        reason: format!("failed to read {}: {e}", path.display()),
    }
}
