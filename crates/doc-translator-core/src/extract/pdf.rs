use std::path::Path;

use mupdf::{Document as MuDocument, TextPageOptions};

use crate::document::DocumentFormat;
use crate::error::{Error, Result};

fn pdf_error(reason: impl Into<String>) -> Error {
    Error::Extraction {
        format: DocumentFormat::Pdf,
        reason: reason.into(),
    }
}

/// Extract text from every page of a PDF, in page order.
///
/// Each text line of a page becomes one line of output; pages are separated
/// by a newline and the whole result is trimmed.
pub fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| super::read_failure(DocumentFormat::Pdf, path, &e))?;
    extract_pdf_bytes(&bytes)
}

pub(crate) fn extract_pdf_bytes(bytes: &[u8]) -> Result<String> {
    let doc = MuDocument::from_bytes(bytes, "")
        .map_err(|e| pdf_error(format!("failed to parse PDF: {e}")))?;

    if doc.needs_password().unwrap_or(false) {
        return Err(pdf_error("document is encrypted"));
    }

    let page_count = doc
        .page_count()
        .map_err(|e| pdf_error(format!("failed to get page count: {e}")))?;

    let mut text = String::new();
    for page_index in 0..page_count {
        let page = doc
            .load_page(page_index)
            .map_err(|e| pdf_error(format!("failed to load page {}: {e}", page_index + 1)))?;

        let text_page = page.to_text_page(TextPageOptions::empty()).map_err(|e| {
            pdf_error(format!("failed to get text of page {}: {e}", page_index + 1))
        })?;

        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line.chars().filter_map(|c| c.char()).collect();
                let line_text = line_text.trim_end();
                if !line_text.is_empty() {
                    text.push_str(line_text);
                    text.push('\n');
                }
            }
        }
        text.push('\n');
    }

    tracing::debug!("Extracted {} chars from {} PDF pages", text.len(), page_count);
    Ok(text.trim().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_bytes() {
        let result = extract_pdf_bytes(&[0, 1, 2, 3]);
        assert!(matches!(
            result,
            Err(Error::Extraction { format: DocumentFormat::Pdf, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = extract_pdf(Path::new("/nonexistent/input.pdf"));
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }
}
