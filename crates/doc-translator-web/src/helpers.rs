//! Helper types and functions shared by route handlers.

use axum::http::StatusCode;
use doc_translator_core::ErrorKind;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

/// HTTP status for a failed pipeline run.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnsupportedFormat
        | ErrorKind::UnsupportedLanguage
        | ErrorKind::SameLanguage
        | ErrorKind::LanguageMismatchError => StatusCode::BAD_REQUEST,
        ErrorKind::ExtractionError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ClassificationError | ErrorKind::TranslationError => StatusCode::BAD_GATEWAY,
        ErrorKind::RenderError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Make an uploaded file name safe to use as a single path component.
///
/// ASCII alphanumerics, `-`, `_` and `.` are kept, anything else becomes `_`.
/// Leading dots are stripped so the result is never hidden or a parent
/// reference.
pub fn sanitize_filename(name: &str) -> String {
    // Browsers on Windows may send the full client path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_filename("report-2024_v2.pdf"), "report-2024_v2.pdf");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my essay (final).docx"), "my_essay__final_.docx");
        assert_eq!(sanitize_filename("résumé.pdf"), "r_sum_.pdf");
    }

    #[test]
    fn test_sanitize_strips_paths_and_dots() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\lesson.docx"), "lesson.docx");
        assert_eq!(sanitize_filename(".hidden.pdf"), "hidden.pdf");
        assert_eq!(sanitize_filename(".."), "document");
        assert_eq!(sanitize_filename(""), "document");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::SameLanguage), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::LanguageMismatchError), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::ExtractionError), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::TranslationError), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::RenderError), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
