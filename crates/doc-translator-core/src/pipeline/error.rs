use serde::Serialize;
use std::fmt;

use crate::error::Error;
use crate::language::supported_language_names;

/// Closed set of failure categories a pipeline run can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    UnsupportedLanguage,
    SameLanguage,
    ExtractionError,
    ClassificationError,
    LanguageMismatchError,
    TranslationError,
    RenderError,
}

impl ErrorKind {
    pub const ALL: [Self; 8] = [
        Self::UnsupportedFormat,
        Self::UnsupportedLanguage,
        Self::SameLanguage,
        Self::ExtractionError,
        Self::ClassificationError,
        Self::LanguageMismatchError,
        Self::TranslationError,
        Self::RenderError,
    ];

    /// Stable identifier for logs and JSON.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::UnsupportedLanguage => "unsupported_language",
            Self::SameLanguage => "same_language",
            Self::ExtractionError => "extraction_error",
            Self::ClassificationError => "classification_error",
            Self::LanguageMismatchError => "language_mismatch_error",
            Self::TranslationError => "translation_error",
            Self::RenderError => "render_error",
        }
    }

    /// Whether the same request may succeed if simply tried again.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ClassificationError | Self::TranslationError)
    }

    /// Whether the failure was caused by the request itself (file or
    /// language choice) rather than by the service.
    pub const fn is_user_error(self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat
                | Self::UnsupportedLanguage
                | Self::SameLanguage
                | Self::ExtractionError
                | Self::LanguageMismatchError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure of a pipeline run, safe to show to end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineError {
    pub kind: ErrorKind,
    /// User-facing message
    pub message: String,
    /// Underlying cause, for logs only
    #[serde(skip)]
    pub detail: Option<String>,
    /// Declared source language (mismatch only)
    pub expected: Option<String>,
    /// Language the classifier reported (mismatch only)
    pub detected: Option<String>,
}

impl PipelineError {
    /// Error of `kind` with its standard message.
    pub fn new(kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::UnsupportedFormat => {
                "Invalid file type. Please upload a PDF or DOCX file.".to_string()
            }
            ErrorKind::UnsupportedLanguage => format!(
                "Unsupported language. Please choose one of: {}.",
                supported_language_names()
            ),
            ErrorKind::SameLanguage => {
                "Source and target languages cannot be the same.".to_string()
            }
            ErrorKind::ExtractionError => "No text could be extracted from the document. \
                 The file may be empty or corrupted."
                .to_string(),
            ErrorKind::ClassificationError => "Could not detect the language of the document. \
                 Please try again in a moment."
                .to_string(),
            ErrorKind::LanguageMismatchError => "Document language mismatch. \
                 Please select the correct source language."
                .to_string(),
            ErrorKind::TranslationError => {
                "Translation failed. Please try again in a moment.".to_string()
            }
            ErrorKind::RenderError => {
                "Failed to generate the translated PDF. Please try again.".to_string()
            }
        };

        Self {
            kind,
            message,
            detail: None,
            expected: None,
            detected: None,
        }
    }

    /// Error of `kind` caused by `source`.
    pub fn from_error(kind: ErrorKind, source: &Error) -> Self {
        let mut err = Self::new(kind).with_detail(source.to_string());
        if matches!(source, Error::ApiKeyMissing)
            && matches!(kind, ErrorKind::ClassificationError | ErrorKind::TranslationError)
        {
            err.message = "The translation service is not configured. \
                           Please contact the administrator."
                .to_string();
        }
        err
    }

    /// Detected language does not agree with the declared one.
    pub fn language_mismatch(expected: impl Into<String>, detected: impl Into<String>) -> Self {
        let expected = expected.into();
        let detected = detected.into();
        Self {
            message: format!(
                "Document language mismatch. Expected {expected}, but detected {detected}. \
                 Please select the correct source language."
            ),
            expected: Some(expected),
            detected: Some(detected),
            ..Self::new(ErrorKind::LanguageMismatchError)
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PipelineError {}
