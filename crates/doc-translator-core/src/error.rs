use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::document::DocumentFormat;
use crate::language::Language;

/// Unified error type for doc-translator-core
///
/// Every stage of the pipeline reports failures through this enum:
/// - Input validation (format, languages)
/// - Text extraction (PDF, DOCX)
/// - Remote language-model calls (requests, responses, rate limiting)
/// - Language classification and translation
/// - PDF rendering
/// - Configuration and general I/O
///
/// The pipeline boundary folds these into a [`crate::PipelineError`].
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// File extension or declared format is not PDF/DOCX
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Language is not one of the supported set
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Source and target language are identical
    #[error("source and target language are both {0}")]
    SameLanguage(Language),

    // ==========================================================================
    // Extraction Errors
    // ==========================================================================
    /// Failed to open or parse the input document
    #[error("failed to read {format} document: {reason}")]
    Extraction {
        format: DocumentFormat,
        reason: String,
    },

    /// The document parsed, but held no text
    #[error("no text could be extracted from the document")]
    EmptyDocument,

    // ==========================================================================
    // Language Model API Errors
    // ==========================================================================
    /// No API key configured for the language-model service
    #[error("language model API key not configured")]
    ApiKeyMissing,

    /// Request could not be sent or the connection failed
    #[error("language model request failed: {0}")]
    ApiRequest(String),

    /// API answered with a non-success status
    #[error("language model API returned HTTP {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// API rejected the credentials
    #[error("language model API rejected the credentials (HTTP {status})")]
    ApiUnauthorized { status: u16 },

    /// Rate limited by the API
    #[error("language model rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    ApiRateLimited { retry_after: Option<u64> },

    /// Response body could not be understood
    #[error("invalid language model response: {0}")]
    ApiInvalidResponse(String),

    /// Call did not finish within the configured deadline
    #[error("language model request timed out after {}s", .0.as_secs())]
    ApiTimeout(Duration),

    // ==========================================================================
    // Classification Errors
    // ==========================================================================
    /// Classifier answered with nothing usable
    #[error("language classifier returned an unusable answer: {0:?}")]
    UnrecognizedLanguage(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Text handed to the translator was empty or whitespace
    #[error("no text to translate")]
    NothingToTranslate,

    /// Translator answered with an empty completion
    #[error("language model returned an empty translation")]
    EmptyTranslation,

    // ==========================================================================
    // Render Errors
    // ==========================================================================
    /// Failed to lay out or build the output PDF
    #[error("failed to render PDF: {0}")]
    Render(String),

    /// Failed to write the output PDF
    #[error("failed to save PDF to {}: {reason}", path.display())]
    RenderSave { path: PathBuf, reason: String },

    /// Failed to load the configured TrueType font
    #[error("failed to load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a remote call that failed with this error may succeed if
    /// attempted again (network hiccups, overload, rate limiting).
    ///
    /// Authentication failures, rejected requests (content policy, bad
    /// parameters) and malformed responses are never retried.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::ApiRequest(_) | Self::ApiRateLimited { .. } | Self::ApiTimeout(_) => true,
            Self::ApiStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
