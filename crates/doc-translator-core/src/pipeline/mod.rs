//! The translation pipeline: extract → validate language → translate → render.
//!
//! One [`Pipeline`] is built at startup and shared by every request. Runs
//! hold no shared mutable state, so any number may proceed concurrently.
//!
//! ```text
//! Received → Extracted → Validated → Translated → Rendered → Complete
//!     └──────────┴───────────┴────────────┴───────────┴──→ PipelineError
//! ```

mod error;

pub use error::{ErrorKind, PipelineError};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chat::{ChatClient, ClientInfo, create_chat_client};
use crate::config::AppConfig;
use crate::detect::LanguageDetector;
use crate::document::{
    ArtifactFormat, DocumentFormat, InputOwnership, TranslationArtifact, UploadedDocument,
};
use crate::error::{Error, Result};
use crate::extract::extract_text_blocking;
use crate::language::Language;
use crate::render::PdfRenderer;
use crate::translator::DocumentTranslator;
use crate::util::remove_file_quietly;

/// States of a run, reported to progress callbacks as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Received,
    Extracted,
    Validated,
    Translated,
    Rendered,
    Complete,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::Validated => "validated",
            Self::Translated => "translated",
            Self::Rendered => "rendered",
            Self::Complete => "complete",
        }
    }

    /// What the pipeline does after entering this state.
    pub const fn activity(self) -> &'static str {
        match self {
            Self::Received => "Extracting text",
            Self::Extracted => "Detecting language",
            Self::Validated => "Translating",
            Self::Translated => "Rendering PDF",
            Self::Rendered => "Finishing",
            Self::Complete => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes a temporary input file when dropped.
///
/// Covers every way a run can end, including the run's future being dropped
/// mid-flight.
struct InputGuard<'a> {
    path: &'a Path,
    ownership: InputOwnership,
}

impl<'a> InputGuard<'a> {
    const fn new(path: &'a Path, ownership: InputOwnership) -> Self {
        Self { path, ownership }
    }
}

impl Drop for InputGuard<'_> {
    fn drop(&mut self) {
        if self.ownership == InputOwnership::Temporary {
            remove_file_quietly(self.path);
        }
    }
}

/// Document translation pipeline
pub struct Pipeline {
    client: Arc<dyn ChatClient>,
    detector: LanguageDetector,
    translator: DocumentTranslator,
    renderer: PdfRenderer,
    config: AppConfig,
}

impl Pipeline {
    /// Create a pipeline around an existing chat client.
    pub fn new(config: AppConfig, client: Arc<dyn ChatClient>) -> Result<Self> {
        config.validate()?;
        let detector = LanguageDetector::new(client.clone(), &config.llm, &config.language_check);
        let translator = DocumentTranslator::new(client.clone(), &config.llm);
        let renderer = PdfRenderer::new(&config.render)?;

        Ok(Self {
            client,
            detector,
            translator,
            renderer,
            config,
        })
    }

    /// Create a pipeline with the chat client described by the configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let client = create_chat_client(&config.llm)?;
        Self::new(config, client)
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client_info(&self) -> ClientInfo {
        self.client.info()
    }

    /// Translate one document.
    pub async fn run(
        &self,
        document: UploadedDocument,
    ) -> std::result::Result<TranslationArtifact, PipelineError> {
        self.run_with_progress(document, &|_| {}).await
    }

    /// Translate one document, reporting each state as it is entered.
    pub async fn run_with_progress(
        &self,
        document: UploadedDocument,
        progress: &(dyn Fn(Stage) + Sync),
    ) -> std::result::Result<TranslationArtifact, PipelineError> {
        let _guard = InputGuard::new(&document.path, document.ownership);

        let result = self.execute(&document, progress).await;
        match &result {
            Ok(artifact) => info!(
                "Translated {} ({} -> {}) into {}",
                document.path.display(),
                document.source,
                document.target,
                artifact.path.display()
            ),
            Err(e) => error!(
                "Pipeline failed for {}: {} ({})",
                document.path.display(),
                e.kind,
                e.detail.as_deref().unwrap_or(&e.message)
            ),
        }
        result
    }

    /// Entry point for callers holding untyped request values: a temporary
    /// upload at `path`, the declared format and two language keys or names.
    ///
    /// The artifact goes to the configured output directory and the file is
    /// removed whatever the outcome.
    pub async fn run_raw(
        &self,
        path: impl Into<PathBuf>,
        format: &str,
        source: &str,
        target: &str,
    ) -> std::result::Result<TranslationArtifact, PipelineError> {
        let output_dir = self.config.output_dir.clone();
        self.run_raw_into(path, format, source, target, output_dir)
            .await
    }

    /// Like [`Pipeline::run_raw`], writing the artifact into `output_dir`.
    pub async fn run_raw_into(
        &self,
        path: impl Into<PathBuf>,
        format: &str,
        source: &str,
        target: &str,
        output_dir: impl Into<PathBuf>,
    ) -> std::result::Result<TranslationArtifact, PipelineError> {
        let path = path.into();
        let document = match Self::parse_raw(&path, format, source, target, output_dir.into()) {
            Ok(document) => document,
            Err(e) => {
                remove_file_quietly(&path);
                warn!("Rejected request for {}: {}", path.display(), e.kind);
                return Err(e);
            }
        };
        self.run(document).await
    }

    fn parse_raw(
        path: &Path,
        format: &str,
        source: &str,
        target: &str,
        output_dir: PathBuf,
    ) -> std::result::Result<UploadedDocument, PipelineError> {
        let format: DocumentFormat = format
            .parse()
            .map_err(|e| PipelineError::from_error(ErrorKind::UnsupportedFormat, &e))?;
        let source: Language = source
            .parse()
            .map_err(|e| PipelineError::from_error(ErrorKind::UnsupportedLanguage, &e))?;
        let target: Language = target
            .parse()
            .map_err(|e| PipelineError::from_error(ErrorKind::UnsupportedLanguage, &e))?;

        Ok(UploadedDocument::temporary(
            path, format, source, target, output_dir,
        ))
    }

    /// Checks that need no I/O and no remote call.
    ///
    /// The declared format is trusted; an input path without a pdf or docx
    /// extension (a temporary upload, say) is fine, but one naming the other
    /// format is rejected.
    fn check_request(document: &UploadedDocument) -> std::result::Result<(), PipelineError> {
        if let Ok(actual) = DocumentFormat::from_path(&document.path)
            && actual != document.format
        {
            return Err(PipelineError::new(ErrorKind::UnsupportedFormat).with_detail(format!(
                "declared {} but {} has a {} extension",
                document.format,
                document.path.display(),
                actual
            )));
        }

        if document.source == document.target {
            return Err(PipelineError::from_error(
                ErrorKind::SameLanguage,
                &Error::SameLanguage(document.source),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        document: &UploadedDocument,
        progress: &(dyn Fn(Stage) + Sync),
    ) -> std::result::Result<TranslationArtifact, PipelineError> {
        progress(Stage::Received);
        Self::check_request(document)?;
        info!(
            "Processing {} ({}, {} -> {})",
            document.path.display(),
            document.format,
            document.source,
            document.target
        );

        let text = extract_text_blocking(document.path.clone(), document.format)
            .await
            .map_err(|e| PipelineError::from_error(ErrorKind::ExtractionError, &e))?;
        info!("Extracted {} chars", text.as_str().len());
        progress(Stage::Extracted);

        let verdict = self
            .detector
            .detect(text.as_str())
            .await
            .map_err(|e| PipelineError::from_error(ErrorKind::ClassificationError, &e))?;

        if !self.detector.validate(&verdict, document.source) {
            let expected = document.source.display_name();
            let detected = verdict.display_label();
            if self.config.language_check.strict {
                return Err(PipelineError::language_mismatch(expected, detected).with_detail(
                    format!(
                        "classifier said {:?}, policy {}",
                        verdict.label(),
                        self.detector.policy()
                    ),
                ));
            }
            warn!(
                "Declared {} but detected {}; continuing (lenient language check)",
                expected, detected
            );
        } else {
            info!("Language check passed ({})", verdict.label());
        }
        progress(Stage::Validated);

        let translated = self
            .translator
            .translate(text.as_str(), document.source, document.target)
            .await
            .map_err(|e| PipelineError::from_error(ErrorKind::TranslationError, &e))?;
        info!("Translation complete ({} chars)", translated.as_str().len());
        progress(Stage::Translated);

        let path = document.artifact_path();
        self.renderer
            .render_blocking(translated, path.clone())
            .await
            .map_err(|e| PipelineError::from_error(ErrorKind::RenderError, &e))?;
        progress(Stage::Rendered);

        let artifact = TranslationArtifact {
            path,
            format: ArtifactFormat::Pdf,
        };
        progress(Stage::Complete);
        Ok(artifact)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chat::UnconfiguredChatClient;

    fn document(path: &Path, format: DocumentFormat, source: Language, target: Language) -> UploadedDocument {
        UploadedDocument::caller_owned(path, format, source, target, "out")
    }

    #[test]
    fn test_check_rejects_extension_mismatch() {
        let doc = document(
            Path::new("report.pdf"),
            DocumentFormat::Docx,
            Language::English,
            Language::French,
        );
        let err = Pipeline::check_request(&doc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_check_trusts_declared_format_without_known_extension() {
        for name in ["upload.bin", ".tmpAbC12", "scan"] {
            let doc = document(
                Path::new(name),
                DocumentFormat::Pdf,
                Language::English,
                Language::French,
            );
            assert!(Pipeline::check_request(&doc).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_check_rejects_same_language() {
        let doc = document(
            Path::new("report.pdf"),
            DocumentFormat::Pdf,
            Language::Arabic,
            Language::Arabic,
        );
        let err = Pipeline::check_request(&doc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SameLanguage);
    }

    #[test]
    fn test_guard_only_removes_temporary_input() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.pdf");
        let removed = dir.path().join("removed.pdf");
        std::fs::write(&kept, b"x").unwrap();
        std::fs::write(&removed, b"x").unwrap();

        drop(InputGuard::new(&kept, InputOwnership::Caller));
        drop(InputGuard::new(&removed, InputOwnership::Temporary));

        assert!(kept.exists());
        assert!(!removed.exists());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.llm.request_timeout_secs = 0;
        assert!(Pipeline::new(config, Arc::new(UnconfiguredChatClient)).is_err());
    }

    #[tokio::test]
    async fn test_run_raw_rejects_unknown_language_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("doc.pdf");
        std::fs::write(&upload, b"%PDF-1.5").unwrap();

        let pipeline = Pipeline::new(AppConfig::default(), Arc::new(UnconfiguredChatClient)).unwrap();
        let err = pipeline
            .run_raw(&upload, "pdf", "english", "german")
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnsupportedLanguage);
        assert!(!upload.exists());
    }
}
