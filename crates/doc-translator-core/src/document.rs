//! Data flowing through one pipeline run: the uploaded input, the text
//! extracted from it, the translation, and the generated artifact.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::language::Language;

/// Suffix appended to the input file stem to name the artifact.
pub const ARTIFACT_SUFFIX: &str = "_translated";

/// Input document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Parse a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(Error::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("PDF"),
            Self::Docx => f.write_str("DOCX"),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s)
    }
}

/// Who is responsible for the input file once a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputOwnership {
    /// The file is a temporary upload; the pipeline removes it when the run
    /// ends, whatever the outcome.
    #[default]
    Temporary,
    /// The file belongs to the caller and is never touched.
    Caller,
}

/// A document handed to the pipeline for one run.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub source: Language,
    pub target: Language,
    pub ownership: InputOwnership,
    /// Directory the artifact is written into
    pub output_dir: PathBuf,
}

impl UploadedDocument {
    /// A temporary upload the pipeline takes ownership of.
    pub fn temporary(
        path: impl Into<PathBuf>,
        format: DocumentFormat,
        source: Language,
        target: Language,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            path: path.into(),
            format,
            source,
            target,
            ownership: InputOwnership::Temporary,
            output_dir: output_dir.into(),
        }
    }

    /// A caller-owned file that must survive the run.
    pub fn caller_owned(
        path: impl Into<PathBuf>,
        format: DocumentFormat,
        source: Language,
        target: Language,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ownership: InputOwnership::Caller,
            ..Self::temporary(path, format, source, target, output_dir)
        }
    }

    /// Where the artifact for this document is written:
    /// `<output_dir>/<input stem>_translated.pdf`.
    pub fn artifact_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document");
        self.output_dir
            .join(format!("{stem}{ARTIFACT_SUFFIX}.{}", ArtifactFormat::Pdf.extension()))
    }
}

/// Plain text pulled out of a document. Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Wrap extracted text, trimming it and rejecting blank content.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyDocument);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Text returned by the translator, in the target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedText(String);

impl TranslatedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-blank paragraphs, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.0
            .lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Output formats the renderer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Pdf,
}

impl ArtifactFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
        }
    }
}

/// The generated document. Ownership of the file passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationArtifact {
    pub path: PathBuf,
    pub format: ArtifactFormat,
}

impl TranslationArtifact {
    /// File name component of the artifact path.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}
