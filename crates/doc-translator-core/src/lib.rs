//! Document Translator Core Library
//!
//! Translates uploaded PDF and DOCX documents into a new PDF:
//! - Plain-text extraction (MuPDF for PDF, `word/document.xml` for DOCX)
//! - Language detection checked against the declared source language
//! - Translation via OpenAI-compatible chat-completion APIs
//! - Paginated PDF rendering of the translation
//!
//! [`Pipeline`] sequences the stages and turns every failure into a
//! [`PipelineError`] with a user-facing message.

pub mod chat;
pub mod config;
pub mod detect;
pub mod document;
pub mod error;
pub mod extract;
pub mod language;
pub mod pipeline;
pub mod render;
pub mod translator;
pub mod util;

pub use chat::{
    ChatClient, ChatRequest, ClientInfo, OpenAiChatClient, UnconfiguredChatClient,
    create_chat_client,
};
pub use config::{AppConfig, LanguageCheckConfig, LlmConfig, RenderConfig};
pub use detect::{LanguageDetector, LanguageVerdict, MatchPolicy};
pub use document::{
    ArtifactFormat, DocumentFormat, ExtractedText, InputOwnership, TranslatedText,
    TranslationArtifact, UploadedDocument,
};
pub use error::{Error, Result};
pub use extract::extract_text;
pub use language::{Language, LanguageOption, languages, supported_language_names};
pub use pipeline::{ErrorKind, Pipeline, PipelineError, Stage};
pub use render::{PdfFont, PdfRenderer};
pub use translator::DocumentTranslator;
