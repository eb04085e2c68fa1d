use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::detect::MatchPolicy;
use crate::error::{Error, Result};

/// Environment prefix for configuration overrides
/// (e.g. `DOC_TRANSLATOR__LLM__MODEL=gpt-4o`).
pub const ENV_PREFIX: &str = "DOC_TRANSLATOR";

/// Language-model backend configuration for OpenAI-compatible APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for translation (and detection unless overridden)
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for language detection
    #[serde(default)]
    pub detection_model: Option<String>,
    /// Deadline for each remote call, retries included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries after the first attempt, for transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries, doubled after every attempt
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_translation_max_tokens")]
    pub translation_max_tokens: u32,
    #[serde(default = "default_translation_temperature")]
    pub translation_temperature: f32,
    #[serde(default = "default_detection_temperature")]
    pub detection_temperature: f32,
}

impl LlmConfig {
    /// Create a config for the given endpoint, keeping every other default.
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            ..Self::default()
        }
    }

    /// Model used for language detection.
    pub fn detection_model(&self) -> &str {
        self.detection_model.as_deref().unwrap_or(&self.model)
    }

    pub const fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

const fn default_translation_max_tokens() -> u32 {
    4000
}

const fn default_translation_temperature() -> f32 {
    0.2
}

const fn default_detection_temperature() -> f32 {
    0.1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            detection_model: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            translation_max_tokens: default_translation_max_tokens(),
            translation_temperature: default_translation_temperature(),
            detection_temperature: default_detection_temperature(),
        }
    }
}

/// How the detected language is checked against the declared source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageCheckConfig {
    #[serde(default)]
    pub match_policy: MatchPolicy,
    /// Fail the run on a mismatch (otherwise only warn and continue)
    #[serde(default = "default_true")]
    pub strict: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for LanguageCheckConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            strict: true,
        }
    }
}

/// Output PDF layout. All lengths are in PDF points (1/72 inch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// TrueType font to embed; the standard Helvetica font is used when unset
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Line height as a multiple of the font size
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default = "default_margin")]
    pub margin: f32,
    /// Vertical space after each paragraph
    #[serde(default = "default_paragraph_spacing")]
    pub paragraph_spacing: f32,
    #[serde(default = "default_page_width")]
    pub page_width: f32,
    #[serde(default = "default_page_height")]
    pub page_height: f32,
}

const fn default_font_size() -> f32 {
    11.0
}

const fn default_line_height() -> f32 {
    1.25
}

const fn default_margin() -> f32 {
    72.0
}

const fn default_paragraph_spacing() -> f32 {
    14.4
}

// US Letter
const fn default_page_width() -> f32 {
    612.0
}

const fn default_page_height() -> f32 {
    792.0
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: default_font_size(),
            line_height: default_line_height(),
            margin: default_margin(),
            paragraph_spacing: default_paragraph_spacing(),
            page_width: default_page_width(),
            page_height: default_page_height(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Detected-vs-declared language check
    #[serde(default)]
    pub language_check: LanguageCheckConfig,

    /// Output PDF layout
    #[serde(default)]
    pub render: RenderConfig,

    /// Directory translated documents are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("translations")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            language_check: LanguageCheckConfig::default(),
            render: RenderConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations, lowest precedence first:
    /// built-in defaults, `~/.config/doc-translator/config.toml`,
    /// `./config.toml`, then `DOC_TRANSLATOR__*` environment variables.
    pub fn load() -> Result<Self> {
        let mut files = Vec::new();
        if let Some(config_dir) = crate::util::config_dir() {
            files.push(config_dir.join("doc-translator").join("config.toml"));
        }
        files.push(PathBuf::from("config.toml"));
        Self::load_layered(&files)
    }

    /// Layer the given TOML files (missing ones are skipped) and the
    /// environment over the defaults.
    pub fn load_layered(files: &[PathBuf]) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| Error::ConfigLoad(format!("Failed to seed defaults: {e}")))?;

        let mut builder = config::Config::builder().add_source(defaults);
        for file in files {
            if file.exists() {
                tracing::debug!("Loading config from {}", file.display());
            }
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.llm.request_timeout_secs == 0 {
            return Err(invalid("llm.request_timeout_secs", "must be at least 1"));
        }
        if self.llm.translation_max_tokens == 0 {
            return Err(invalid("llm.translation_max_tokens", "must be at least 1"));
        }
        if let MatchPolicy::Prefix(0) = self.language_check.match_policy {
            return Err(invalid(
                "language_check.match_policy",
                "prefix length must be at least 1",
            ));
        }

        let render = &self.render;
        if render.font_size <= 0.0 {
            return Err(invalid("render.font_size", "must be positive"));
        }
        if render.line_height < 1.0 {
            return Err(invalid("render.line_height", "must be at least 1.0"));
        }
        if render.margin < 0.0
            || render.page_width - 2.0 * render.margin < render.font_size * 4.0
            || render.page_height - 2.0 * render.margin < render.font_size * render.line_height
        {
            return Err(invalid("render.margin", "leaves no room for text on the page"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::ConfigInvalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
