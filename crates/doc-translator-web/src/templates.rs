//! Askama templates for the upload and result pages.
//!
//! - `base.html` - Common layout and styles
//! - `index.html` - Upload form with language selects and error banner
//! - `success.html` - Download link for a finished translation

use askama::Template;
use askama_web::WebTemplate;
use doc_translator_core::{Language, LanguageOption, languages};

/// Landing page with upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub languages: Vec<LanguageOption>,
    /// Message of the last failed attempt
    pub error: Option<String>,
    /// Keys to preselect, so a failed form keeps the user's choices
    pub selected_source: String,
    pub selected_target: String,
}

impl IndexTemplate {
    pub fn new() -> Self {
        Self {
            languages: languages(),
            error: None,
            selected_source: Language::English.key().to_string(),
            selected_target: Language::French.key().to_string(),
        }
    }

    /// The form re-rendered after a failure.
    pub fn with_error(error: impl Into<String>, source: Option<&str>, target: Option<&str>) -> Self {
        let defaults = Self::new();
        Self {
            error: Some(error.into()),
            selected_source: source.map_or(defaults.selected_source, |s| s.trim().to_lowercase()),
            selected_target: target.map_or(defaults.selected_target, |t| t.trim().to_lowercase()),
            languages: defaults.languages,
        }
    }
}

impl Default for IndexTemplate {
    fn default() -> Self {
        Self::new()
    }
}

/// Result page with the download link.
#[derive(Template, WebTemplate)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub id: String,
    pub filename: String,
}

impl SuccessTemplate {
    /// URL of the download route for this artifact.
    pub fn download_url(&self) -> String {
        format!("/download/{}/{}", self.id, urlencoding::encode(&self.filename))
    }
}
