//! The closed set of languages documents can be translated from and into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A supported document language.
///
/// Identified on the wire and in forms by its lowercase key (`"english"`),
/// and shown to users and language models by its display name (`"English"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    French,
    Arabic,
    Swahili,
    Kinyarwanda,
}

impl Language {
    /// Every supported language, in UI order.
    pub const ALL: [Self; 5] = [
        Self::English,
        Self::French,
        Self::Arabic,
        Self::Swahili,
        Self::Kinyarwanda,
    ];

    /// Lowercase identifier used in forms, configs and comparisons.
    pub const fn key(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::French => "french",
            Self::Arabic => "arabic",
            Self::Swahili => "swahili",
            Self::Kinyarwanda => "kinyarwanda",
        }
    }

    /// Human-readable name used in prompts and messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::French => "French",
            Self::Arabic => "Arabic",
            Self::Swahili => "Swahili",
            Self::Kinyarwanda => "Kinyarwanda",
        }
    }

    /// Look a language up by key or display name, ignoring case and
    /// surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.key().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| Error::UnsupportedLanguage(s.trim().to_string()))
    }
}

/// A language option for UI dropdowns
#[derive(Debug, Clone)]
pub struct LanguageOption {
    /// Form value (e.g., "english")
    pub key: &'static str,
    /// Display name (e.g., "English")
    pub name: &'static str,
}

/// Languages offered as both source and target.
pub fn languages() -> Vec<LanguageOption> {
    Language::ALL
        .into_iter()
        .map(|lang| LanguageOption {
            key: lang.key(),
            name: lang.display_name(),
        })
        .collect()
}

/// Comma-separated display names, for help texts and error messages.
pub fn supported_language_names() -> String {
    Language::ALL
        .iter()
        .map(|lang| lang.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}
