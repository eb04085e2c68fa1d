//! Language classification of extracted text, and the check of the
//! classifier's verdict against the language the user declared.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::chat::{ChatClient, ChatRequest, complete_within};
use crate::config::{LanguageCheckConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::language::{Language, supported_language_names};
use crate::util::char_prefix;

/// Characters of the document sent to the classifier
pub const DETECTION_SAMPLE_CHARS: usize = 500;

/// Completion budget for the one-word answer
pub const DETECTION_MAX_TOKENS: u32 = 10;

const DETECTION_SYSTEM_PROMPT: &str =
    "You are a language detection expert. Respond with only the language name.";

/// How tolerant the detected-vs-declared comparison is.
///
/// Serialized as `"exact"` or `"prefix:N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MatchPolicy {
    /// Detected label must equal the declared language (ignoring case)
    Exact,
    /// Equal, or the detected label starts with the first N characters of
    /// the declared language
    Prefix(usize),
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::Prefix(3)
    }
}

impl MatchPolicy {
    /// Whether a classifier label counts as the declared language.
    pub fn matches(self, detected: &str, declared: Language) -> bool {
        let detected = detected.trim().to_lowercase();
        let declared = declared.key();

        if detected == declared {
            return true;
        }

        match self {
            Self::Exact => false,
            Self::Prefix(n) => n > 0 && detected.starts_with(char_prefix(declared, n)),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Prefix(n) => write!(f, "prefix:{n}"),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s == "exact" {
            return Ok(Self::Exact);
        }
        if s == "prefix" {
            return Ok(Self::default());
        }
        s.strip_prefix("prefix:")
            .and_then(|n| n.trim().parse().ok())
            .map(Self::Prefix)
            .ok_or_else(|| Error::ConfigInvalid {
                field: "match_policy".to_string(),
                reason: format!("expected \"exact\" or \"prefix:N\", got {s:?}"),
            })
    }
}

impl TryFrom<String> for MatchPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MatchPolicy> for String {
    fn from(policy: MatchPolicy) -> Self {
        policy.to_string()
    }
}

/// The classifier's single best-guess label, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageVerdict {
    label: String,
}

impl LanguageVerdict {
    /// Normalize a raw classifier answer. Fails on an answer with no letters.
    pub fn from_response(raw: &str) -> Result<Self> {
        let label = raw
            .trim()
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();

        if label.is_empty() {
            return Err(Error::UnrecognizedLanguage(raw.to_string()));
        }
        Ok(Self { label })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The supported language named by the label, if any.
    pub fn language(&self) -> Option<Language> {
        Language::from_label(&self.label)
    }

    /// Label for user-facing messages ("English", "Klingon").
    pub fn display_label(&self) -> String {
        self.language().map_or_else(
            || {
                let mut chars = self.label.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            },
            |lang| lang.display_name().to_string(),
        )
    }
}

/// Classifies document language with a chat-completion call.
pub struct LanguageDetector {
    client: Arc<dyn ChatClient>,
    model: String,
    temperature: f32,
    deadline: Duration,
    policy: MatchPolicy,
}

impl LanguageDetector {
    pub fn new(
        client: Arc<dyn ChatClient>,
        llm: &LlmConfig,
        check: &LanguageCheckConfig,
    ) -> Self {
        Self {
            client,
            model: llm.detection_model().to_string(),
            temperature: llm.detection_temperature,
            deadline: llm.request_timeout(),
            policy: check.match_policy,
        }
    }

    pub const fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Build the classification request for a text sample.
    pub fn build_request(&self, text: &str) -> ChatRequest {
        let sample = char_prefix(text, DETECTION_SAMPLE_CHARS);
        let user = format!(
            "Detect the language of the following text. Respond with only one word from these options: {}.\n\nText: {}...",
            supported_language_names(),
            sample
        );

        ChatRequest {
            model: self.model.clone(),
            system: DETECTION_SYSTEM_PROMPT.to_string(),
            user,
            temperature: self.temperature,
            max_tokens: DETECTION_MAX_TOKENS,
        }
    }

    /// Classify the language of `text` from its first
    /// [`DETECTION_SAMPLE_CHARS`] characters.
    pub async fn detect(&self, text: &str) -> Result<LanguageVerdict> {
        let request = self.build_request(text);
        let raw = complete_within(self.client.as_ref(), &request, self.deadline).await?;
        let verdict = LanguageVerdict::from_response(&raw)?;
        debug!("Classifier answered {:?} -> {}", raw, verdict.label());
        Ok(verdict)
    }

    /// Whether the verdict agrees with the declared source language.
    pub fn validate(&self, verdict: &LanguageVerdict, declared: Language) -> bool {
        self.policy.matches(verdict.label(), declared)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chat::ClientInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedClient {
        answer: String,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl FixedClient {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatClient for FixedClient {
        fn info(&self) -> ClientInfo {
            ClientInfo { name: "fixed", configured: true }
        }

        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.answer.clone())
        }
    }

    fn detector(client: Arc<FixedClient>, policy: MatchPolicy) -> LanguageDetector {
        let check = LanguageCheckConfig {
            match_policy: policy,
            strict: true,
        };
        LanguageDetector::new(client, &LlmConfig::default(), &check)
    }

    #[test]
    fn test_prefix_policy() {
        let policy = MatchPolicy::Prefix(3);
        assert!(policy.matches("english", Language::English));
        assert!(policy.matches("English", Language::English));
        assert!(policy.matches("english-like", Language::English));
        assert!(policy.matches("engels", Language::English));
        assert!(!policy.matches("french", Language::English));
        assert!(!policy.matches("en", Language::English));
    }

    #[test]
    fn test_exact_policy() {
        let policy = MatchPolicy::Exact;
        assert!(policy.matches(" KINYARWANDA ", Language::Kinyarwanda));
        assert!(!policy.matches("english-like", Language::English));
    }

    #[test]
    fn test_policy_parse_round_trip() {
        assert_eq!("exact".parse::<MatchPolicy>().unwrap(), MatchPolicy::Exact);
        assert_eq!("prefix".parse::<MatchPolicy>().unwrap(), MatchPolicy::Prefix(3));
        assert_eq!("Prefix:5".parse::<MatchPolicy>().unwrap(), MatchPolicy::Prefix(5));
        assert_eq!(MatchPolicy::Prefix(4).to_string(), "prefix:4");
        assert!("fuzzy".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn test_verdict_normalization() {
        let verdict = LanguageVerdict::from_response("  French.\n").unwrap();
        assert_eq!(verdict.label(), "french");
        assert_eq!(verdict.language(), Some(Language::French));

        let verdict = LanguageVerdict::from_response("\"klingon\"").unwrap();
        assert_eq!(verdict.language(), None);
        assert_eq!(verdict.display_label(), "Klingon");

        assert!(matches!(
            LanguageVerdict::from_response(" ... "),
            Err(Error::UnrecognizedLanguage(_))
        ));
    }

    #[test]
    fn test_request_uses_bounded_sample() {
        let client = FixedClient::new("English");
        let detector = detector(client, MatchPolicy::default());
        let text = "a".repeat(2_000);

        let request = detector.build_request(&text);
        assert_eq!(request.max_tokens, DETECTION_MAX_TOKENS);
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
        assert!(request.user.contains(&"a".repeat(DETECTION_SAMPLE_CHARS)));
        assert!(!request.user.contains(&"a".repeat(DETECTION_SAMPLE_CHARS + 1)));
        assert!(request.user.contains("English, French, Arabic, Swahili, Kinyarwanda"));
    }

    #[tokio::test]
    async fn test_detect_and_validate() {
        let client = FixedClient::new("Swahili");
        let detector = detector(Arc::clone(&client), MatchPolicy::default());

        let verdict = detector.detect("Habari ya asubuhi").await.unwrap();
        assert!(detector.validate(&verdict, Language::Swahili));
        assert!(!detector.validate(&verdict, Language::English));
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }
}
