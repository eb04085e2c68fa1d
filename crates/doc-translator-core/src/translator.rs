use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::chat::{ChatClient, ChatRequest, complete_within};
use crate::config::LlmConfig;
use crate::document::TranslatedText;
use crate::error::{Error, Result};
use crate::language::Language;

const TRANSLATION_SYSTEM_PROMPT: &str = "You are a professional translator specializing in educational documents with high accuracy.";

/// Translates whole documents with a chat-completion call.
pub struct DocumentTranslator {
    client: Arc<dyn ChatClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    deadline: Duration,
}

impl DocumentTranslator {
    pub fn new(client: Arc<dyn ChatClient>, llm: &LlmConfig) -> Self {
        Self {
            client,
            model: llm.model.clone(),
            temperature: llm.translation_temperature,
            max_tokens: llm.translation_max_tokens,
            deadline: llm.request_timeout(),
        }
    }

    /// Create translation prompt
    fn create_prompt(text: &str, source: Language, target: Language) -> String {
        format!(
            "You are a professional translator for educational documents.\n\n\
             Translate the following text from {source} to {target}.\n\
             - Keep the meaning exact and accurate with high precision.\n\
             - Use clear and natural language suitable for students.\n\
             - Maintain any academic or technical terms as precisely as possible.\n\
             - Preserve formatting and structure.\n\
             - Do not add explanations, only output the translated text.\n\n\
             Text to translate:\n{text}",
            source = source.display_name(),
            target = target.display_name(),
        )
    }

    /// Build the translation request without sending it.
    pub fn build_request(&self, text: &str, source: Language, target: Language) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            system: TRANSLATION_SYSTEM_PROMPT.to_string(),
            user: Self::create_prompt(text, source, target),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Translate `text` from `source` into `target`.
    ///
    /// Blank input is rejected before any remote call; a blank completion is
    /// an error too.
    pub async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<TranslatedText> {
        if text.trim().is_empty() {
            return Err(Error::NothingToTranslate);
        }

        let request = self.build_request(text, source, target);
        let translated = complete_within(self.client.as_ref(), &request, self.deadline).await?;
        let translated = translated.trim();

        if translated.is_empty() {
            return Err(Error::EmptyTranslation);
        }

        debug!(
            "Translated {} chars {} -> {} into {} chars",
            text.len(),
            source,
            target,
            translated.len()
        );
        Ok(TranslatedText::new(translated))
    }
}
