//! The remote language-model boundary.
//!
//! Everything the pipeline asks of a language model goes through
//! [`ChatClient::complete`]. The client is built once from configuration and
//! injected into the pipeline; when no API key is configured the injected
//! client is an [`UnconfiguredChatClient`] that fails every call with
//! [`Error::ApiKeyMissing`].

mod openai;
mod traits;

pub use openai::OpenAiChatClient;
pub use traits::{ChatClient, ChatRequest, ClientInfo};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Create a chat client from configuration
pub fn create_chat_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>> {
    let has_key = config
        .api_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());

    if !has_key {
        tracing::warn!("No language model API key configured; translations will fail");
        return Ok(Arc::new(UnconfiguredChatClient));
    }

    Ok(Arc::new(OpenAiChatClient::new(config)?))
}

/// Stand-in client used when no API key is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredChatClient;

#[async_trait]
impl ChatClient for UnconfiguredChatClient {
    fn info(&self) -> ClientInfo {
        ClientInfo {
            name: "unconfigured",
            configured: false,
        }
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        Err(Error::ApiKeyMissing)
    }
}

/// Run one completion under an overall deadline (retries included).
pub async fn complete_within(
    client: &dyn ChatClient,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<String> {
    tokio::time::timeout(deadline, client.complete(request))
        .await
        .map_err(|_| Error::ApiTimeout(deadline))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".into(),
            system: "s".into(),
            user: "u".into(),
            temperature: 0.0,
            max_tokens: 1,
        }
    }

    #[tokio::test]
    async fn test_missing_key_yields_unconfigured_client() {
        let client = create_chat_client(&LlmConfig::default()).unwrap();
        assert!(!client.is_configured());
        let result = client.complete(&request()).await;
        assert!(matches!(result, Err(Error::ApiKeyMissing)));
    }

    #[tokio::test]
    async fn test_blank_key_counts_as_missing() {
        let config = LlmConfig::new("http://localhost:1/v1", Some("  ".into()), "m");
        let client = create_chat_client(&config).unwrap();
        assert_eq!(client.name(), "unconfigured");
    }

    #[tokio::test]
    async fn test_key_yields_openai_client() {
        let config = LlmConfig::new("http://localhost:1/v1", Some("sk-test".into()), "m");
        let client = create_chat_client(&config).unwrap();
        assert!(client.is_configured());
        assert_eq!(client.name(), "OpenAI Compatible");
    }

    struct SlowClient;

    #[async_trait]
    impl ChatClient for SlowClient {
        fn info(&self) -> ClientInfo {
            ClientInfo { name: "slow", configured: true }
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn test_complete_within_deadline() {
        let deadline = Duration::from_millis(50);
        let result = complete_within(&SlowClient, &request(), deadline).await;
        assert!(matches!(result, Err(Error::ApiTimeout(d)) if d == deadline));
    }
}
