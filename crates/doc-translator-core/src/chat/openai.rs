use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::traits::{ChatClient, ChatRequest, ClientInfo};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Longest wait honoured from a `Retry-After` header, in seconds
const MAX_RATE_LIMIT_WAIT_SECS: u64 = 10;

/// Longest error body kept in [`Error::ApiStatus`]
const MAX_ERROR_BODY_CHARS: usize = 300;

/// OpenAI-compatible chat-completion client.
/// Works with: OpenAI, llama.cpp server, Ollama, DeepSeek, etc.
pub struct OpenAiChatClient {
    client: Client,
    /// Base URL for the API (e.g., "https://api.openai.com/v1")
    pub api_base: String,
    api_key: Option<String>,
    /// Per-attempt HTTP timeout
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only
    pub max_retries: u32,
    /// Base delay between retries in milliseconds, doubled per attempt
    pub retry_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatClient {
    /// Create a client from the backend configuration.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ApiRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            timeout,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// Delay before the retry that follows `attempt` (1-based).
    fn backoff(&self, attempt: u32, error: &Error) -> Duration {
        if let Error::ApiRateLimited { retry_after: Some(secs) } = error {
            return Duration::from_secs((*secs).min(MAX_RATE_LIMIT_WAIT_SECS));
        }
        let factor = 1_u64 << attempt.saturating_sub(1).min(6);
        Duration::from_millis(self.retry_delay_ms.saturating_mul(factor))
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, request: &ChatRequest) -> Result<String> {
        let url = self.endpoint();
        let body = CompletionRequest {
            model: &request.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let attempts = self.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "Chat completion attempt {}/{} to {} (model {})",
                attempt, attempts, url, request.model
            );

            match self.send_once(&url, &body).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.backoff(attempt, &e);
                    warn!("Attempt {} failed: {}; retrying in {:?}", attempt, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Chat completion failed after {} attempt(s): {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, url: &str, body: &CompletionRequest<'_>) -> Result<String> {
        let mut req = self.client.post(url).json(body);

        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::ApiTimeout(self.timeout)
            } else {
                Error::ApiRequest(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(Error::ApiRateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::ApiUnauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(Error::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::ApiTimeout(self.timeout)
            } else {
                Error::ApiInvalidResponse(e.to_string())
            }
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::ApiInvalidResponse("no choices in response".to_string()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(Error::ApiInvalidResponse(
                "completion blocked by content filter".to_string(),
            ));
        }

        choice
            .message
            .content
            .ok_or_else(|| Error::ApiInvalidResponse("choice has no content".to_string()))
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    fn info(&self) -> ClientInfo {
        ClientInfo {
            name: "OpenAI Compatible",
            configured: true,
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.request_with_retry(request).await
    }
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(retry_delay_ms: u64) -> OpenAiChatClient {
        let config = LlmConfig {
            retry_delay_ms,
            ..LlmConfig::new("http://localhost:8080/v1/", Some("sk-secret".into()), "m")
        };
        OpenAiChatClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_trims_slash() {
        assert_eq!(client(10).endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_backoff_doubles() {
        let c = client(100);
        let err = Error::ApiRequest("reset".into());
        assert_eq!(c.backoff(1, &err), Duration::from_millis(100));
        assert_eq!(c.backoff(2, &err), Duration::from_millis(200));
        assert_eq!(c.backoff(3, &err), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_honours_retry_after_with_cap() {
        let c = client(100);
        let short = Error::ApiRateLimited { retry_after: Some(2) };
        let long = Error::ApiRateLimited { retry_after: Some(600) };
        assert_eq!(c.backoff(1, &short), Duration::from_secs(2));
        assert_eq!(c.backoff(1, &long), Duration::from_secs(MAX_RATE_LIMIT_WAIT_SECS));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", client(10));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: [
                Message { role: "system", content: "sys" },
                Message { role: "user", content: "hi" },
            ],
            temperature: 0.1,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 10);
    }
}
