use async_trait::async_trait;

use crate::error::Result;

/// Information about a chat-completion backend
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether the backend can actually serve requests
    pub configured: bool,
}

/// One chat-completion call: a system instruction, a user instruction and
/// the sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for language-model backends
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Get information about this client
    fn info(&self) -> ClientInfo;

    /// Get the client name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Send one request and return the text of the first completion.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Check if the client can serve requests (e.g., API key configured)
    fn is_configured(&self) -> bool {
        self.info().configured
    }
}
