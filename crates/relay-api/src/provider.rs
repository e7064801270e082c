//! `ModelClient` implementation backed by [`ApiClient`].

use crate::client::ApiClient;
use crate::retry::RetryConfig;
use crate::wire::CompletionRequest;
use relay_types::{ApiError, ChatRequest, ModelCapabilities, ModelClient, ModelResponse};
use std::future::Future;
use std::pin::Pin;

/// OpenAI-compatible model client.
///
/// OpenAI-compatible servers may return `reasoning_content`, so both
/// capabilities are on by default. A server without function calling is
/// declared with [`OpenAiClient::with_capabilities`].
#[derive(Clone)]
pub struct OpenAiClient {
    client: ApiClient,
    capabilities: ModelCapabilities,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::from_client(ApiClient::new(api_key, base_url)?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self {
            client,
            capabilities: ModelCapabilities {
                tool_calls: true,
                reasoning: true,
            },
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.client = self.client.with_retry_config(config);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ModelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl ModelClient for OpenAiClient {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let body = CompletionRequest::new(request, self.capabilities.tool_calls);
            self.client.create_chat_completion(&body).await
        })
    }

    fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_supports_tools_and_reasoning() {
        let client = OpenAiClient::new("test-key", "https://api.openai.com/v1").unwrap();
        assert_eq!(client.name(), "openai");
        assert!(client.capabilities().tool_calls);
        assert!(client.capabilities().reasoning);
    }

    #[test]
    fn declared_capabilities_are_reported() {
        let caps = ModelCapabilities {
            tool_calls: false,
            reasoning: true,
        };
        let client = OpenAiClient::new("EMPTY", "http://localhost:8000/v1")
            .unwrap()
            .with_retry_config(RetryConfig::none())
            .with_capabilities(caps);
        assert_eq!(client.capabilities(), caps);
    }
}
