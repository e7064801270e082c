//! OpenAI-compatible chat-completion client for Relay.

mod client;
mod provider;
mod retry;
mod wire;

pub use client::ApiClient;
pub use provider::OpenAiClient;
pub use retry::RetryConfig;
