//! Shared conversation, tool, and error types for Relay.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod util;

pub use error::{ApiError, ConfigError, RelayError, ToolError};
pub use message::*;
pub use provider::{ModelCapabilities, ModelClient};
pub use tool::*;
pub use util::{truncate_chars, truncate_str};
