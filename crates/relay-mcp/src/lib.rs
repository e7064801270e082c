//! MCP tool-server bridge for Relay.
//!
//! Tool servers are child processes speaking newline-delimited JSON-RPC 2.0
//! over stdin/stdout. The [`Supervisor`] starts them lazily and serializes
//! access per server, the [`ToolRegistry`] snapshots every discovered tool
//! with its owning server, and [`schema`] translates between tool-protocol
//! descriptions and chat-completion function schemas.

pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod manager;
pub mod registry;
pub mod schema;
pub mod supervisor;
mod transport;

#[cfg(test)]
mod testing;

pub use config::{McpConfig, McpServerConfig};
pub use error::McpError;
pub use manager::McpManager;
pub use registry::{NameConflict, RegisteredTool, ToolRegistry};
pub use supervisor::{ServerStatus, Supervisor};
