//! Conversation traces: everything needed to replay a model call later.

pub mod error;
pub mod store;
pub mod types;

pub use error::TraceError;
pub use store::TraceStore;
pub use types::Trace;
