//! Language Server Protocol wire layer
//!
//! - **Framing**: Content-Length message framing, incoming and outgoing
//! - **Types**: JSON-RPC 2.0 message shapes
//! - **JSON-RPC utils**: error codes and response builders

pub mod framing;
pub mod jsonrpc_utils;
pub mod types;

pub use framing::{FramingError, LspCodec, MessageFramer, RawMessage};
pub use types::OutgoingMessage;
