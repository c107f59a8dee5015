//! LSP server
//!
//! - **Dispatcher**: routes messages, enforces the initialize handshake
//! - **Context**: per-session workspace and options passed to every dispatch
//! - **Transports**: stdio stream loop and HTTP endpoint

pub mod capabilities;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod stdio;

pub use context::ServerContext;
pub use dispatcher::Dispatcher;
pub use http::{HttpState, serve_http};
pub use stdio::serve_stdio;
