//! Error types for the server
//!
//! [`DispatchError`] covers protocol-level failures that become JSON-RPC error
//! responses. [`ServerError`] covers transport failures that end a session.

use serde_json::Value;

use crate::lsp::OutgoingMessage;
use crate::lsp::jsonrpc_utils::{error_codes, error_response};

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Failures answered with a JSON-RPC error response
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Framing failure or a body that is not a JSON-RPC message
    #[error("Couldn't parse message.")]
    Parse,

    #[error("Server not yet initialized.")]
    NotInitialized,

    #[error("Method '{0}' not supported.")]
    MethodNotSupported(String),

    #[error("Invalid params for '{method}': {reason}")]
    InvalidParams { method: String, reason: String },

    #[error("Internal error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DispatchError {
    pub fn invalid_params(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// JSON-RPC/LSP error code
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::Parse => error_codes::PARSE_ERROR,
            DispatchError::NotInitialized => error_codes::SERVER_NOT_INITIALIZED,
            DispatchError::MethodNotSupported(_) => error_codes::METHOD_NOT_FOUND,
            DispatchError::InvalidParams { .. } => error_codes::INVALID_PARAMS,
            DispatchError::Serialization(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn into_response(self, id: Value) -> OutgoingMessage {
        error_response(id, self.code(), self.to_string())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Failures that terminate a session
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize outgoing message: {0}")]
    Serialization(#[from] serde_json::Error),
}
