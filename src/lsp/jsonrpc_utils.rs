//! JSON-RPC 2.0 protocol utilities
//!
//! Provides constants and response builders for the JSON-RPC 2.0 protocol
//! as per https://www.jsonrpc.org/specification

use crate::lsp::types::{JsonRpcError, JsonRpcNotification, JsonRpcResponse, OutgoingMessage};
use serde_json::Value;

// ============================================================================
// JSON-RPC 2.0 Constants
// ============================================================================

/// JSON-RPC 2.0 version identifier
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 and LSP error codes
/// https://www.jsonrpc.org/specification#error_object
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server.
    pub const PARSE_ERROR: i32 = -32700;

    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// LSP: a request arrived before the `initialize` handshake.
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
}

// ============================================================================
// JSON-RPC Response Builders
// ============================================================================

/// Create a successful JSON-RPC response
pub fn success_response(id: Value, result: Value) -> OutgoingMessage {
    OutgoingMessage::Response(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result: Some(result),
        error: None,
    })
}

/// Create a JSON-RPC error response
pub fn error_response(id: Value, code: i32, message: String) -> OutgoingMessage {
    OutgoingMessage::Response(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message,
            data: None,
        }),
    })
}

/// Create a null success response (for requests that return void)
pub fn null_success_response(id: Value) -> OutgoingMessage {
    success_response(id, Value::Null)
}

/// Create a server-to-client notification
pub fn notification(method: &str, params: Value) -> OutgoingMessage {
    OutgoingMessage::Notification(JsonRpcNotification {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: method.to_string(),
        params: Some(params),
    })
}
