//! Server configuration
//!
//! Collects the command-line and environment settings that shape a server
//! session: which transport to serve and which validator executable to run.

use std::env;

use crate::validator::glslang::DEFAULT_GLSLANG_PATH;

/// Default port for the HTTP transport
pub const DEFAULT_PORT: u16 = 61313;

/// Default bind address for the HTTP transport
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Environment variable naming the glslangValidator executable
pub const GLSLANG_PATH_ENV: &str = "GLSLANG_VALIDATOR_PATH";

/// How the server talks to its client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Framed messages on stdin, replies on stdout
    Stdio,
    /// One framed message per HTTP POST
    Http { host: String, port: u16 },
}

impl TransportMode {
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        TransportMode::Http {
            host: host.into(),
            port,
        }
    }

    /// Socket address to bind, for transports that listen
    pub fn bind_address(&self) -> Option<String> {
        match self {
            TransportMode::Stdio => None,
            TransportMode::Http { host, port } => Some(format!("{host}:{port}")),
        }
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::http(DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Options for one server session
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Log message headers, bodies and raw validator output
    pub verbose: bool,

    /// Path to the glslangValidator executable
    pub glslang_path: String,

    pub transport: TransportMode,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            glslang_path: DEFAULT_GLSLANG_PATH.to_string(),
            transport: TransportMode::default(),
        }
    }
}

/// Resolve the validator path from CLI args and environment
pub fn resolve_glslang_path(glslang_path_arg: Option<String>) -> String {
    // Priority: CLI arg > GLSLANG_VALIDATOR_PATH env var > "glslangValidator" default
    glslang_path_arg
        .or_else(|| env::var(GLSLANG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_GLSLANG_PATH.to_string())
}
