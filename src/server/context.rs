//! Per-session server state
//!
//! Everything a dispatch may read or mutate is reachable from
//! [`ServerContext`], which the transport passes into every call.

use crate::config::ServerOptions;
use crate::workspace::Workspace;

#[derive(Debug, Default)]
pub struct ServerContext {
    pub workspace: Workspace,
    pub options: ServerOptions,
    exit_requested: bool,
}

impl ServerContext {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            workspace: Workspace::new(),
            options,
            exit_requested: false,
        }
    }

    /// Set once the client sent `exit`
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }
}
