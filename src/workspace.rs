//! In-memory workspace
//!
//! Holds the documents the client has opened and whether the initialize
//! handshake happened. Pure data: no I/O and no protocol gating.

use std::collections::BTreeMap;
use tracing::debug;

/// An open document; the latest write wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Workspace {
    initialized: bool,
    documents: BTreeMap<String, Document>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Insert a document, replacing any existing text under the same URI
    pub fn add_document(&mut self, uri: impl Into<String>, text: impl Into<String>) {
        let uri = uri.into();
        debug!("Workspace: adding document {}", uri);
        self.documents.insert(
            uri.clone(),
            Document {
                uri,
                text: text.into(),
            },
        );
    }

    /// Replace the text of an existing document.
    ///
    /// Returns false without touching the workspace if `uri` is not open.
    pub fn change_document(&mut self, uri: &str, text: impl Into<String>) -> bool {
        match self.documents.get_mut(uri) {
            Some(document) => {
                document.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Forget a document, returning it if it was open
    pub fn remove_document(&mut self, uri: &str) -> Option<Document> {
        self.documents.remove(uri)
    }

    #[cfg(test)]
    pub fn document(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    #[cfg(test)]
    pub fn documents(&self) -> &BTreeMap<String, Document> {
        &self.documents
    }
}
