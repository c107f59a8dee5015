//! Shader validation
//!
//! The validator is an opaque collaborator: given a document identifier and
//! its text it returns the compiler's info log. Which shader stage to compile
//! for is derived from the identifier's extension.

pub mod glslang;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use std::path::Path;

pub use glslang::GlslangValidator;

/// Error types for validation
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    /// The document's kind could not be determined from its identifier
    #[error("Cannot determine shader stage for '{uri}'")]
    Unclassifiable { uri: String },

    #[error("Failed to run validator '{command}': {source}")]
    Execution {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Shader pipeline stage, as understood by glslang's `-S` option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Classify a document by the extension of its identifier
    pub fn classify(uri: &str) -> Result<Self, ValidatorError> {
        let extension = Path::new(uri)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "vert" | "vs" => Ok(ShaderStage::Vertex),
            "tesc" => Ok(ShaderStage::TessControl),
            "tese" => Ok(ShaderStage::TessEvaluation),
            "geom" | "gs" => Ok(ShaderStage::Geometry),
            "frag" | "fs" => Ok(ShaderStage::Fragment),
            "comp" => Ok(ShaderStage::Compute),
            _ => Err(ValidatorError::Unclassifiable {
                uri: uri.to_string(),
            }),
        }
    }

    /// Stage name accepted by `glslangValidator -S`
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::TessControl => "tesc",
            ShaderStage::TessEvaluation => "tese",
            ShaderStage::Geometry => "geom",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
        }
    }
}

/// Produces a validator log for a document
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validate `text` and return the raw info log
    async fn validate(&self, uri: &str, text: &str) -> Result<String, ValidatorError>;
}
