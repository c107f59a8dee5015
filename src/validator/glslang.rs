//! glslangValidator process wrapper
//!
//! Runs `glslangValidator --stdin -S <stage>` once per validation, feeding the
//! document through stdin and collecting the info log from its output.
//!
//! The standalone front end names the piped source (`ERROR: stdin:3: ...`).
//! Locations are rewritten to the single-string form `ERROR: 0:3: ...` before
//! the log is returned.

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::validator::{ShaderStage, Validator, ValidatorError};

/// Default executable name, looked up on PATH
pub const DEFAULT_GLSLANG_PATH: &str = "glslangValidator";

#[derive(Debug, Clone)]
pub struct GlslangValidator {
    /// Path to the glslangValidator executable
    command: String,
    /// `<severity>: <source name>:<line>: ` at the start of a log line
    location: Regex,
}

impl GlslangValidator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            location: Regex::new(r"(?m)^(?P<prefix>\s*[^\s:]+: )[^\s:]+:(?P<line>\d+): ")
                .expect("Failed to compile glslang location regex"),
        }
    }

    /// Rewrite named source locations to string index 0
    pub fn normalize_log(&self, log: &str) -> String {
        self.location
            .replace_all(log, "${prefix}0:${line}: ")
            .into_owned()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn execution_error(&self, source: std::io::Error) -> ValidatorError {
        ValidatorError::Execution {
            command: self.command.clone(),
            source,
        }
    }
}

#[async_trait]
impl Validator for GlslangValidator {
    async fn validate(&self, uri: &str, text: &str) -> Result<String, ValidatorError> {
        let stage = ShaderStage::classify(uri)?;
        debug!(
            "Validating {} as {} shader with {}",
            uri,
            stage.as_str(),
            self.command
        );

        let mut child = Command::new(&self.command)
            .args(["--stdin", "-S", stage.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.execution_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| self.execution_error(e))?;
            // Dropping stdin closes the pipe so the validator sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.execution_error(e))?;

        // A failing exit status is the normal outcome for a shader with errors
        trace!("{} exited with {}", self.command, output.status);

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(self.normalize_log(&log))
    }
}
