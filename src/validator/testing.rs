//! Test doubles for the validator

use async_trait::async_trait;
use std::sync::Mutex;

use crate::validator::{ShaderStage, Validator, ValidatorError};

/// Validator returning a canned log and recording every call
pub struct MockValidator {
    log: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockValidator {
    pub fn new(log: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(uri, text)` pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Validator for MockValidator {
    async fn validate(&self, uri: &str, text: &str) -> Result<String, ValidatorError> {
        ShaderStage::classify(uri)?;
        self.calls
            .lock()
            .unwrap()
            .push((uri.to_string(), text.to_string()));
        Ok(self.log.clone())
    }
}
