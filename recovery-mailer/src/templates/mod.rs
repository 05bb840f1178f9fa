pub(crate) mod engine;
mod otp_templates;

pub use engine::{AskamaTemplateEngine, TemplateEngine};
pub use otp_templates::{ResetOtpHtmlTemplate, ResetOtpTextTemplate, TemplateContext};

use crate::MailerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Loosely typed values handed to a named template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateData {
    pub data: HashMap<String, serde_json::Value>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, MailerError> {
        self.data
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub(crate) fn require_str(&self, key: &str) -> Result<String, MailerError> {
        self.get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| MailerError::Builder(format!("{key} is required")))
    }

    pub(crate) fn require_u64(&self, key: &str) -> Result<u64, MailerError> {
        self.get(key)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| MailerError::Builder(format!("{key} is required")))
    }
}
