//! Prompt templates with `{{placeholder}}` substitution.

use crate::types::Fields;
use serde_json::Value;
use thiserror::Error;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("missing input for placeholder {0:?}")]
    MissingInput(String),

    #[error("malformed template: {0}")]
    Malformed(String),
}

/// A named prompt template.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    name: String,
    body: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute every `{{placeholder}}` from `input`.
    ///
    /// String inputs are inserted verbatim; other JSON values are inserted
    /// in their compact encoding. Every placeholder must be present.
    pub fn render(&self, input: &Fields) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                TemplateError::Malformed("unterminated placeholder".to_string())
            })?;
            let key = after[..end].trim();
            if key.is_empty() {
                return Err(TemplateError::Malformed("empty placeholder".to_string()));
            }
            let value = input
                .get(key)
                .ok_or_else(|| TemplateError::MissingInput(key.to_string()))?;
            match value {
                Value::String(text) => out.push_str(text),
                other => out.push_str(&other.to_string()),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
