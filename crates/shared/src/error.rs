use thiserror::Error;

use crate::domain::TemplateId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template name cannot be empty")]
    EmptyName,
    #[error("template {0} not found")]
    NotFound(TemplateId),
    #[error("template {0} is a built-in default and cannot be modified")]
    DefaultImmutable(TemplateId),
}

impl TemplateError {
    /// Text shown to the user through the notification surface.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyName => "Name cannot be empty".to_string(),
            Self::NotFound(_) => "Template not found!".to_string(),
            Self::DefaultImmutable(_) => "Built-in templates cannot be changed".to_string(),
        }
    }
}

/// Trims `raw` and rejects names that are blank afterwards.
pub fn validate_name(raw: &str) -> Result<String, TemplateError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TemplateError::EmptyName);
    }
    Ok(name.to_string())
}
