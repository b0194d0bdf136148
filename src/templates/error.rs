//! Template engine error types

use thiserror::Error;

/// Template engine errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template failed to parse or the inheritance chain is broken
    #[error("Failed to load templates: {0}")]
    Load(String),

    /// Template rendering error
    #[error("Template error: {0}")]
    Render(String),

    /// IO error while reading an override directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
