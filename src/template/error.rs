// ABOUTME: Error types for template rendering
// ABOUTME: Wraps Handlebars failures behind the module's own error enum

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
