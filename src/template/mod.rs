// ABOUTME: Template module: variable substitution for node payloads
// ABOUTME: Exports the Handlebars-backed engine and its error type

pub mod engine;
pub mod error;

pub use engine::TemplateEngine;
pub use error::{Result, TemplateError};
