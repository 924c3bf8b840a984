// ABOUTME: Handlebars rendering of node templates against workflow variables
// ABOUTME: Used for webhook bodies/headers and generative prompts

use handlebars::Handlebars;

use super::error::Result;
use crate::definition::Variables;

#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(false);
        // Rendered output is webhook bodies and prompts, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);

        Self { handlebars }
    }

    /// Render a template string against the workflow variables.
    pub fn render(&self, template: &str, variables: &Variables) -> Result<String> {
        Ok(self.handlebars.render_template(template, variables)?)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}
