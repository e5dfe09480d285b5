//! Rendering of extracted metadata through a user supplied template.

use crate::drop_data::DropStruct;
use crate::errors::{Result, ResultExt};
use crate::file_utils::file_to_string;
use minijinja::{context, Environment};
use std::path::Path;

/// Template renderer for one generation run.
///
/// The template file is loaded and compiled once. Rendering is pure:
/// identical inputs produce byte-identical output, so the generation
/// timestamp is an input rather than something the renderer reads from
/// a clock.
#[derive(Debug)]
pub struct MetaRenderer {
    env: Environment<'static>,
    template_name: String,
}

impl MetaRenderer {
    /// Loads `template_file` from `templates_dir`. A missing or
    /// syntactically invalid template fails here, before any header is
    /// parsed for the target.
    pub fn from_directory(templates_dir: &Path, template_file: &str) -> Result<MetaRenderer> {
        let template_path = templates_dir.join(template_file);
        let source = file_to_string(&template_path)?;
        let mut env = Environment::new();
        env.add_template_owned(template_file.to_string(), source)
            .with_context(|_| format!("failed to compile template: {}", template_path.display()))?;
        Ok(MetaRenderer {
            env,
            template_name: template_file.to_string(),
        })
    }

    /// Renders the context `{structs, includes, timestamp}`.
    pub fn render(
        &self,
        structs: &[DropStruct],
        includes: &[String],
        timestamp: &str,
    ) -> Result<String> {
        let template = self
            .env
            .get_template(&self.template_name)
            .with_context(|_| format!("template disappeared: {}", self.template_name))?;
        let rendered = template
            .render(context! {
                structs => structs,
                includes => includes,
                timestamp => timestamp,
            })
            .with_context(|_| format!("failed to render template: {}", self.template_name))?;
        Ok(rendered)
    }
}
