//! Pre-compiled minijinja renderer.

use std::io::ErrorKind;
use std::path::Path;

use minijinja::{AutoEscape, Environment, Value};

use super::{builtin, Binding, Bindings, TemplateError, TemplateRenderer, TEMPLATE_NAMES};
use crate::logger;

/// A renderer with the site templates compiled once at startup.
///
/// Plain text bindings are HTML-escaped; [`Binding::Markup`] values are
/// inserted as safe strings so nested fragments are not escaped twice.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    fn empty() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        Self { env }
    }

    /// Renderer over the markup compiled into the binary
    pub fn builtin() -> Result<Self, TemplateError> {
        let mut renderer = Self::empty();
        for name in TEMPLATE_NAMES {
            renderer.add_template(name, builtin_source(name))?;
        }
        Ok(renderer)
    }

    /// Load `<name>.html` for every site template from `dir`.
    ///
    /// A file missing from the directory falls back to the built-in markup.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut renderer = Self::empty();
        for name in TEMPLATE_NAMES {
            let path = dir.join(format!("{name}.html"));
            match std::fs::read_to_string(&path) {
                Ok(source) => {
                    logger::log_info(&format!("[Template] Loaded {}", path.display()));
                    renderer.add_template(name, source)?;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    logger::log_info(&format!(
                        "[Template] {} not found, using built-in '{name}'",
                        path.display()
                    ));
                    renderer.add_template(name, builtin_source(name))?;
                }
                Err(source) => return Err(TemplateError::Read { path, source }),
            }
        }
        Ok(renderer)
    }

    /// Registers a named template, compiling it immediately.
    pub fn add_template(
        &mut self,
        name: &str,
        source: impl Into<String>,
    ) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(name.to_string(), source.into())
            .map_err(|source| TemplateError::Compile {
                name: name.to_string(),
                source,
            })
    }
}

fn builtin_source(name: &str) -> &'static str {
    builtin::source(name).unwrap_or_default()
}

fn to_value(binding: &Binding) -> Value {
    match binding {
        Binding::Text(text) => Value::from(text.as_str()),
        Binding::Markup(html) => Value::from_safe_string(html.clone()),
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, bindings: &Bindings) -> Result<String, TemplateError> {
        let render_error = |source| TemplateError::Render {
            name: name.to_string(),
            source,
        };
        let tmpl = self.env.get_template(name).map_err(render_error)?;
        let ctx: Value = bindings.iter().map(|(k, v)| (*k, to_value(v))).collect();
        tmpl.render(ctx).map_err(render_error)
    }
}
