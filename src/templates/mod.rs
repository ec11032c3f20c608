//! Template rendering module
//!
//! Exposes the rendering capability the page renderer depends on, and the
//! minijinja-backed implementation used by the server.

mod builtin;
mod engine;

use std::collections::BTreeMap;
use std::path::PathBuf;

pub use engine::MiniJinjaRenderer;

/// Theme picker fragment
pub const THEME_PICKER: &str = "theme_picker";
/// Accessibility dropdown fragment, wraps the theme picker
pub const ACCESSIBILITY_DROPDOWN: &str = "accessibility_dropdown";
/// Page shell, wraps the accessibility dropdown
pub const INDEX: &str = "index";

/// All templates a renderer must provide
pub const TEMPLATE_NAMES: [&str; 3] = [THEME_PICKER, ACCESSIBILITY_DROPDOWN, INDEX];

/// A value bound into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Plain text, escaped on output
    Text(String),
    /// Already rendered markup, substituted verbatim
    Markup(String),
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

pub type Bindings = BTreeMap<&'static str, Binding>;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile template '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Renders a named template with a set of bindings
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, bindings: &Bindings) -> Result<String, TemplateError>;
}
