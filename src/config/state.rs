// Application state module
// Holds everything a request handler needs; immutable after startup

use std::path::Path;
use std::sync::Arc;

use super::types::Config;
use crate::page::PageRenderer;
use crate::templates::{MiniJinjaRenderer, TemplateError, TemplateRenderer};

/// Application state
pub struct AppState {
    pub config: Config,
    pub page: PageRenderer,
}

impl AppState {
    pub fn new(config: Config, templates: Arc<dyn TemplateRenderer>) -> Self {
        let page = PageRenderer::new(templates, config.site.title.clone());
        Self { config, page }
    }

    /// Create `AppState` with templates loaded from `site.template_dir`,
    /// or the built-in templates when no directory is configured
    pub fn from_config(config: Config) -> Result<Self, TemplateError> {
        let templates = match config.site.template_dir.as_deref() {
            Some(dir) => MiniJinjaRenderer::load(Path::new(dir))?,
            None => MiniJinjaRenderer::builtin()?,
        };
        Ok(Self::new(config, Arc::new(templates)))
    }
}
