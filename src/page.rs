//! Page composition
//!
//! Renders the theme picker, nests it into the accessibility dropdown, and
//! nests that into the page shell. Each fragment is passed to its parent as
//! one pre-rendered value.

use std::sync::Arc;

use crate::templates::{
    Binding, Bindings, TemplateError, TemplateRenderer, ACCESSIBILITY_DROPDOWN, INDEX,
    THEME_PICKER,
};
use crate::theme::Theme;

pub const DEFAULT_TITLE: &str = "Andrew B. Moore";

pub struct PageRenderer {
    templates: Arc<dyn TemplateRenderer>,
    title: String,
}

impl PageRenderer {
    pub fn new(templates: Arc<dyn TemplateRenderer>, title: impl Into<String>) -> Self {
        Self {
            templates,
            title: title.into(),
        }
    }

    pub fn render(&self, theme: Theme) -> Result<String, TemplateError> {
        let classes = theme.classes();

        let theme_picker = self.templates.render(
            THEME_PICKER,
            &Bindings::from([
                ("theme", Binding::from(theme.as_str())),
                ("light_active", Binding::from(classes.light_border)),
                ("dark_active", Binding::from(classes.dark_border)),
            ]),
        )?;

        let accessibility_dropdown = self.templates.render(
            ACCESSIBILITY_DROPDOWN,
            &Bindings::from([
                ("theme", Binding::from(theme.as_str())),
                ("btn_accessible_color", Binding::from(classes.accessible_button)),
                ("theme_picker", Binding::Markup(theme_picker)),
            ]),
        )?;

        self.templates.render(
            INDEX,
            &Bindings::from([
                ("title", Binding::from(self.title.as_str())),
                ("theme", Binding::from(theme.as_str())),
                ("accessibility_dropdown", Binding::Markup(accessibility_dropdown)),
            ]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and renders `name(key=value;...)`
    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<String>>,
    }

    impl TemplateRenderer for RecordingRenderer {
        fn render(&self, name: &str, bindings: &Bindings) -> Result<String, TemplateError> {
            self.calls.lock().unwrap().push(name.to_string());
            let args: Vec<String> = bindings
                .iter()
                .map(|(k, v)| match v {
                    Binding::Text(t) => format!("{k}={t}"),
                    Binding::Markup(m) => format!("{k}=<{m}>"),
                })
                .collect();
            Ok(format!("{name}({})", args.join(";")))
        }
    }

    #[test]
    fn test_composition_order_and_nesting() {
        let fake = Arc::new(RecordingRenderer::default());
        let page = PageRenderer::new(fake.clone(), DEFAULT_TITLE);

        let out = page.render(Theme::Light).unwrap();

        assert_eq!(
            *fake.calls.lock().unwrap(),
            vec!["theme_picker", "accessibility_dropdown", "index"]
        );
        assert_eq!(
            out,
            "index(accessibility_dropdown=<accessibility_dropdown(\
             btn_accessible_color=text-bg-dark;theme=light;\
             theme_picker=<theme_picker(dark_active=border-secondary;\
             light_active=border-primary;theme=light)>)>;\
             theme=light;title=Andrew B. Moore)"
        );
    }

    #[test]
    fn test_dark_bindings() {
        let page = PageRenderer::new(Arc::new(RecordingRenderer::default()), "Site");
        let out = page.render(Theme::Dark).unwrap();
        assert!(out.contains("dark_active=border-primary"));
        assert!(out.contains("light_active=border-secondary"));
        assert!(out.contains("btn_accessible_color=text-bg-light"));
        assert!(out.contains("title=Site"));
    }

    #[test]
    fn test_renderer_error_propagates() {
        struct Failing;
        impl TemplateRenderer for Failing {
            fn render(&self, name: &str, _: &Bindings) -> Result<String, TemplateError> {
                Err(TemplateError::Render {
                    name: name.to_string(),
                    source: minijinja::Error::new(
                        minijinja::ErrorKind::TemplateNotFound,
                        "missing",
                    ),
                })
            }
        }
        let page = PageRenderer::new(Arc::new(Failing), DEFAULT_TITLE);
        assert!(page.render(Theme::Dark).is_err());
    }

    #[test]
    fn test_builtin_page_for_light_theme() {
        let templates = Arc::new(crate::templates::MiniJinjaRenderer::builtin().unwrap());
        let page = PageRenderer::new(templates, DEFAULT_TITLE);
        let html = page.render(Theme::Light).unwrap();
        assert_eq!(html.matches("border-primary").count(), 1);
        assert!(html.contains("border-primary\" aria-pressed=\"true\">Light"));
        assert!(html.contains("text-bg-dark"));
        assert!(html.contains("<title>Andrew B. Moore</title>"));
        assert!(html.contains("data-bs-theme=\"light\""));
        // nested fragments are inserted as markup, not escaped text
        assert!(html.contains("<div class=\"theme-picker"));
        assert_eq!(html, page.render(Theme::Light).unwrap());
    }
}
