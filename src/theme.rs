//! Theme resolution
//!
//! Maps the raw `theme` token of a request to a [`Theme`] and the CSS
//! classes the page templates use to mark the active theme chip and to
//! pick the accessible button contrast.

/// UI mode selected by the visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// CSS classes derived from a [`Theme`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeClasses {
    pub dark_border: &'static str,
    pub light_border: &'static str,
    pub accessible_button: &'static str,
}

const DARK_CLASSES: ThemeClasses = ThemeClasses {
    dark_border: "border-primary",
    light_border: "border-secondary",
    accessible_button: "text-bg-light",
};

const LIGHT_CLASSES: ThemeClasses = ThemeClasses {
    dark_border: "border-secondary",
    light_border: "border-primary",
    accessible_button: "text-bg-dark",
};

impl Theme {
    /// Resolve a raw token. Only the exact literals `dark` and `light` are
    /// recognised; anything else, including no token, yields [`Theme::Dark`].
    pub fn resolve(token: Option<&str>) -> Self {
        match token {
            Some("light") => Self::Light,
            _ => Self::Dark,
        }
    }

    pub const fn classes(self) -> ThemeClasses {
        match self {
            Self::Dark => DARK_CLASSES,
            Self::Light => LIGHT_CLASSES,
        }
    }

    /// Token bound as `theme` in the templates
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
