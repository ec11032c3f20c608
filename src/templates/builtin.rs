// Markup compiled into the binary, used when the template directory lacks a file

use super::{ACCESSIBILITY_DROPDOWN, INDEX, THEME_PICKER};

const THEME_PICKER_HTML: &str = include_str!("../../templates/theme_picker.html");
const ACCESSIBILITY_DROPDOWN_HTML: &str = include_str!("../../templates/accessibility_dropdown.html");
const INDEX_HTML: &str = include_str!("../../templates/index.html");

pub fn source(name: &str) -> Option<&'static str> {
    match name {
        THEME_PICKER => Some(THEME_PICKER_HTML),
        ACCESSIBILITY_DROPDOWN => Some(ACCESSIBILITY_DROPDOWN_HTML),
        INDEX => Some(INDEX_HTML),
        _ => None,
    }
}
