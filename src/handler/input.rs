//! Theme token extraction
//!
//! Reads the `theme` field from a query string or an urlencoded form body.
//! Only the first occurrence counts.

use hyper::header::CONTENT_TYPE;
use hyper::HeaderMap;

const THEME_FIELD: &str = "theme";

pub fn query_theme(query: Option<&str>) -> Option<String> {
    query.and_then(|q| find_theme(q.as_bytes()))
}

pub fn form_theme(body: &[u8]) -> Option<String> {
    find_theme(body)
}

/// Whether the request body is `application/x-www-form-urlencoded`
pub fn is_form_body(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

fn find_theme(input: &[u8]) -> Option<String> {
    form_urlencoded::parse(input)
        .find(|(key, _)| *key == THEME_FIELD)
        .map(|(_, value)| value.into_owned())
}
