//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use crate::config::{AppState, HealthConfig, ThemeSource};
use crate::handler::input;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::theme::Theme;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let logging = &state.config.logging;

    let mut entry = logging
        .access_log
        .then(|| access_entry(&req, peer_addr));

    logger::log_headers_count(req.headers().len(), logging.show_headers);

    let response = route_request(req, &state).await;

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &logging.access_log_format);
    }

    Ok(response)
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_string(req.headers(), "referer");
    entry.user_agent = header_string(req.headers(), "user-agent");
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Route request based on method and path
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let http_config = &state.config.http;

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method(), http_config.enable_cors) {
        return resp;
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(req.headers(), http_config.max_body_size) {
        return resp;
    }

    // 3. Health check endpoints
    let path = req.uri().path();
    if is_health_path(&state.config.routes.health, path) {
        return http::build_health_response("ok");
    }

    // 4. Homepage is the only page
    if path != "/" {
        return http::build_404_response();
    }

    let is_head = req.method() == Method::HEAD;
    match extract_theme_token(req, state).await {
        Ok(token) => serve_homepage(token.as_deref(), is_head, state),
        Err(resp) => resp,
    }
}

/// Check HTTP method and return appropriate response for methods the site does not serve
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD | &Method::POST => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn is_health_path(health: &HealthConfig, path: &str) -> bool {
    health.enabled && (path == health.liveness_path || path == health.readiness_path)
}

/// Pull the raw `theme` token from the locations the configured source allows.
///
/// For POST a form field takes precedence over a query parameter.
async fn extract_theme_token<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<Option<String>, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let source = state.config.site.theme_source;

    let from_query = match source {
        ThemeSource::Any | ThemeSource::Query => input::query_theme(req.uri().query()),
        ThemeSource::Form => None,
    };

    let reads_form = req.method() == Method::POST
        && source != ThemeSource::Query
        && input::is_form_body(req.headers());
    if !reads_form {
        return Ok(from_query);
    }

    let body = read_body(
        req.into_body(),
        state.config.http.max_body_size,
        Duration::from_secs(state.config.performance.read_timeout),
    )
    .await?;
    Ok(input::form_theme(&body).or(from_query))
}

/// Collect the request body, bounded in size by `max_body_size` and in time by `read_timeout`
async fn read_body<B>(
    body: B,
    max_body_size: u64,
    read_timeout: Duration,
) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let Ok(collected) = tokio::time::timeout(read_timeout, Limited::new(body, limit).collect()).await
    else {
        logger::log_warning(&format!(
            "Request body not received within {} seconds",
            read_timeout.as_secs()
        ));
        return Err(http::build_408_response());
    };

    match collected {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_error(&format!("Request body exceeded {max_body_size} bytes"));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::build_400_response())
        }
    }
}

/// Render the themed homepage
fn serve_homepage(token: Option<&str>, is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    let theme = Theme::resolve(token);

    match state.page.render(theme) {
        Ok(html) => http::build_html_response(html, is_head, &state.config.http.server_name),
        Err(e) => {
            logger::log_error(&format!("Failed to render homepage ({theme}): {e}"));
            http::build_500_response()
        }
    }
}
