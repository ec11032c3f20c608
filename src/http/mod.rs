//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from page rendering.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_400_response, build_404_response, build_405_response, build_408_response,
    build_413_response,
    build_500_response, build_health_response, build_html_response, build_options_response,
};
