//! Request handler module
//!
//! Responsible for request routing dispatch and extracting the theme preference.
//! The homepage is the only rendered page; health checks answer directly.

mod input;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
