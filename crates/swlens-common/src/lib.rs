//! # SwLens Common
//!
//! Shared utilities and logging configuration for the SwLens service worker
//! introspection engine.
//!
//! ## Features
//!
//! - Relative URL resolution against a script or manifest base
//! - Display helpers for reporting script locations
//! - Logging configuration and setup

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};

use tracing::debug;
use url::Url;

/// Resolve a possibly-relative URL reference against a base URL.
///
/// Absolute inputs pass through, root-relative paths (`/sw.js`) resolve
/// against the origin, and plain relative paths (`lib/push.js`) resolve
/// against the base's directory part. Returns `None` for empty input or
/// when the reference cannot be joined; callers drop the offending field
/// instead of failing their whole pass.
pub fn resolve_url(base: &Url, raw: &str) -> Option<Url> {
    if raw.is_empty() {
        return None;
    }
    match base.join(raw) {
        Ok(url) => Some(url),
        Err(err) => {
            debug!(base = %base, raw, error = %err, "failed to resolve URL reference");
            None
        }
    }
}

/// Path-and-query form of a URL, the shape reports use for script locations.
pub fn display_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/app/sw.js").unwrap()
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let resolved = resolve_url(&base(), "https://cdn.example.com/lib.js").unwrap();
        assert_eq!(resolved.as_str(), "https://cdn.example.com/lib.js");
    }

    #[test]
    fn test_resolve_root_relative() {
        let resolved = resolve_url(&base(), "/push.js").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/push.js");
    }

    #[test]
    fn test_resolve_directory_relative() {
        let resolved = resolve_url(&base(), "lib/push.js").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/app/lib/push.js");
    }

    #[test]
    fn test_resolve_empty_is_none() {
        assert!(resolve_url(&base(), "").is_none());
    }

    #[test]
    fn test_resolve_malformed_is_none() {
        // An https scheme with no host cannot be joined.
        assert!(resolve_url(&base(), "https://").is_none());
    }

    #[test]
    fn test_display_path_without_query() {
        assert_eq!(display_path(&base()), "/app/sw.js");
    }

    #[test]
    fn test_display_path_with_query() {
        let url = Url::parse("https://example.com/sw.js?v=3").unwrap();
        assert_eq!(display_path(&url), "/sw.js?v=3");
    }
}
