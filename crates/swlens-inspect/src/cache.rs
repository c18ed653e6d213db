//! Cache Storage inventory.
//!
//! The host materializes each named cache as a list of stored
//! request/response pairs; this module flattens them into sorted
//! [`CacheEntry`] rows and classifies their MIME types for display.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Placeholder MIME type for responses without a content type.
pub const UNKNOWN_MIME: &str = "unknown";

// ==================== Host Inputs ====================

/// A stored request as materialized by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRequest {
    /// Request method (`GET`, ...).
    pub method: String,
    /// Request URL as stored.
    pub url: String,
}

/// A stored response as materialized by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Response type (`basic`, `cors`, `opaque`, ...).
    pub response_type: String,
    /// Raw `Content-Type` header value, when present.
    pub content_type: Option<String>,
}

/// One stored request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPair {
    pub request: CachedRequest,
    pub response: CachedResponse,
}

/// A named cache and its stored pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedCache {
    pub name: String,
    pub entries: Vec<StoredPair>,
}

// ==================== Inventory ====================

/// One row of the cache inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Name of the cache the entry came from.
    pub cache_name: String,
    /// Request method.
    pub method: String,
    /// Stored request URL.
    pub url: String,
    /// Response type as reported by the host.
    pub response_type: String,
    /// Content-type essence, [`UNKNOWN_MIME`] when the header is absent.
    pub mime_type: String,
}

impl CacheEntry {
    /// Presentational classification of this entry's MIME type.
    pub fn mime_class(&self) -> MimeClass {
        MimeClass::classify(&self.mime_type)
    }
}

/// Build the grouped inventory from host-materialized caches.
///
/// Rows within a cache sort ascending by `mime_type`; the sort is stable so
/// equal types keep their encounter order.
pub fn build_inventory(caches: Vec<NamedCache>) -> BTreeMap<String, Vec<CacheEntry>> {
    let mut inventory = BTreeMap::new();
    for NamedCache { name, entries } in caches {
        let mut rows: Vec<CacheEntry> = entries
            .into_iter()
            .map(|pair| CacheEntry {
                cache_name: name.clone(),
                method: pair.request.method,
                url: pair.request.url,
                response_type: pair.response.response_type,
                mime_type: mime_essence(pair.response.content_type.as_deref()),
            })
            .collect();
        rows.sort_by(|a, b| a.mime_type.cmp(&b.mime_type));
        trace!(cache = %name, rows = rows.len(), "cache inventoried");
        inventory.insert(name, rows);
    }
    inventory
}

/// Content-type essence: parameters stripped, lowercased.
///
/// Prefers a strict parse; malformed headers fall back to truncation at the
/// first `;` so an entry never loses its row over a bad header.
pub fn mime_essence(content_type: Option<&str>) -> String {
    let Some(raw) = content_type else {
        return UNKNOWN_MIME.to_string();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN_MIME.to_string();
    }
    match trimmed.parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_ascii_lowercase(),
        Err(_) => trimmed
            .split(';')
            .next()
            .unwrap_or(trimmed)
            .trim()
            .to_ascii_lowercase(),
    }
}

// ==================== MIME Classification ====================

/// Presentational grouping of a cache entry's MIME type.
///
/// Display metadata only; nothing protocol-relevant hangs off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeClass {
    Image,
    Css,
    Audio,
    Video,
    Script,
    Html,
    Font,
    Json,
    /// Web app manifests, JSON on the wire but shown apart from data.
    Manifest,
    Unknown,
}

const SCRIPT_TYPES: &[&str] = &[
    "application/javascript",
    "text/javascript",
    "application/x-javascript",
];

const JSON_TYPES: &[&str] = &["application/json", "text/json"];

impl MimeClass {
    /// Classify a content-type essence through a fixed chain of checks.
    ///
    /// The generic JSON test matches exact types only; `+json` suffixes such
    /// as the web app manifest keep their own class further down the chain.
    pub fn classify(mime_type: &str) -> MimeClass {
        if mime_type.starts_with("image/") {
            MimeClass::Image
        } else if mime_type == "text/css" {
            MimeClass::Css
        } else if mime_type.starts_with("audio/") {
            MimeClass::Audio
        } else if mime_type.starts_with("video/") {
            MimeClass::Video
        } else if SCRIPT_TYPES.contains(&mime_type) {
            MimeClass::Script
        } else if mime_type == "text/html" {
            MimeClass::Html
        } else if mime_type.starts_with("font/") || mime_type.starts_with("application/font") {
            MimeClass::Font
        } else if JSON_TYPES.contains(&mime_type) {
            MimeClass::Json
        } else if mime_type == "application/manifest+json" {
            MimeClass::Manifest
        } else {
            MimeClass::Unknown
        }
    }
}
