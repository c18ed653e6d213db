//! # SwLens Manifest
//!
//! Web app manifest normalization for the SwLens introspection engine.
//!
//! ## Features
//!
//! - **Clusters**: fields grouped into a fixed, ordered set of named
//!   clusters (Identity, Presentation, Icons, ...)
//! - **Link resolution**: `start_url`, `scope`, icon sources and nested
//!   `src`/`scope` subfields resolved against the manifest URL
//! - **Icon ordering**: icons and screenshots sorted ascending by declared
//!   width, with a substitute width for `any` and other non-numeric sizes
//! - **Degradation**: malformed fields drop individually; only unparsable
//!   JSON rejects the manifest as a whole
//!
//! The normalizer works on raw [`serde_json::Value`] manifests so that
//! present-but-unmodeled members still reach the raw rendering rule instead
//! of vanishing during deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use swlens_common::resolve_url;

// ==================== Errors ====================

/// Errors from manifest normalization.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest body is not valid JSON.
    #[error("Manifest parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ==================== View Model ====================

/// A named group of normalized manifest fields.
///
/// Clusters appear in a fixed order and a cluster with no present fields is
/// omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Display name of the group.
    pub name: String,
    /// Normalized fields, in table order.
    pub fields: Vec<Field>,
}

/// One normalized manifest field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Display label. For related applications this is the platform name.
    pub label: String,
    /// Normalized value.
    pub value: FieldValue,
}

/// The normalized value of a manifest field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Raw text: strings verbatim, other JSON values compact-printed.
    Text(String),
    /// Color string, marked for swatch rendering by the presentation layer.
    Color(String),
    /// Resolved link.
    Link(Url),
    /// Icon or screenshot list, ordered ascending by width.
    Media(Vec<IconEntry>),
    /// Strictly boolean flag.
    Flag(bool),
    /// One related application. At least one of `url` and `id` is present.
    RelatedApp {
        url: Option<Url>,
        id: Option<String>,
    },
    /// Nested field list (`share_target`, `serviceworker`).
    Nested(Vec<Field>),
}

/// One icon or screenshot with its declared size metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconEntry {
    /// Resolved image URL.
    pub src: Url,
    /// First declared width token (`"192"`, or `"any"`).
    pub width: String,
    /// First declared height token.
    pub height: String,
    /// Declared media type, when present.
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// Sort width substituted for `any` and other non-numeric size tokens.
const SUBSTITUTE_WIDTH: u32 = 128;

// ==================== Cluster Table ====================

/// How a manifest member is normalized.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Strings verbatim, other values compact JSON.
    Raw,
    /// Color string shown with a swatch.
    Color,
    /// URL resolved against the manifest URL, absent when unresolvable.
    Link,
    /// Icon or screenshot array, sorted ascending by width.
    Media,
    /// Rendered only when strictly boolean.
    Flag,
    /// `related_applications` array.
    RelatedApps,
    /// Sub-object with `src`/`scope` subfields resolved as links.
    Nested,
}

struct Member {
    key: &'static str,
    label: &'static str,
    rule: Rule,
}

struct ClusterDef {
    name: &'static str,
    members: &'static [Member],
}

const CLUSTERS: &[ClusterDef] = &[
    ClusterDef {
        name: "Identity",
        members: &[
            Member { key: "name", label: "Name", rule: Rule::Raw },
            Member { key: "short_name", label: "Short Name", rule: Rule::Raw },
            Member { key: "description", label: "Description", rule: Rule::Raw },
        ],
    },
    ClusterDef {
        name: "Presentation",
        members: &[
            Member { key: "start_url", label: "Start URL", rule: Rule::Link },
            Member { key: "scope", label: "Scope", rule: Rule::Link },
            Member { key: "theme_color", label: "Theme Color", rule: Rule::Color },
            Member { key: "background_color", label: "Background Color", rule: Rule::Color },
            Member { key: "orientation", label: "Orientation", rule: Rule::Raw },
            Member { key: "display", label: "Display", rule: Rule::Raw },
            Member { key: "lang", label: "Language", rule: Rule::Raw },
            Member { key: "dir", label: "Direction", rule: Rule::Raw },
        ],
    },
    ClusterDef {
        name: "Icons",
        members: &[Member { key: "icons", label: "Icons", rule: Rule::Media }],
    },
    ClusterDef {
        name: "Screenshots",
        members: &[Member { key: "screenshots", label: "Screenshots", rule: Rule::Media }],
    },
    ClusterDef {
        name: "Related Applications",
        members: &[
            Member {
                key: "prefer_related_applications",
                label: "Prefer Related Applications",
                rule: Rule::Flag,
            },
            Member {
                key: "related_applications",
                label: "Related Applications",
                rule: Rule::RelatedApps,
            },
        ],
    },
    ClusterDef {
        name: "Messaging",
        members: &[Member { key: "gcm_sender_id", label: "GCM Sender ID", rule: Rule::Raw }],
    },
    ClusterDef {
        name: "Sharing",
        members: &[
            Member { key: "supports_share", label: "Supports Share", rule: Rule::Flag },
            Member { key: "share_target", label: "Share Target", rule: Rule::Nested },
        ],
    },
    ClusterDef {
        name: "Service Worker",
        members: &[Member { key: "serviceworker", label: "Service Worker", rule: Rule::Nested }],
    },
];

/// Subfields of nested objects that hold URLs.
const NESTED_LINK_KEYS: &[&str] = &["src", "scope"];

// ==================== Normalization ====================

/// Parse and normalize a manifest body fetched from `manifest_url`.
pub fn normalize(manifest_url: &Url, body: &str) -> Result<Vec<Cluster>, ManifestError> {
    let manifest: Value = serde_json::from_str(body)?;
    Ok(normalize_value(manifest_url, &manifest))
}

/// Normalize an already-parsed manifest into the ordered cluster list.
///
/// Never fails: malformed members degrade to dropped fields.
pub fn normalize_value(manifest_url: &Url, manifest: &Value) -> Vec<Cluster> {
    CLUSTERS
        .iter()
        .filter_map(|def| {
            let fields: Vec<Field> = def
                .members
                .iter()
                .flat_map(|member| normalize_member(manifest_url, manifest, member))
                .collect();
            if fields.is_empty() {
                None
            } else {
                Some(Cluster {
                    name: def.name.to_string(),
                    fields,
                })
            }
        })
        .collect()
}

fn normalize_member(base: &Url, manifest: &Value, member: &Member) -> Vec<Field> {
    let Some(value) = manifest.get(member.key).filter(|v| !v.is_null()) else {
        return Vec::new();
    };

    match member.rule {
        Rule::Raw => vec![field(member.label, raw_value(value))],
        Rule::Color => {
            let normalized = match value.as_str() {
                Some(color) => FieldValue::Color(color.to_string()),
                None => raw_value(value),
            };
            vec![field(member.label, normalized)]
        }
        Rule::Link => match value.as_str().and_then(|raw| resolve_url(base, raw)) {
            Some(url) => vec![field(member.label, FieldValue::Link(url))],
            None => {
                debug!(key = member.key, "treating unresolvable URL field as absent");
                Vec::new()
            }
        },
        Rule::Media => {
            let entries = media_entries(base, value);
            if entries.is_empty() {
                Vec::new()
            } else {
                vec![field(member.label, FieldValue::Media(entries))]
            }
        }
        Rule::Flag => match value.as_bool() {
            Some(flag) => vec![field(member.label, FieldValue::Flag(flag))],
            None => {
                debug!(key = member.key, "dropping non-boolean flag");
                Vec::new()
            }
        },
        Rule::RelatedApps => related_app_fields(base, value),
        Rule::Nested => match nested_fields(base, value) {
            Some(fields) => vec![field(member.label, FieldValue::Nested(fields))],
            None => vec![field(member.label, raw_value(value))],
        },
    }
}

/// Icon or screenshot entries, sorted ascending by declared width.
///
/// Entries without a resolvable `src` are dropped individually; the sort is
/// stable so equal widths keep their declared order.
fn media_entries(base: &Url, value: &Value) -> Vec<IconEntry> {
    let Some(items) = value.as_array() else {
        debug!("media member is not an array, dropping");
        return Vec::new();
    };

    let mut entries: Vec<(u32, IconEntry)> = Vec::new();
    for item in items {
        let Some(src) = item.get("src").and_then(Value::as_str) else {
            debug!("dropping media entry without src");
            continue;
        };
        let Some(resolved) = resolve_url(base, src) else {
            debug!(src, "dropping media entry with unresolvable src");
            continue;
        };
        let sizes = item.get("sizes").and_then(Value::as_str).unwrap_or("");
        let (width, height) = first_size_tokens(sizes);
        let sort_width = width.parse::<u32>().unwrap_or(SUBSTITUTE_WIDTH);
        entries.push((
            sort_width,
            IconEntry {
                src: resolved,
                width,
                height,
                media_type: item.get("type").and_then(Value::as_str).map(str::to_string),
            },
        ));
    }
    entries.sort_by_key(|(width, _)| *width);
    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Related application entries, one field per entry labeled by platform.
///
/// Entries without a platform, and entries with neither a resolvable `url`
/// nor an `id`, are dropped.
fn related_app_fields(base: &Url, value: &Value) -> Vec<Field> {
    let Some(items) = value.as_array() else {
        debug!("related_applications is not an array, dropping");
        return Vec::new();
    };

    let mut fields = Vec::new();
    for item in items {
        let Some(platform) = item.get("platform").and_then(Value::as_str) else {
            debug!("dropping related application without platform");
            continue;
        };
        let url = item
            .get("url")
            .and_then(Value::as_str)
            .and_then(|raw| resolve_url(base, raw));
        let id = item.get("id").and_then(Value::as_str).map(str::to_string);
        if url.is_none() && id.is_none() {
            debug!(platform, "dropping related application without url or id");
            continue;
        }
        fields.push(Field {
            label: platform.to_string(),
            value: FieldValue::RelatedApp { url, id },
        });
    }
    fields
}

/// Subfields of a nested object, with `src`/`scope` resolved as links.
fn nested_fields(base: &Url, value: &Value) -> Option<Vec<Field>> {
    let object = value.as_object()?;
    let mut fields = Vec::new();
    for (key, entry) in object {
        let normalized = match entry.as_str() {
            Some(raw) if NESTED_LINK_KEYS.contains(&key.as_str()) => {
                match resolve_url(base, raw) {
                    Some(url) => FieldValue::Link(url),
                    None => {
                        debug!(key, raw, "dropping unresolvable nested URL subfield");
                        continue;
                    }
                }
            }
            _ => raw_value(entry),
        };
        fields.push(Field {
            label: key.clone(),
            value: normalized,
        });
    }
    Some(fields)
}

/// First `<width>x<height>` pair of a space-separated `sizes` value.
fn first_size_tokens(sizes: &str) -> (String, String) {
    let first = sizes.split_whitespace().next().unwrap_or("");
    let mut parts = first.split('x');
    let width = parts.next().unwrap_or("").to_string();
    let height = parts.next().unwrap_or("").to_string();
    (width, height)
}

fn raw_value(value: &Value) -> FieldValue {
    match value.as_str() {
        Some(text) => FieldValue::Text(text.to_string()),
        None => FieldValue::Text(value.to_string()),
    }
}

fn field(label: &str, value: FieldValue) -> Field {
    Field {
        label: label.to_string(),
        value,
    }
}
