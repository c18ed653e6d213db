//! # SwLens Inspect
//!
//! Service worker introspection engine for SwLens.
//!
//! ## Features
//!
//! - **Worker snapshot**: lifecycle state, script URL and scope
//! - **Script analysis**: registered events plus `importScripts` imports,
//!   flattened and merged per the configured policy
//! - **Manifest view**: fetched and normalized into ordered clusters
//! - **Cache inventory**: per-cache rows, MIME-classified and sorted
//!
//! ## Architecture
//!
//! ```text
//! Inspector (config + ResourceFetcher)
//!     │
//!     ├── script:   fetch root → analyze → fetch imports → merge events
//!     ├── manifest: fetch → normalize clusters
//!     └── caches:   inventory → classify → sort
//!             │
//!             └──► IntrospectionReport (plain, serializable)
//! ```
//!
//! Every section degrades independently; a partial report always beats no
//! report. The engine holds no mutable state across inspections, so
//! concurrent inspections share nothing but the fetcher.

pub mod cache;
mod imports;

pub use cache::{
    build_inventory, mime_essence, CacheEntry, CachedRequest, CachedResponse, MimeClass,
    NamedCache, StoredPair, UNKNOWN_MIME,
};
pub use swlens_manifest::{Cluster, Field, FieldValue, IconEntry, ManifestError};
pub use swlens_script::{ImportEdge, ScriptAnalysis, ScriptError, ScriptParser};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

// ==================== Errors ====================

/// Errors surfaced by fetch collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status.
    #[error("Unexpected status: {0}")]
    Status(u16),
}

/// Error for worker state strings the host reports but this engine does
/// not know.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown worker state: {0}")]
pub struct UnknownWorkerState(pub String);

// ==================== Worker Snapshot ====================

/// Service worker lifecycle state, as reported by the host browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Initial state, script parsed but not installing yet.
    Parsed,
    /// Install event in flight.
    Installing,
    /// Installed, waiting for activation.
    Installed,
    /// Activate event in flight.
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Replaced or failed.
    Redundant,
}

impl WorkerState {
    /// Lowercase wire name, matching what hosts report.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    /// Whether this worker currently controls pages.
    pub fn is_activated(self) -> bool {
        self == WorkerState::Activated
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerState {
    type Err = UnknownWorkerState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parsed" => Ok(WorkerState::Parsed),
            "installing" => Ok(WorkerState::Installing),
            "installed" => Ok(WorkerState::Installed),
            "activating" => Ok(WorkerState::Activating),
            "activated" => Ok(WorkerState::Activated),
            "redundant" => Ok(WorkerState::Redundant),
            other => Err(UnknownWorkerState(other.to_string())),
        }
    }
}

/// Immutable snapshot of the worker under inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    /// Lifecycle state at snapshot time.
    pub state: WorkerState,
    /// Absolute URL of the registered worker script.
    pub script_url: Url,
    /// Registration scope.
    pub scope: Url,
}

impl WorkerDescriptor {
    /// Path-and-query form of the script URL, the shape reports display.
    pub fn relative_script_url(&self) -> String {
        swlens_common::display_path(&self.script_url)
    }
}

/// One fetched script, identified by its resolved URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub url: Url,
    pub text: String,
}

// ==================== Fetch Seam ====================

/// Host-supplied fetch capability.
///
/// The engine never constructs an HTTP client. Credentials, headers and
/// timeouts are the collaborator's concern; the engine only consumes
/// `URL -> text | error`.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the body of `url` as text.
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

// ==================== Configuration ====================

/// How far import edges are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportPolicy {
    /// Resolve and fetch the root script's direct imports only. Matches the
    /// single-registration model worker imports execute under.
    #[default]
    SingleLevel,
    /// Follow imports recursively, each edge resolved against its
    /// importer's URL, with cycle protection.
    Transitive,
}

/// Inspection configuration.
#[derive(Debug, Clone, Default)]
pub struct InspectorConfig {
    /// Import traversal policy.
    pub import_policy: ImportPolicy,
}

// ==================== Report ====================

/// Everything the host hands over for one inspection.
#[derive(Debug, Clone)]
pub struct InspectionRequest {
    /// Worker snapshot.
    pub worker: WorkerDescriptor,
    /// Manifest URL discovered in the controlled document, if any.
    pub manifest_url: Option<Url>,
    /// Materialized cache listing, if the host exposes one.
    pub caches: Option<Vec<NamedCache>>,
}

/// Normalized manifest together with the URL it was fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestView {
    pub url: Url,
    pub clusters: Vec<Cluster>,
}

/// Immutable result of one inspection.
///
/// Built once per request and handed to the presentation layer as plain
/// data; the engine never touches it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionReport {
    /// Worker snapshot the inspection ran against.
    pub worker: WorkerDescriptor,
    /// Root script source, or the failure description when the script could
    /// not be fetched or analyzed.
    pub source: String,
    /// Event names across the root script and every fetched import,
    /// lexicographically ordered.
    pub events: BTreeSet<String>,
    /// Fetched imports keyed by resolved URL.
    pub imported_sources: BTreeMap<String, SourceUnit>,
    /// Normalized manifest, when one was found and parsed.
    pub manifest: Option<ManifestView>,
    /// Cache rows grouped by cache name, when the host supplied caches.
    pub caches: Option<BTreeMap<String, Vec<CacheEntry>>>,
}

// ==================== Inspector ====================

struct ScriptSection {
    source: String,
    events: BTreeSet<String>,
    imported_sources: BTreeMap<String, SourceUnit>,
}

impl ScriptSection {
    /// Degraded section: the failure detail stands in for the source.
    fn failed(detail: String) -> Self {
        Self {
            source: detail,
            events: BTreeSet::new(),
            imported_sources: BTreeMap::new(),
        }
    }
}

/// The introspection engine.
pub struct Inspector<F> {
    fetcher: F,
    config: InspectorConfig,
}

impl<F: ResourceFetcher> Inspector<F> {
    /// Create an inspector with the default configuration.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: InspectorConfig::default(),
        }
    }

    /// Create an inspector with an explicit configuration.
    pub fn with_config(fetcher: F, config: InspectorConfig) -> Self {
        Self { fetcher, config }
    }

    /// The fetch collaborator.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The active configuration.
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Run one full inspection.
    ///
    /// Always produces a report. The script, manifest and cache sections
    /// degrade independently; only the host's failure to supply a worker
    /// snapshot can suppress inspection, and that check lives with the
    /// host.
    pub async fn inspect(&self, request: InspectionRequest) -> IntrospectionReport {
        debug!(
            script_url = %request.worker.script_url,
            state = %request.worker.state,
            "starting inspection"
        );

        let script = self.inspect_script(&request.worker).await;
        let manifest = match request.manifest_url {
            Some(ref url) => self.inspect_manifest(url).await,
            None => None,
        };
        let caches = request.caches.map(cache::build_inventory);

        IntrospectionReport {
            worker: request.worker,
            source: script.source,
            events: script.events,
            imported_sources: script.imported_sources,
            manifest,
            caches,
        }
    }

    async fn inspect_script(&self, worker: &WorkerDescriptor) -> ScriptSection {
        let source = match self.fetcher.fetch_text(&worker.script_url).await {
            Ok(source) => source,
            Err(err) => {
                warn!(url = %worker.script_url, error = %err, "root script fetch failed");
                return ScriptSection::failed(err.to_string());
            }
        };

        let mut parser = match ScriptParser::new() {
            Ok(parser) => parser,
            Err(err) => {
                warn!(error = %err, "script grammar unavailable");
                return ScriptSection::failed(err.to_string());
            }
        };

        let analysis = match parser.analyze(&source, &worker.script_url) {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(url = %worker.script_url, error = %err, "script analysis failed");
                return ScriptSection::failed(err.to_string());
            }
        };

        let merged = imports::resolve_and_merge(
            &self.fetcher,
            &mut parser,
            &worker.script_url,
            &source,
            analysis.events,
            analysis.imports,
            self.config.import_policy,
        )
        .await;

        ScriptSection {
            source,
            events: merged.events,
            imported_sources: merged.imported,
        }
    }

    async fn inspect_manifest(&self, url: &Url) -> Option<ManifestView> {
        let body = match self.fetcher.fetch_text(url).await {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %url, error = %err, "manifest fetch failed");
                return None;
            }
        };
        match swlens_manifest::normalize(url, &body) {
            Ok(clusters) => Some(ManifestView {
                url: url.clone(),
                clusters,
            }),
            Err(err) => {
                warn!(url = %url, error = %err, "manifest rejected");
                None
            }
        }
    }
}
