//! Import resolution and source merging.
//!
//! The default policy flattens one level: the root script's import edges
//! are fetched and the combined text is re-scanned for events. Worker
//! imports run in the worker's single registration, so one level matches
//! how the scripts actually execute. The transitive policy follows edges
//! found inside imports as well, with a visited set for cycles.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use futures::future::join_all;
use swlens_script::{ImportEdge, ScriptParser};
use tracing::{debug, warn};
use url::Url;

use crate::{ImportPolicy, ResourceFetcher, SourceUnit};

/// Outcome of the import pass: fetched units plus the combined event set.
pub(crate) struct MergedScripts {
    pub events: BTreeSet<String>,
    pub imported: BTreeMap<String, SourceUnit>,
}

/// Fetch imports per policy, then re-scan the combined source for events.
///
/// The combined pass never starts before the whole batch has settled, and
/// it never runs at all when nothing was imported.
pub(crate) async fn resolve_and_merge<F: ResourceFetcher>(
    fetcher: &F,
    parser: &mut ScriptParser,
    root_url: &Url,
    root_source: &str,
    root_events: BTreeSet<String>,
    edges: Vec<ImportEdge>,
    policy: ImportPolicy,
) -> MergedScripts {
    let mut imported = BTreeMap::new();
    match policy {
        ImportPolicy::SingleLevel => {
            for unit in fetch_batch(fetcher, dedup_targets(root_url, &edges)).await {
                imported.insert(unit.url.to_string(), unit);
            }
        }
        ImportPolicy::Transitive => {
            transitive_fetch(fetcher, parser, root_url, edges, &mut imported).await;
        }
    }

    if imported.is_empty() {
        return MergedScripts {
            events: root_events,
            imported,
        };
    }

    // Imported texts first, root last, newline separated.
    let mut combined = String::new();
    for unit in imported.values() {
        combined.push_str(&unit.text);
        combined.push('\n');
    }
    combined.push_str(root_source);

    let events = match parser.extract_events(&combined) {
        Ok(events) => events,
        Err(err) => {
            warn!(error = %err, "combined event pass failed, keeping root events");
            root_events
        }
    };
    MergedScripts { events, imported }
}

/// Resolved targets with duplicates and self-references removed, in edge
/// order. `importScripts('a.js', 'a.js')` costs one fetch.
fn dedup_targets(root_url: &Url, edges: &[ImportEdge]) -> Vec<Url> {
    let mut seen = HashSet::new();
    seen.insert(root_url.clone());
    let mut targets = Vec::new();
    for edge in edges {
        if seen.insert(edge.resolved.clone()) {
            targets.push(edge.resolved.clone());
        }
    }
    targets
}

/// Fetch every target concurrently and join the whole batch.
///
/// An individual failure substitutes empty text so one unreachable import
/// cannot sink the rest of the batch.
async fn fetch_batch<F: ResourceFetcher>(fetcher: &F, targets: Vec<Url>) -> Vec<SourceUnit> {
    let fetches = targets.into_iter().map(|url| async move {
        debug!(url = %url, "fetching import");
        let text = match fetcher.fetch_text(&url).await {
            Ok(text) => text,
            Err(err) => {
                warn!(url = %url, error = %err, "import fetch failed, substituting empty source");
                String::new()
            }
        };
        SourceUnit { url, text }
    });
    join_all(fetches).await
}

/// Follow import edges level by level with a visited set.
///
/// Edges found inside an import resolve against that import's URL, not the
/// root's. Already-visited URLs are skipped, which also terminates cycles.
async fn transitive_fetch<F: ResourceFetcher>(
    fetcher: &F,
    parser: &mut ScriptParser,
    root_url: &Url,
    mut frontier: Vec<ImportEdge>,
    imported: &mut BTreeMap<String, SourceUnit>,
) {
    let mut visited: HashSet<Url> = HashSet::new();
    visited.insert(root_url.clone());

    while !frontier.is_empty() {
        let mut targets = Vec::new();
        for edge in frontier.drain(..) {
            if visited.insert(edge.resolved.clone()) {
                targets.push(edge.resolved);
            }
        }
        if targets.is_empty() {
            break;
        }

        let mut next = Vec::new();
        for unit in fetch_batch(fetcher, targets).await {
            match parser.analyze(&unit.text, &unit.url) {
                Ok(analysis) => next.extend(analysis.imports),
                Err(err) => {
                    // The combined event pass still covers this unit.
                    debug!(url = %unit.url, error = %err, "skipping edge extraction for import")
                }
            }
            imported.insert(unit.url.to_string(), unit);
        }
        frontier = next;
    }
}
