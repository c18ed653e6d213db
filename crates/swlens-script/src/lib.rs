//! # SwLens Script Analysis
//!
//! Syntax-level analysis of service worker scripts for the SwLens
//! introspection engine.
//!
//! ## Features
//!
//! - **Event registrations**: string-literal `addEventListener(...)` calls
//!   and `self.on*` assignment targets, merged into one ordered set
//! - **Import edges**: string-literal `importScripts(...)` arguments,
//!   resolved against the importing script's URL
//! - **Degradation**: a script that fails to parse reports a positioned
//!   syntax error instead of half-finished results
//!
//! Matching happens over a parsed tree, never over raw text. The walker is
//! written against the [`SyntaxNode`] trait; tree-sitter provides the
//! concrete grammar through the [`SourceNode`] adapter.

pub mod extract;
pub mod node;

pub use node::{SourceNode, SyntaxNode};

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

/// Errors from script analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The grammar could not be loaded or the parser produced no tree.
    #[error("Language error: {0}")]
    Language(String),

    /// The source is not syntactically valid script.
    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

/// One `importScripts` argument together with its resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    /// URL of the script the call appears in.
    pub from: Url,
    /// The literal argument as written.
    pub argument: String,
    /// The argument joined against `from`.
    pub resolved: Url,
}

/// Everything one analysis pass finds in a script.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptAnalysis {
    /// Registered event names, deduplicated, lexicographically ordered.
    pub events: BTreeSet<String>,
    /// Import edges in source order.
    pub imports: Vec<ImportEdge>,
}

/// JavaScript parser for worker source analysis.
///
/// Parsing needs exclusive access, so each inspection allocates its own
/// instance rather than sharing one behind a lock.
pub struct ScriptParser {
    parser: tree_sitter::Parser,
}

impl ScriptParser {
    /// Create a parser with the JavaScript grammar loaded.
    pub fn new() -> Result<Self, ScriptError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_javascript::LANGUAGE;
        parser
            .set_language(&language.into())
            .map_err(|err| ScriptError::Language(err.to_string()))?;
        Ok(Self { parser })
    }

    /// Full analysis of a worker script: events plus resolved import edges.
    ///
    /// Fails with [`ScriptError::Syntax`] when the tree contains errors.
    /// Import edges feed fetches, so partial findings from broken source
    /// are worse than an honest failure here.
    pub fn analyze(
        &mut self,
        source: &str,
        script_url: &Url,
    ) -> Result<ScriptAnalysis, ScriptError> {
        let tree = self.parse_tree(source)?;
        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error_position(root);
            return Err(ScriptError::Syntax { line, column });
        }

        let findings = extract::scan(&SourceNode::new(root, source));
        let mut analysis = ScriptAnalysis {
            events: findings.events,
            imports: Vec::new(),
        };
        for argument in findings.import_arguments {
            match swlens_common::resolve_url(script_url, &argument) {
                Some(resolved) => analysis.imports.push(ImportEdge {
                    from: script_url.clone(),
                    argument,
                    resolved,
                }),
                None => debug!(argument, "dropping unresolvable import argument"),
            }
        }
        trace!(
            events = analysis.events.len(),
            imports = analysis.imports.len(),
            "script analysis complete"
        );
        Ok(analysis)
    }

    /// Event-only pass, used over combined root-plus-imports source.
    ///
    /// Tolerant of syntax errors: one broken import must not erase events
    /// contributed by intact sources, so error nodes are walked past.
    pub fn extract_events(&mut self, source: &str) -> Result<BTreeSet<String>, ScriptError> {
        let tree = self.parse_tree(source)?;
        let findings = extract::scan(&SourceNode::new(tree.root_node(), source));
        Ok(findings.events)
    }

    fn parse_tree(&mut self, source: &str) -> Result<tree_sitter::Tree, ScriptError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ScriptError::Language("parser produced no tree".to_string()))
    }
}

/// Position of the first error or missing node, 1-based.
fn first_error_position(root: tree_sitter::Node<'_>) -> (usize, usize) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let position = node.start_position();
            return (position.row + 1, position.column + 1);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    let position = root.start_position();
    (position.row + 1, position.column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ScriptParser {
        ScriptParser::new().unwrap()
    }

    fn base() -> Url {
        Url::parse("https://example.com/sw.js").unwrap()
    }

    #[test]
    fn test_add_event_listener_literal() {
        let analysis = parser()
            .analyze("self.addEventListener('install', () => {});", &base())
            .unwrap();
        assert!(analysis.events.contains("install"));
        assert!(analysis.imports.is_empty());
    }

    #[test]
    fn test_on_assignment() {
        let analysis = parser()
            .analyze("self.onpush = function(event) {};", &base())
            .unwrap();
        assert!(analysis.events.contains("push"));
    }

    #[test]
    fn test_duplicate_registrations_collapse() {
        let source = "self.addEventListener('push', a);\nself.onpush = b;";
        let analysis = parser().analyze(source, &base()).unwrap();
        assert_eq!(analysis.events.len(), 1);
        assert!(analysis.events.contains("push"));
    }

    #[test]
    fn test_non_literal_event_skipped() {
        let source = "const name = 'install';\nself.addEventListener(name, handler);";
        let analysis = parser().analyze(source, &base()).unwrap();
        assert!(analysis.events.is_empty());
    }

    #[test]
    fn test_template_literal_counts_without_substitution() {
        let analysis = parser()
            .analyze("self.addEventListener(`sync`, handler);", &base())
            .unwrap();
        assert!(analysis.events.contains("sync"));

        let analysis = parser()
            .analyze(
                "const kind = 'sync';\nself.addEventListener(`${kind}`, handler);",
                &base(),
            )
            .unwrap();
        assert!(analysis.events.is_empty());
    }

    #[test]
    fn test_bare_listener_call_ignored() {
        let analysis = parser()
            .analyze("addEventListener('fetch', handler);", &base())
            .unwrap();
        assert!(analysis.events.is_empty());
    }

    #[test]
    fn test_on_assignment_requires_self() {
        let source = "window.onpush = f;\nself.on = g;";
        let analysis = parser().analyze(source, &base()).unwrap();
        assert!(analysis.events.is_empty());
    }

    #[test]
    fn test_string_resembling_call_not_matched() {
        let source = "const note = \"self.addEventListener('install', x)\";";
        let analysis = parser().analyze(source, &base()).unwrap();
        assert!(analysis.events.is_empty());
    }

    #[test]
    fn test_import_scripts_edges() {
        let analysis = parser()
            .analyze("importScripts('a.js', '/lib/b.js');", &base())
            .unwrap();
        let resolved: Vec<&str> = analysis
            .imports
            .iter()
            .map(|edge| edge.resolved.as_str())
            .collect();
        assert_eq!(
            resolved,
            vec!["https://example.com/a.js", "https://example.com/lib/b.js"]
        );
    }

    #[test]
    fn test_self_import_scripts() {
        let analysis = parser()
            .analyze("self.importScripts('https://cdn.example.com/x.js');", &base())
            .unwrap();
        assert_eq!(analysis.imports.len(), 1);
        assert_eq!(
            analysis.imports[0].resolved.as_str(),
            "https://cdn.example.com/x.js"
        );
        assert_eq!(analysis.imports[0].argument, "https://cdn.example.com/x.js");
    }

    #[test]
    fn test_non_literal_import_skipped() {
        let source = "importScripts(prefix + 'a.js', 'b.js');";
        let analysis = parser().analyze(source, &base()).unwrap();
        assert_eq!(analysis.imports.len(), 1);
        assert_eq!(analysis.imports[0].argument, "b.js");
    }

    #[test]
    fn test_unresolvable_import_dropped() {
        let analysis = parser()
            .analyze("importScripts('https://', 'ok.js');", &base())
            .unwrap();
        assert_eq!(analysis.imports.len(), 1);
        assert_eq!(analysis.imports[0].argument, "ok.js");
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let result = parser().analyze("self.addEventListener('install', (", &base());
        match result {
            Err(ScriptError::Syntax { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_events_lexicographic_order() {
        let source = "self.addEventListener('sync', a);\n\
                      self.addEventListener('activate', b);\n\
                      self.addEventListener('fetch', c);";
        let analysis = parser().analyze(source, &base()).unwrap();
        let ordered: Vec<&String> = analysis.events.iter().collect();
        assert_eq!(ordered, vec!["activate", "fetch", "sync"]);
    }

    #[test]
    fn test_extract_events_tolerates_errors() {
        let source = "self.addEventListener('push', handler);\nfunction broken( {";
        let events = parser().extract_events(source).unwrap();
        assert!(events.contains("push"));
    }
}
