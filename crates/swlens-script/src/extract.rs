//! Structural extraction of event registrations and import arguments.
//!
//! Matching is by node shape, never by text search, so string content that
//! merely resembles `addEventListener(...)` cannot produce a false positive.

use std::collections::BTreeSet;

use crate::node::SyntaxNode;

/// Accumulated findings from one walk over a syntax tree.
#[derive(Debug, Default)]
pub struct Findings {
    /// Event names from `addEventListener` literals and `self.on*` targets.
    pub events: BTreeSet<String>,
    /// String-literal `importScripts` arguments, in source order.
    pub import_arguments: Vec<String>,
}

/// Walk a tree and collect event registrations and import arguments.
pub fn scan<N: SyntaxNode>(root: &N) -> Findings {
    let mut findings = Findings::default();
    walk(root, &mut findings);
    findings
}

fn walk<N: SyntaxNode>(node: &N, findings: &mut Findings) {
    match node.kind() {
        "call_expression" => visit_call(node, findings),
        "assignment_expression" => visit_assignment(node, findings),
        _ => {}
    }
    // Listeners registered inside callbacks or nested scopes count too.
    for child in node.children() {
        walk(&child, findings);
    }
}

fn visit_call<N: SyntaxNode>(node: &N, findings: &mut Findings) {
    let Some(callee) = node.field("function") else {
        return;
    };
    if is_member_named(&callee, "addEventListener") {
        if let Some(event) = first_literal_argument(node) {
            findings.events.insert(event);
        }
    } else if is_import_scripts(&callee) {
        findings.import_arguments.extend(literal_arguments(node));
    }
}

/// `self.on<name> = ...` registers `<name>`, merged with listener calls.
fn visit_assignment<N: SyntaxNode>(node: &N, findings: &mut Findings) {
    let Some(target) = node.field("left") else {
        return;
    };
    if target.kind() != "member_expression" || !has_self_object(&target) {
        return;
    }
    let Some(property) = target.field("property").and_then(|p| p.text().map(str::to_owned))
    else {
        return;
    };
    if let Some(event) = property.strip_prefix("on").filter(|rest| !rest.is_empty()) {
        findings.events.insert(event.to_string());
    }
}

/// Member access whose property matches `name`, any object expression.
fn is_member_named<N: SyntaxNode>(callee: &N, name: &str) -> bool {
    callee.kind() == "member_expression"
        && callee
            .field("property")
            .map(|p| p.text() == Some(name))
            .unwrap_or(false)
}

/// Bare `importScripts(...)` or the worker-global form `self.importScripts(...)`.
fn is_import_scripts<N: SyntaxNode>(callee: &N) -> bool {
    match callee.kind() {
        "identifier" => callee.text() == Some("importScripts"),
        "member_expression" => {
            has_self_object(callee) && is_member_named(callee, "importScripts")
        }
        _ => false,
    }
}

fn has_self_object<N: SyntaxNode>(member: &N) -> bool {
    member
        .field("object")
        .map(|o| o.kind() == "identifier" && o.text() == Some("self"))
        .unwrap_or(false)
}

/// First argument of a call when it is a string literal.
fn first_literal_argument<N: SyntaxNode>(call: &N) -> Option<String> {
    let arguments = call.field("arguments")?;
    arguments
        .children()
        .into_iter()
        .next()
        .and_then(|argument| string_literal_value(&argument))
}

/// Every string-literal argument of a call, in order. Non-literal arguments
/// are skipped without disturbing their neighbors.
fn literal_arguments<N: SyntaxNode>(call: &N) -> Vec<String> {
    match call.field("arguments") {
        Some(arguments) => arguments
            .children()
            .iter()
            .filter_map(string_literal_value)
            .collect(),
        None => Vec::new(),
    }
}

/// Literal value of a string-shaped node.
///
/// Plain strings and substitution-free template strings both count; a
/// template with `${}` substitutions cannot be resolved statically and
/// yields `None`.
fn string_literal_value<N: SyntaxNode>(node: &N) -> Option<String> {
    match node.kind() {
        "string" => Some(joined_text(node)),
        "template_string" => {
            let children = node.children();
            if children.iter().any(|c| c.kind() == "template_substitution") {
                None
            } else {
                Some(children.iter().filter_map(|c| c.text()).collect())
            }
        }
        _ => None,
    }
}

/// Concatenated named-child text, i.e. the content between the quotes.
fn joined_text<N: SyntaxNode>(node: &N) -> String {
    node.children().iter().filter_map(|c| c.text()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hand-built nodes, enough to drive the matcher without any grammar.
    #[derive(Clone)]
    struct ToyNode {
        kind: &'static str,
        text: &'static str,
        fields: Vec<(&'static str, ToyNode)>,
        children: Vec<ToyNode>,
    }

    impl ToyNode {
        fn leaf(kind: &'static str, text: &'static str) -> Self {
            Self {
                kind,
                text,
                fields: Vec::new(),
                children: Vec::new(),
            }
        }

        fn string(value: &'static str) -> Self {
            Self {
                kind: "string",
                text: value,
                fields: Vec::new(),
                children: vec![Self::leaf("string_fragment", value)],
            }
        }
    }

    impl SyntaxNode for ToyNode {
        fn kind(&self) -> &str {
            self.kind
        }

        fn text(&self) -> Option<&str> {
            Some(self.text)
        }

        fn field(&self, name: &str) -> Option<Self> {
            self.fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, node)| node.clone())
        }

        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }
    }

    fn listener_call(event: &'static str) -> ToyNode {
        let callee = ToyNode {
            kind: "member_expression",
            text: "self.addEventListener",
            fields: vec![
                ("object", ToyNode::leaf("identifier", "self")),
                (
                    "property",
                    ToyNode::leaf("property_identifier", "addEventListener"),
                ),
            ],
            children: Vec::new(),
        };
        let arguments = ToyNode {
            kind: "arguments",
            text: "",
            fields: Vec::new(),
            children: vec![ToyNode::string(event), ToyNode::leaf("identifier", "handler")],
        };
        ToyNode {
            kind: "call_expression",
            text: "",
            fields: vec![("function", callee), ("arguments", arguments)],
            children: Vec::new(),
        }
    }

    #[test]
    fn test_matcher_is_grammar_agnostic() {
        let program = ToyNode {
            kind: "program",
            text: "",
            fields: Vec::new(),
            children: vec![listener_call("push")],
        };
        let findings = scan(&program);
        assert!(findings.events.contains("push"));
        assert!(findings.import_arguments.is_empty());
    }

    #[test]
    fn test_nested_registration_found() {
        let wrapper = ToyNode {
            kind: "statement_block",
            text: "",
            fields: Vec::new(),
            children: vec![listener_call("sync")],
        };
        let program = ToyNode {
            kind: "program",
            text: "",
            fields: Vec::new(),
            children: vec![wrapper],
        };
        assert!(scan(&program).events.contains("sync"));
    }

    #[test]
    fn test_non_member_callee_ignored() {
        // Bare `addEventListener(...)` does not match the member shape.
        let arguments = ToyNode {
            kind: "arguments",
            text: "",
            fields: Vec::new(),
            children: vec![ToyNode::string("fetch")],
        };
        let call = ToyNode {
            kind: "call_expression",
            text: "",
            fields: vec![
                (
                    "function",
                    ToyNode::leaf("identifier", "addEventListener"),
                ),
                ("arguments", arguments),
            ],
            children: Vec::new(),
        };
        let program = ToyNode {
            kind: "program",
            text: "",
            fields: Vec::new(),
            children: vec![call],
        };
        assert!(scan(&program).events.is_empty());
    }

    #[test]
    fn test_import_arguments_keep_order() {
        let callee = ToyNode::leaf("identifier", "importScripts");
        let arguments = ToyNode {
            kind: "arguments",
            text: "",
            fields: Vec::new(),
            children: vec![
                ToyNode::string("b.js"),
                ToyNode::leaf("identifier", "dynamicName"),
                ToyNode::string("a.js"),
            ],
        };
        let call = ToyNode {
            kind: "call_expression",
            text: "",
            fields: vec![("function", callee), ("arguments", arguments)],
            children: Vec::new(),
        };
        let program = ToyNode {
            kind: "program",
            text: "",
            fields: Vec::new(),
            children: vec![call],
        };
        let findings = scan(&program);
        assert_eq!(findings.import_arguments, vec!["b.js", "a.js"]);
    }
}
