//! Parser-independent view of a syntax tree.
//!
//! The matching rules in [`crate::extract`] only need node kinds, covered
//! source text, grammar-field lookup and named children, so they are written
//! against the [`SyntaxNode`] trait instead of a concrete parser API. The
//! tree-sitter adapter lives here as well.

/// Minimal tree interface the extraction pass works against.
pub trait SyntaxNode: Sized {
    /// Grammar kind name for this node (e.g. `call_expression`).
    fn kind(&self) -> &str;

    /// Source text covered by this node, when it decodes cleanly.
    fn text(&self) -> Option<&str>;

    /// Child occupying a named grammar field (e.g. `function`, `arguments`).
    fn field(&self, name: &str) -> Option<Self>;

    /// Named children in document order.
    fn children(&self) -> Vec<Self>;
}

/// [`SyntaxNode`] adapter over a tree-sitter node and its source buffer.
#[derive(Clone, Copy)]
pub struct SourceNode<'a> {
    node: tree_sitter::Node<'a>,
    source: &'a str,
}

impl<'a> SourceNode<'a> {
    pub fn new(node: tree_sitter::Node<'a>, source: &'a str) -> Self {
        Self { node, source }
    }
}

impl<'a> SyntaxNode for SourceNode<'a> {
    fn kind(&self) -> &str {
        self.node.kind()
    }

    fn text(&self) -> Option<&str> {
        self.node.utf8_text(self.source.as_bytes()).ok()
    }

    fn field(&self, name: &str) -> Option<Self> {
        self.node
            .child_by_field_name(name)
            .map(|node| Self::new(node, self.source))
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .map(|node| Self::new(node, self.source))
            .collect()
    }
}
