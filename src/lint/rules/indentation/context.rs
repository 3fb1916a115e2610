use kstyle_syntax::{NodeId, SyntaxTree};

/// A range of leaves sharing the same base indentation
///
/// The range runs from the first leaf of `from_node` up to and including
/// `to_node`. A line starting in the range is indented with `node_indent`
/// plus the child indent that applies to its position: `first_child_indent`
/// at the start of the range, `last_child_indent` at its end and
/// `child_indent` in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentContext {
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub node_indent: String,
    pub first_child_indent: String,
    pub child_indent: String,
    pub last_child_indent: String,
    /// Set once a line break has been seen inside the range; from then on
    /// nested contexts build on top of the child indent
    pub activated: bool,
}

impl IndentContext {
    pub fn new(from_node: NodeId, to_node: NodeId, node_indent: String, child_indent: &str) -> Self {
        Self {
            from_node,
            to_node,
            node_indent,
            first_child_indent: child_indent.to_string(),
            child_indent: child_indent.to_string(),
            last_child_indent: child_indent.to_string(),
            activated: false,
        }
    }

    /// Context in which nothing is indented
    pub fn no_indent_zone(tree: &SyntaxTree, node: NodeId) -> Self {
        Self {
            activated: true,
            ..Self::new(node, tree.last_leaf(node), String::new(), "")
        }
    }

    pub fn to(mut self, to_node: NodeId) -> Self {
        self.to_node = to_node;
        self
    }

    pub fn node_indent(mut self, node_indent: impl Into<String>) -> Self {
        self.node_indent = node_indent.into();
        self
    }

    /// Sets the first and last child indents as well
    pub fn child_indent(mut self, child_indent: &str) -> Self {
        self.first_child_indent = child_indent.to_string();
        self.child_indent = child_indent.to_string();
        self.last_child_indent = child_indent.to_string();
        self
    }

    pub fn first_child_indent(mut self, first_child_indent: &str) -> Self {
        self.first_child_indent = first_child_indent.to_string();
        self
    }

    pub fn last_child_indent(mut self, last_child_indent: &str) -> Self {
        self.last_child_indent = last_child_indent.to_string();
        self
    }

    /// Indent that nested contexts start from
    pub fn indent(&self) -> String {
        if self.activated {
            format!("{}{}", self.node_indent, self.child_indent)
        } else {
            self.node_indent.clone()
        }
    }

    /// Expected indent of the line that starts after `whitespace`
    pub fn expected_indent(&self, tree: &SyntaxTree, whitespace: NodeId) -> String {
        let first_leaf = tree.first_leaf(self.from_node);
        let next_leaf = tree.next_leaf(whitespace);
        let child_indent = if whitespace == first_leaf || next_leaf == Some(first_leaf) {
            &self.first_child_indent
        } else if whitespace == self.to_node || next_leaf == Some(self.to_node) {
            &self.last_child_indent
        } else {
            &self.child_indent
        };
        format!("{}{}", self.node_indent, child_indent)
    }

    /// Text covered by the context with tabs and line breaks escaped
    pub fn covered_text(&self, tree: &SyntaxTree) -> String {
        let mut text = String::new();
        let mut current = Some(tree.first_leaf(self.from_node));
        while let Some(leaf) = current {
            text.push_str(tree.leaf_text(leaf));
            if leaf == self.to_node {
                break;
            }
            current = tree.next_leaf(leaf);
        }
        escape_tabs_and_newlines(&text)
    }
}

pub fn escape_tabs_and_newlines(text: &str) -> String {
    let escaped = text.replace('\t', "\\t").replace('\n', "\\n");
    if text.chars().all(char::is_whitespace) {
        format!("[{escaped}]")
    } else {
        escaped
    }
}
