//! Utility functions for working with syntax nodes

use kstyle_syntax::{ElementType, NodeId, SyntaxTree};

pub fn is_whitespace(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.kind(node) == ElementType::WhiteSpace
}

pub fn is_whitespace_with_newline(tree: &SyntaxTree, node: NodeId) -> bool {
    is_whitespace(tree, node) && tree.leaf_text(node).contains('\n')
}

pub fn is_whitespace_without_newline(tree: &SyntaxTree, node: NodeId) -> bool {
    is_whitespace(tree, node) && !tree.leaf_text(node).contains('\n')
}

/// Indentation of the line on which `node` starts, without the newline
///
/// Taken from the closest preceding whitespace that contains a newline, so
/// for a node in the middle of a line this is the indent of that line.
pub fn line_indent(tree: &SyntaxTree, node: NodeId) -> String {
    let mut current = tree.prev_leaf(node);
    while let Some(leaf) = current {
        if is_whitespace_with_newline(tree, leaf) {
            let text = tree.leaf_text(leaf);
            let after_newline = text.rfind('\n').map_or(text, |i| &text[i + 1..]);
            return after_newline.to_string();
        }
        current = tree.prev_leaf(leaf);
    }
    String::new()
}

/// Closest preceding whitespace with a newline, looking only through
/// whitespace and comments
pub fn prev_whitespace_with_newline(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    let mut current = tree.prev_leaf(node);
    while let Some(leaf) = current {
        if is_whitespace_with_newline(tree, leaf) {
            return Some(leaf);
        }
        if tree.is_code(leaf) {
            return None;
        }
        current = tree.prev_leaf(leaf);
    }
    None
}

/// Whether `node` is on the same line as a preceding control flow keyword
pub fn is_on_same_line_as_control_flow_keyword(tree: &SyntaxTree, node: NodeId) -> bool {
    let mut current = tree.prev_leaf(node);
    while let Some(leaf) = current {
        if tree.kind(leaf).is_control_flow_keyword() {
            return true;
        }
        if tree.leaf_text(leaf).contains('\n') {
            return false;
        }
        current = tree.prev_leaf(leaf);
    }
    false
}

/// Text of the line on which `node` starts
///
/// With `drop_trailing_comment`, an end of line comment closing the line is
/// left out together with the whitespace before it.
pub fn line_text(tree: &SyntaxTree, node: NodeId, drop_trailing_comment: bool) -> String {
    let start = tree.first_leaf(node);

    let mut before = Vec::new();
    let mut current = tree.prev_leaf(start);
    while let Some(leaf) = current {
        let text = tree.leaf_text(leaf);
        if let Some(i) = text.rfind('\n') {
            before.push(&text[i + 1..]);
            break;
        }
        before.push(text);
        current = tree.prev_leaf(leaf);
    }

    let mut after: Vec<(ElementType, &str)> = Vec::new();
    let mut current = Some(start);
    while let Some(leaf) = current {
        let text = tree.leaf_text(leaf);
        if let Some(i) = text.find('\n') {
            after.push((tree.kind(leaf), &text[..i]));
            break;
        }
        after.push((tree.kind(leaf), text));
        current = tree.next_leaf(leaf);
    }

    if drop_trailing_comment {
        while after
            .last()
            .is_some_and(|(kind, text)| text.is_empty() || *kind == ElementType::WhiteSpace)
            && after.len() > 1
        {
            after.pop();
        }
        if after.len() > 1 && after.last().is_some_and(|(kind, _)| *kind == ElementType::EolComment) {
            after.pop();
            while after.len() > 1
                && after.last().is_some_and(|(kind, _)| *kind == ElementType::WhiteSpace)
            {
                after.pop();
            }
        }
    }

    let mut line: String = before.into_iter().rev().collect();
    for (_, text) in after {
        line.push_str(text);
    }
    line
}

/// Length in characters of the line on which `node` starts, ignoring a
/// trailing end of line comment
pub fn line_length(tree: &SyntaxTree, node: NodeId) -> usize {
    line_text(tree, node, true).chars().count()
}

/// Set the whitespace directly before `node` to `text`, inserting a
/// whitespace leaf when there is none
pub fn upsert_whitespace_before(tree: &mut SyntaxTree, node: NodeId, text: &str) {
    match tree.prev_leaf(node) {
        Some(prev) if is_whitespace(tree, prev) => tree.replace_leaf_text(prev, text),
        _ => {
            if let Some(parent) = tree.parent(node) {
                let whitespace = tree.new_leaf(ElementType::WhiteSpace, text);
                tree.add_child_before(parent, whitespace, Some(node));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kstyle_syntax::parse;
    use pretty_assertions::assert_eq;

    fn find(tree: &SyntaxTree, kind: ElementType, nth: usize) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|&node| tree.kind(node) == kind)
            .nth(nth)
            .unwrap()
    }

    #[test]
    fn test_line_indent() {
        let tree = parse("fun foo() {\n    bar(1)\n}\n").tree;
        let call = find(&tree, ElementType::CallExpression, 0);
        assert_eq!(line_indent(&tree, call), "    ");
        let args = find(&tree, ElementType::ValueArgumentList, 0);
        assert_eq!(line_indent(&tree, args), "    ");
    }

    #[test]
    fn test_line_text_drops_trailing_comment() {
        let tree = parse("val a = foo(1) // comment\nval b = 2\n").tree;
        let args = find(&tree, ElementType::ValueArgumentList, 0);
        assert_eq!(line_text(&tree, args, false), "val a = foo(1) // comment");
        assert_eq!(line_text(&tree, args, true), "val a = foo(1)");
        assert_eq!(line_length(&tree, args), 14);
    }

    #[test]
    fn test_control_flow_keyword_on_same_line() {
        let tree = parse("if (foo(1)) bar(2)\nbaz(3)\n").tree;
        assert!(is_on_same_line_as_control_flow_keyword(
            &tree,
            find(&tree, ElementType::ValueArgumentList, 0)
        ));
        assert!(!is_on_same_line_as_control_flow_keyword(
            &tree,
            find(&tree, ElementType::ValueArgumentList, 2)
        ));
    }

    #[test]
    fn test_upsert_whitespace_before() {
        let mut tree = parse("foo(1,2)").tree;
        let second = find(&tree, ElementType::ValueArgument, 1);
        upsert_whitespace_before(&mut tree, second, " ");
        assert_eq!(tree.text(tree.root()), "foo(1, 2)");
        upsert_whitespace_before(&mut tree, second, "\n    ");
        assert_eq!(tree.text(tree.root()), "foo(1,\n    2)");
    }
}
