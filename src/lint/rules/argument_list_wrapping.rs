//! Rule: Argument list wrapping
//!
//! When an argument list spans several lines, or does not fit on its line,
//! every argument and the closing parenthesis are put on a line of their
//! own:
//!
//! ```kotlin
//! val x = foo(
//!     a,
//!     b
//! )
//! ```
//!
//! The indent inserted here is provisional; the indent rule runs afterwards
//! and has the final say.

use crate::editor_config::EditorConfig;
use crate::indent_config::IndentConfig;
use crate::rule::{Rule, RuleId};
use crate::syntax_utils::{
    is_on_same_line_as_control_flow_keyword, is_whitespace, is_whitespace_with_newline,
    line_indent, line_length, prev_whitespace_with_newline,
};
use crate::RuleContext;
use kstyle_syntax::ast::ValueArgumentList;
use kstyle_syntax::{ElementType, NodeId, SyntaxTree};

pub const ARGUMENT_LIST_WRAPPING_RULE_ID: RuleId = RuleId::new("standard:argument-list-wrapping");

pub struct ArgumentListWrappingRule {
    indent_config: IndentConfig,
    max_line_length: Option<usize>,
    ignore_when_argument_count_at_least: Option<usize>,
}

impl ArgumentListWrappingRule {
    pub fn new() -> Self {
        Self {
            indent_config: IndentConfig::default(),
            max_line_length: None,
            ignore_when_argument_count_at_least: None,
        }
    }

    fn needs_wrapping(&self, tree: &SyntaxTree, list: NodeId, argument_count: usize) -> bool {
        if argument_count == 0 {
            return false;
        }
        if tree.parent(list).map(|parent| tree.kind(parent)) == Some(ElementType::FunctionLiteral) {
            return false;
        }
        if self
            .ignore_when_argument_count_at_least
            .is_some_and(|threshold| argument_count >= threshold)
        {
            return false;
        }
        contains_newline_ignoring_lambdas(tree, list) || self.exceeds_max_line_length(tree, list)
    }

    fn exceeds_max_line_length(&self, tree: &SyntaxTree, list: NodeId) -> bool {
        match self.max_line_length {
            Some(max_line_length) => {
                line_length(tree, list) > max_line_length && !tree.text_contains(list, '\n')
            }
            None => false,
        }
    }

    /// Indent of the closing parenthesis, including the leading newline
    fn closing_indent(&self, tree: &SyntaxTree, list: NodeId) -> String {
        let current_level = self.indent_config.indent_level_from(&line_indent(tree, list));
        let mut level = if current_level > 0
            && (has_multiline_type_arguments_in_front(tree, list)
                || is_part_of_dot_qualified_assignment(tree, list))
        {
            current_level - 1
        } else {
            current_level
        };
        if is_on_same_line_as_control_flow_keyword(tree, list) {
            level += 1;
        }
        format!("\n{}", self.indent_config.indent().repeat(level))
    }

    fn wrap_child(&self, list: NodeId, child: NodeId, closing_indent: &str, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let kind = tree.kind(child);
        match kind {
            ElementType::LPar => {
                if let Some(prev) = tree.prev_leaf(child) {
                    if is_whitespace_with_newline(tree, prev) {
                        let offset = tree.start_offset(child);
                        if ctx.emit(offset, "Unnecessary newline before \"(\"", true) {
                            ctx.tree_mut().remove(prev);
                        }
                    }
                }
            }
            ElementType::ValueArgument | ElementType::RPar => {
                // Already wrapped; the indent rule checks the indent size
                if prev_whitespace_with_newline(tree, child).is_some() {
                    return;
                }
                let intended_indent = if kind == ElementType::ValueArgument {
                    format!("{closing_indent}{}", self.indent_config.indent())
                } else {
                    closing_indent.to_string()
                };
                let message = if kind == ElementType::ValueArgument {
                    "Argument should be on a separate line (unless all arguments can fit a single line)"
                } else {
                    "Missing newline before \")\""
                };
                let offset = tree.start_offset(child);
                let prev_whitespace = tree.prev_leaf(child).filter(|&prev| is_whitespace(tree, prev));
                if ctx.emit(offset, message, true) {
                    let tree = ctx.tree_mut();
                    match prev_whitespace {
                        Some(whitespace) => tree.replace_leaf_text(whitespace, intended_indent),
                        None => {
                            let whitespace = tree.new_leaf(ElementType::WhiteSpace, intended_indent);
                            tree.add_child_before(list, whitespace, Some(child));
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

impl Default for ArgumentListWrappingRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a line break occurs directly in the list or in one of its
/// arguments, not counting line breaks inside lambdas and nested calls
fn contains_newline_ignoring_lambdas(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.children(node).iter().any(|&child| match tree.kind(child) {
        ElementType::WhiteSpace | ElementType::CollectionLiteralExpression => {
            tree.text_contains(child, '\n')
        }
        ElementType::ValueArgument => tree
            .children(child)
            .iter()
            .any(|&grandchild| contains_newline_ignoring_lambdas(tree, grandchild)),
        _ => false,
    })
}

/// `foo<\n  T\n>(...)`
fn has_multiline_type_arguments_in_front(tree: &SyntaxTree, list: NodeId) -> bool {
    tree.parent(list)
        .and_then(|call| tree.find_child_by_type(call, ElementType::TypeArgumentList))
        .is_some_and(|type_arguments| {
            tree.children(type_arguments)
                .iter()
                .any(|&child| is_whitespace_with_newline(tree, child))
        })
}

/// `foo\n    .bar = Baz(...)`
fn is_part_of_dot_qualified_assignment(tree: &SyntaxTree, list: NodeId) -> bool {
    tree.parent(list)
        .and_then(|call| tree.parent(call))
        .filter(|&grandparent| tree.kind(grandparent) == ElementType::BinaryExpression)
        .is_some_and(|binary| {
            tree.find_child_by_type(binary, ElementType::DotQualifiedExpression)
                .is_some()
        })
}

impl Rule for ArgumentListWrappingRule {
    fn id(&self) -> RuleId {
        ARGUMENT_LIST_WRAPPING_RULE_ID
    }

    fn description(&self) -> &'static str {
        "Puts every argument on a separate line when the argument list is wrapped"
    }

    fn before_first_node(&mut self, editor_config: &EditorConfig) {
        self.indent_config = IndentConfig::from_editor_config(editor_config);
        self.max_line_length = editor_config.max_line_length();
        self.ignore_when_argument_count_at_least =
            editor_config.argument_list_wrapping_ignore_threshold();
    }

    fn visit_value_argument_list(
        &mut self,
        arguments: ValueArgumentList,
        ctx: &mut RuleContext<'_>,
    ) {
        if self.indent_config.disabled() {
            return;
        }
        let list = arguments.node();
        let tree = ctx.tree();
        let argument_count = arguments.arguments(tree).len();
        if !self.needs_wrapping(tree, list, argument_count) {
            return;
        }

        let closing_indent = self.closing_indent(tree, list);
        let children = tree.children(list).to_vec();
        for child in children {
            if ctx.tree().parent(child) == Some(list) {
                self.wrap_child(list, child, &closing_indent, ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleProvider;
    use crate::rules::test_support::{format_with, lint_with};
    use pretty_assertions::assert_eq;

    const ARGUMENT_MESSAGE: &str =
        "Argument should be on a separate line (unless all arguments can fit a single line)";

    fn providers() -> Vec<RuleProvider> {
        vec![RuleProvider::new(|| Box::new(ArgumentListWrappingRule::new()))]
    }

    #[test]
    fn test_arguments_fitting_on_the_line() {
        assert!(lint_with(providers(), &[], "val x = foo(1, 2)\n").is_empty());
    }

    #[test]
    fn test_wrap_when_line_is_too_long() {
        let properties = [("max_line_length", "5")];
        let code = "foo(1, 2)\n";
        assert_eq!(
            lint_with(providers(), &properties, code),
            vec![
                (1, 5, ARGUMENT_MESSAGE.to_string()),
                (1, 8, ARGUMENT_MESSAGE.to_string()),
                (1, 9, "Missing newline before \")\"".to_string()),
            ]
        );
        assert_eq!(
            format_with(providers(), &properties, code),
            "foo(\n    1,\n    2\n)\n"
        );
    }

    #[test]
    fn test_wrap_when_some_argument_is_wrapped() {
        let code = "fun f() {\n    foo(1,\n        2)\n}\n";
        assert_eq!(
            lint_with(providers(), &[], code),
            vec![
                (2, 9, ARGUMENT_MESSAGE.to_string()),
                (3, 10, "Missing newline before \")\"".to_string()),
            ]
        );
        assert_eq!(
            format_with(providers(), &[], code),
            "fun f() {\n    foo(\n        1,\n        2\n    )\n}\n"
        );
    }

    #[test]
    fn test_newlines_in_lambdas_are_ignored() {
        let code = "val x = foo(1, bar {\n    2\n})\n";
        assert!(lint_with(providers(), &[], code).is_empty());
    }

    #[test]
    fn test_ignore_threshold() {
        let properties = [
            ("max_line_length", "5"),
            (
                "ktlint_argument_list_wrapping_ignore_when_parameter_count_greater_or_equal_than",
                "2",
            ),
        ];
        assert!(lint_with(providers(), &properties, "foo(1, 2)\n").is_empty());
    }

    #[test]
    fn test_same_line_as_control_flow_keyword() {
        let properties = [("max_line_length", "10")];
        let code = "if (foo(1, 2)) bar()\n";
        assert_eq!(
            format_with(providers(), &properties, code),
            "if (foo(\n        1,\n        2\n    )) bar()\n"
        );
    }

    #[test]
    fn test_disabled_indent() {
        let properties = [("max_line_length", "5"), ("indent_size", "unset")];
        assert!(lint_with(providers(), &properties, "foo(1, 2)\n").is_empty());
    }
}
