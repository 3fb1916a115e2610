//! Rule: Trailing comma on call site
//!
//! Multi-line argument lists, collection literals, indices and type
//! argument lists get a trailing comma when
//! `ij_kotlin_allow_trailing_comma_on_call_site` is set; single-line ones
//! never have one.

use super::indentation::INDENT_RULE_ID;
use crate::editor_config::EditorConfig;
use crate::rule::{Rule, RuleId, VisitorModifier};
use crate::syntax_utils::is_whitespace_with_newline;
use crate::RuleContext;
use kstyle_syntax::{ElementType, NodeId, SyntaxTree};

pub const TRAILING_COMMA_ON_CALL_SITE_RULE_ID: RuleId =
    RuleId::new("standard:trailing-comma-on-call-site");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrailingCommaState {
    /// Multi-line with a trailing comma
    Exists,
    /// Multi-line without a trailing comma
    Missing,
    /// Single line with a trailing comma
    Redundant,
    /// Single line without a trailing comma
    NotExists,
}

pub struct TrailingCommaOnCallSiteRule {
    allow_trailing_comma: bool,
}

impl TrailingCommaOnCallSiteRule {
    pub fn new() -> Self {
        Self {
            allow_trailing_comma: true,
        }
    }

    fn report_and_correct(&self, node: NodeId, inspect_node: NodeId, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let inspect_text = tree.text(inspect_node);
        let trailing_comma = tree
            .prev_leaf(inspect_node)
            .and_then(|prev| previous_trailing_comma(tree, prev));

        let state = match (is_multiline(tree, node), trailing_comma.is_some()) {
            (true, true) => TrailingCommaState::Exists,
            (true, false) => TrailingCommaState::Missing,
            (false, true) => TrailingCommaState::Redundant,
            (false, false) => TrailingCommaState::NotExists,
        };

        match (state, trailing_comma) {
            (TrailingCommaState::Exists, Some(comma)) if !self.allow_trailing_comma => {
                remove_trailing_comma(comma, &inspect_text, ctx);
            }
            (TrailingCommaState::Redundant, Some(comma)) => {
                remove_trailing_comma(comma, &inspect_text, ctx);
            }
            (TrailingCommaState::Missing, _) if self.allow_trailing_comma => {
                let Some(prev_code_leaf) = tree.prev_code_leaf(inspect_node) else {
                    return;
                };
                let offset = tree.end_offset(prev_code_leaf);
                let message = format!("Missing trailing comma before \"{inspect_text}\"");
                if ctx.emit(offset, message, true) {
                    insert_trailing_comma(inspect_node, ctx.tree_mut());
                }
            }
            _ => {}
        }
    }
}

impl Default for TrailingCommaOnCallSiteRule {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_trailing_comma(comma: NodeId, inspect_text: &str, ctx: &mut RuleContext<'_>) {
    let offset = ctx.tree().start_offset(comma);
    let message = format!("Unnecessary trailing comma before \"{inspect_text}\"");
    if ctx.emit(offset, message, true) {
        ctx.tree_mut().remove(comma);
    }
}

fn insert_trailing_comma(inspect_node: NodeId, tree: &mut SyntaxTree) {
    let (Some(parent), Some(last_element)) = (
        tree.parent(inspect_node),
        tree.prev_code_sibling(inspect_node),
    ) else {
        return;
    };
    let anchor = tree.next_sibling(last_element);
    let comma = tree.new_leaf(ElementType::Comma, ",");
    tree.add_child_before(parent, comma, anchor);
}

/// The comma directly preceding `leaf`, ignoring whitespace and comments
fn previous_trailing_comma(tree: &SyntaxTree, leaf: NodeId) -> Option<NodeId> {
    let code_leaf = if tree.is_code(leaf) {
        Some(leaf)
    } else {
        tree.prev_code_leaf(leaf)
    };
    code_leaf.filter(|&leaf| tree.kind(leaf) == ElementType::Comma)
}

/// A value argument list is multi-line when some argument is followed by a
/// line break. A collection literal passed as sole argument therefore
/// decides for itself: `foo([` ... `])` is not a multi-line argument list.
fn is_multiline(tree: &SyntaxTree, node: NodeId) -> bool {
    if tree.kind(node) != ElementType::ValueArgumentList {
        return tree.text_contains(node, '\n');
    }
    let Some(first_argument) = tree.find_child_by_type(node, ElementType::ValueArgument) else {
        return false;
    };
    let mut sibling = tree.next_sibling(first_argument);
    while let Some(current) = sibling {
        if is_whitespace_with_newline(tree, current) {
            return true;
        }
        sibling = tree.next_sibling(current);
    }
    false
}

impl Rule for TrailingCommaOnCallSiteRule {
    fn id(&self) -> RuleId {
        TRAILING_COMMA_ON_CALL_SITE_RULE_ID
    }

    fn visitor_modifiers(&self) -> Vec<VisitorModifier> {
        vec![
            VisitorModifier::run_after_active(INDENT_RULE_ID),
            VisitorModifier::RunAsLateAsPossible,
        ]
    }

    fn description(&self) -> &'static str {
        "Enforces trailing commas on multi-line call sites"
    }

    fn before_first_node(&mut self, editor_config: &EditorConfig) {
        self.allow_trailing_comma = editor_config.allow_trailing_comma_on_call_site();
    }

    fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let children = tree.children(node);
        let inspect_node = match tree.kind(node) {
            ElementType::CollectionLiteralExpression | ElementType::Indices => children
                .iter()
                .rev()
                .copied()
                .find(|&child| tree.kind(child) == ElementType::RBracket),
            ElementType::TypeArgumentList => children
                .iter()
                .copied()
                .find(|&child| tree.kind(child) == ElementType::Gt),
            ElementType::ValueArgumentList
                if tree.parent(node).map(|parent| tree.kind(parent))
                    != Some(ElementType::FunctionLiteral) =>
            {
                children
                    .iter()
                    .rev()
                    .copied()
                    .find(|&child| tree.kind(child) == ElementType::RPar)
            }
            _ => None,
        };
        if let Some(inspect_node) = inspect_node {
            self.report_and_correct(node, inspect_node, ctx);
        }
    }
}
