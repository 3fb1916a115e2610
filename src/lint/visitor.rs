//! Depth-first dispatch of rule hooks over a syntax tree

use crate::RuleContext;
use crate::rule::Rule;
use kstyle_syntax::ast::{
    BinaryExpression, CallExpression, ClassDeclaration, FunDeclaration, IfExpression,
    ImportList, StringTemplate, ValueArgumentList, WhenExpression,
};
use kstyle_syntax::{ElementType, NodeId};

/// Drive `rule` over the whole tree of `ctx`
///
/// Each node gets its before-hook, then its children in document order, then
/// its after-hook. The children are read after the before-hook has run, and
/// a child which an earlier sibling's autocorrect removed from this node is
/// skipped.
pub fn visit_tree(rule: &mut dyn Rule, ctx: &mut RuleContext<'_>, run_on_root_node_only: bool) {
    ctx.start_traversal();
    let root = ctx.tree().root();
    if run_on_root_node_only {
        ctx.current_node = Some(root);
        dispatch_before(rule, root, ctx);
        ctx.current_node = Some(root);
        dispatch_after(rule, root, ctx);
    } else {
        walk(rule, root, ctx);
    }
    ctx.current_node = None;
    rule.after_last_node(ctx);
}

/// Visit a node and its subtree
pub fn walk(rule: &mut dyn Rule, node: NodeId, ctx: &mut RuleContext<'_>) {
    if !ctx.should_continue_traversal() {
        return;
    }

    ctx.current_node = Some(node);
    dispatch_before(rule, node, ctx);

    if ctx.should_continue_traversal() {
        let children = ctx.tree().children(node).to_vec();
        for child in children {
            if ctx.tree().parent(child) != Some(node) {
                continue;
            }
            walk(rule, child, ctx);
        }
    }

    ctx.current_node = Some(node);
    dispatch_after(rule, node, ctx);
}

/// Call the typed before-hook for `node`, or the generic one when the node
/// has no typed hook or not the expected shape
fn dispatch_before(rule: &mut dyn Rule, node: NodeId, ctx: &mut RuleContext<'_>) {
    let kind = ctx.tree().kind(node);
    match kind {
        ElementType::File => rule.visit_file(node, ctx),
        ElementType::ImportList => match ImportList::cast(ctx.tree(), node) {
            Some(x) => rule.visit_import_list(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::Fun => match FunDeclaration::cast(ctx.tree(), node) {
            Some(x) => rule.visit_fun(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::Class => match ClassDeclaration::cast(ctx.tree(), node) {
            Some(x) => rule.visit_class(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::If => match IfExpression::cast(ctx.tree(), node) {
            Some(x) => rule.visit_if(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::When => match WhenExpression::cast(ctx.tree(), node) {
            Some(x) => rule.visit_when(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::CallExpression => match CallExpression::cast(ctx.tree(), node) {
            Some(x) => rule.visit_call_expression(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::ValueArgumentList => match ValueArgumentList::cast(ctx.tree(), node) {
            Some(x) => rule.visit_value_argument_list(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::BinaryExpression => match BinaryExpression::cast(ctx.tree(), node) {
            Some(x) => rule.visit_binary_expression(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::StringTemplate => match StringTemplate::cast(ctx.tree(), node) {
            Some(x) => rule.visit_string_template(x, ctx),
            None => rule.before_visit_child_nodes(node, ctx),
        },
        ElementType::WhiteSpace => rule.visit_whitespace(node, ctx),
        _ if kind.is_comment() => rule.visit_comment(node, ctx),
        _ => rule.before_visit_child_nodes(node, ctx),
    }
}

fn dispatch_after(rule: &mut dyn Rule, node: NodeId, ctx: &mut RuleContext<'_>) {
    // A before-hook may have replaced the node's shape
    if !ctx.tree().is_attached(node) {
        rule.after_visit_child_nodes(node, ctx);
        return;
    }
    let kind = ctx.tree().kind(node);
    match kind {
        ElementType::File => rule.leave_file(node, ctx),
        ElementType::ImportList => match ImportList::cast(ctx.tree(), node) {
            Some(x) => rule.leave_import_list(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::Fun => match FunDeclaration::cast(ctx.tree(), node) {
            Some(x) => rule.leave_fun(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::Class => match ClassDeclaration::cast(ctx.tree(), node) {
            Some(x) => rule.leave_class(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::If => match IfExpression::cast(ctx.tree(), node) {
            Some(x) => rule.leave_if(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::When => match WhenExpression::cast(ctx.tree(), node) {
            Some(x) => rule.leave_when(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::CallExpression => match CallExpression::cast(ctx.tree(), node) {
            Some(x) => rule.leave_call_expression(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::ValueArgumentList => match ValueArgumentList::cast(ctx.tree(), node) {
            Some(x) => rule.leave_value_argument_list(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::BinaryExpression => match BinaryExpression::cast(ctx.tree(), node) {
            Some(x) => rule.leave_binary_expression(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::StringTemplate => match StringTemplate::cast(ctx.tree(), node) {
            Some(x) => rule.leave_string_template(x, ctx),
            None => rule.after_visit_child_nodes(node, ctx),
        },
        ElementType::WhiteSpace => rule.leave_whitespace(node, ctx),
        _ if kind.is_comment() => rule.leave_comment(node, ctx),
        _ => rule.after_visit_child_nodes(node, ctx),
    }
}
