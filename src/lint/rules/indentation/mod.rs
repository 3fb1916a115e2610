//! Rule: Indentation
//!
//! Every line break is checked against a stack of [`IndentContext`]s. A
//! context is pushed when the traversal enters a construct which changes
//! the indentation of the lines inside it, and popped once the last leaf it
//! covers has been visited. The whitespace following a line break must then
//! match the expected indent of the context on top of the stack.
//!
//! Constructs with several parts (an `if` with its condition and branches, a
//! function with its signature and body) push one context per part. These
//! are pushed in reverse document order so that the part which comes first
//! ends up on top of the stack.

pub mod context;
pub mod string_template;

use super::argument_list_wrapping::ARGUMENT_LIST_WRAPPING_RULE_ID;
use crate::RuleContext;
use crate::editor_config::{CodeStyle, EditorConfig, IndentStyle};
use crate::indent_config::IndentConfig;
use crate::rule::{Rule, RuleId, VisitorModifier};
use crate::syntax_utils::{is_whitespace, is_whitespace_with_newline, is_whitespace_without_newline};
use context::{IndentContext, escape_tabs_and_newlines};
use kstyle_syntax::ast::{
    BinaryExpression, ClassDeclaration, FunDeclaration, IfExpression, StringTemplate,
    WhenExpression,
};
use kstyle_syntax::{ElementType, NodeId, SyntaxTree};
use string_template::StringTemplateIndenter;

pub const INDENT_RULE_ID: RuleId = RuleId::new("standard:indent");

const KDOC_CONTINUATION_INDENT: &str = " ";

pub struct IndentationRule {
    code_style: CodeStyle,
    indent_config: IndentConfig,
    indent_before_arrow_on_new_line: bool,
    line: usize,
    stack: Vec<IndentContext>,
    string_template_indenter: StringTemplateIndenter,
}

impl IndentationRule {
    pub fn new() -> Self {
        Self {
            code_style: CodeStyle::default(),
            indent_config: IndentConfig::default(),
            indent_before_arrow_on_new_line: false,
            line: 1,
            stack: Vec::new(),
            string_template_indenter: StringTemplateIndenter::new(
                CodeStyle::default(),
                IndentConfig::default(),
            ),
        }
    }

    fn is_official(&self) -> bool {
        self.code_style == CodeStyle::KtlintOfficial
    }

    fn current_indent(&self) -> String {
        self.stack.last().map(IndentContext::indent).unwrap_or_default()
    }

    /// Context from `from` to `to` which inherits the current indent and
    /// indents its children one level
    fn context(&self, tree: &SyntaxTree, from: NodeId, to: Option<NodeId>) -> IndentContext {
        let to = to.unwrap_or_else(|| tree.last_leaf(from));
        IndentContext::new(from, to, self.current_indent(), self.indent_config.indent())
    }

    /// Push `context` and return the code leaf in front of it, which is where
    /// the next outer part of a multi-part construct ends
    fn start_indent_context(&mut self, ctx: &RuleContext<'_>, context: IndentContext) -> Option<NodeId> {
        let tree = ctx.tree();
        let logger = ctx.logger();
        if logger.can_log_trace() {
            logger.log_trace(&format!(
                "Create new indent context with level ({}, {}) for {}: {}",
                self.indent_config.indent_level_from(&context.node_indent),
                self.indent_config.indent_level_from(&context.child_indent),
                tree.kind(context.from_node).as_str(),
                context.covered_text(tree)
            ));
        }
        let prev_code_leaf = tree.prev_code_leaf(context.from_node);
        self.stack.push(context);
        prev_code_leaf
    }

    /// Push a context covering `node` up to its last leaf
    fn start_default_context(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let context = self.context(ctx.tree(), node, None);
        self.start_indent_context(ctx, context);
    }

    fn visit_lbrace(&mut self, lbrace: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let mut sibling = tree.next_sibling(lbrace);
        let rbrace = loop {
            match sibling {
                Some(node) if tree.kind(node) == ElementType::RBrace => break node,
                Some(node) => sibling = tree.next_sibling(node),
                None => return,
            }
        };
        let outer = self
            .context(tree, lbrace, Some(rbrace))
            .first_child_indent("")
            .last_child_indent("");
        self.start_indent_context(ctx, outer);

        let arrow = tree
            .parent(lbrace)
            .filter(|&parent| tree.kind(parent) == ElementType::FunctionLiteral)
            .and_then(|function_literal| tree.find_child_by_type(function_literal, ElementType::Arrow));
        if let Some(arrow) = arrow {
            let body = self.context(tree, arrow, Some(rbrace)).last_child_indent("");
            self.start_indent_context(ctx, body);
            if let Some(last_parameter_leaf) = tree.prev_code_leaf(arrow) {
                let parameters_indent = self.function_literal_parameters_indent(tree, arrow);
                let parameters = self
                    .context(tree, lbrace, Some(last_parameter_leaf))
                    .child_indent(&parameters_indent);
                self.start_indent_context(ctx, parameters);
            }
        }
    }

    /// Indent of lambda parameters wrapped onto several lines
    fn function_literal_parameters_indent(&self, tree: &SyntaxTree, arrow: NodeId) -> String {
        let indent = self.indent_config.indent();
        let function_literal = tree.parent(arrow);
        let first_parameter_on_new_line = function_literal
            .and_then(|literal| tree.find_child_by_type(literal, ElementType::ValueParameterList))
            .is_some_and(|parameters| {
                let mut sibling = tree.prev_sibling(parameters);
                while let Some(node) = sibling {
                    if tree.text_contains(node, '\n') {
                        return true;
                    }
                    sibling = tree.prev_sibling(node);
                }
                false
            });
        if first_parameter_on_new_line {
            return if self.is_official() {
                indent.to_string()
            } else {
                indent.repeat(2)
            };
        }

        // Parameters aligned with the first one, which follows "{ "
        match function_literal {
            Some(literal) if tree.is_part_of(arrow, ElementType::CallExpression) => {
                let mut column = 0;
                let mut current = tree.prev_leaf(literal);
                while let Some(leaf) = current {
                    if is_whitespace_with_newline(tree, leaf) {
                        break;
                    }
                    column += tree.text_len(leaf);
                    current = tree.prev_leaf(leaf);
                }
                " ".repeat(column + 2)
            }
            _ => indent.repeat(2),
        }
    }

    fn visit_lpar_before_condition(&mut self, lpar: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let (Some(from), Some(condition)) = (tree.next_leaf(lpar), tree.next_code_sibling(lpar)) else {
            return;
        };
        let node_indent = format!("{}{}", self.current_indent(), self.indent_config.indent());
        let context = IndentContext::new(from, tree.last_leaf(condition), node_indent, "");
        self.start_indent_context(ctx, context);
    }

    fn visit_value_parameter(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let mut next_to = tree.last_leaf(node);
        if let Some(eq) = tree.find_child_by_type(node, ElementType::Eq) {
            let context = self.context(tree, eq, Some(next_to));
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        if self.is_official() {
            if let Some(colon) = tree.find_child_by_type(node, ElementType::Colon) {
                let context = self.context(tree, colon, Some(next_to));
                next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
            }
        }
        let context = self.context(tree, node, Some(next_to)).child_indent("");
        self.start_indent_context(ctx, context);
    }

    fn visit_dot_qualified(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let parent = tree.parent(node);
        let parent_kind = parent.map(|parent| tree.kind(parent));
        let call_around_array_access = parent
            .filter(|_| parent_kind == Some(ElementType::ArrayAccessExpression))
            .and_then(|array_access| tree.parent(array_access))
            .filter(|&grandparent| tree.kind(grandparent) == ElementType::CallExpression);

        match (call_around_array_access, parent) {
            // foo
            //     .bar[0] {
            //         "foobar"
            //     }
            (Some(call), Some(array_access))
                if self.is_official() && tree.kind(node) == ElementType::DotQualifiedExpression =>
            {
                let context = self.context(tree, array_access, Some(tree.last_leaf(call)));
                self.start_indent_context(ctx, context);
            }
            _ if tree
                .prev_code_sibling(node)
                .is_some_and(|sibling| is_elvis_operator(tree, sibling)) =>
            {
                self.start_default_context(node, ctx);
            }
            // A chain on a single level does not indent for every call
            _ if matches!(
                parent_kind,
                Some(ElementType::DotQualifiedExpression | ElementType::SafeAccessExpression)
            ) => {}
            _ => self.start_default_context(node, ctx),
        }
    }

    fn visit_when_entry(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let Some(arrow) = tree.find_child_by_type(node, ElementType::Arrow) else {
            return;
        };
        let mut prev_sibling = tree.prev_sibling(arrow);
        while let Some(sibling) = prev_sibling {
            if !tree.is_part_of_comment(sibling) {
                break;
            }
            prev_sibling = tree.prev_sibling(sibling);
        }
        let last_leaf = tree.last_leaf(node);

        match prev_sibling {
            Some(whitespace)
                if self.indent_before_arrow_on_new_line
                    && is_whitespace_with_newline(tree, whitespace) =>
            {
                let body_is_block = tree
                    .next_code_sibling(arrow)
                    .is_some_and(|body| tree.kind(body) == ElementType::Block);
                if body_is_block && !self.is_official() {
                    let context = self
                        .context(tree, whitespace, Some(last_leaf))
                        .child_indent("")
                        .first_child_indent(self.indent_config.indent());
                    self.start_indent_context(ctx, context);
                } else {
                    if let Some(after_arrow) = tree.next_leaf(arrow) {
                        let context = self.context(tree, after_arrow, Some(last_leaf));
                        self.start_indent_context(ctx, context);
                    }
                    if let Some(before_arrow) = tree.prev_leaf(whitespace) {
                        let context = self.context(tree, node, Some(before_arrow)).child_indent("");
                        self.start_indent_context(ctx, context);
                    }
                }
            }
            _ => {
                if let Some(after_arrow) = tree.next_leaf(arrow) {
                    let context = self.context(tree, after_arrow, Some(last_leaf));
                    self.start_indent_context(ctx, context);
                }
                let context = self.context(tree, node, Some(arrow)).child_indent("");
                self.start_indent_context(ctx, context);
            }
        }
    }

    fn visit_kdoc(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let from = tree
            .find_child_by_type(node, ElementType::KdocStart)
            .and_then(|start| tree.next_leaf(start));
        if let Some(from) = from {
            let context = self
                .context(tree, from, Some(tree.last_leaf(node)))
                .child_indent(KDOC_CONTINUATION_INDENT);
            self.start_indent_context(ctx, context);
        }
    }

    fn visit_conditional_loop(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let body = tree
            .find_child_by_type(node, ElementType::Body)
            .filter(|&body| first_code_leaf(tree, body).map(|leaf| tree.kind(leaf)) != Some(ElementType::LBrace));
        if let Some(body) = body {
            let context = self.context(tree, body, Some(tree.last_leaf(node)));
            self.start_indent_context(ctx, context);
        }
        if let Some(condition) = tree.find_child_by_type(node, ElementType::Condition) {
            self.start_default_context(condition, ctx);
        }
    }

    fn visit_lbracket(&mut self, lbracket: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let rbracket = tree
            .parent(lbracket)
            .and_then(|parent| tree.find_child_by_type(parent, ElementType::RBracket));
        if let Some(rbracket) = rbracket {
            let context = self
                .context(tree, lbracket, Some(rbracket))
                .first_child_indent("")
                .last_child_indent("");
            self.start_indent_context(ctx, context);
        }
    }

    fn visit_nullable_type(&mut self, node: NodeId, ctx: &RuleContext<'_>) {
        let tree = ctx.tree();
        let mut next_to = tree.last_leaf(node);
        if let Some(rpar) = tree.find_child_by_type(node, ElementType::RPar) {
            let context = self.context(tree, rpar, Some(next_to)).child_indent("");
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        let context = self.context(tree, node, Some(next_to));
        self.start_indent_context(ctx, context);
    }

    fn visit_closing_quote_indent(&mut self, entry: NodeId, ctx: &mut RuleContext<'_>) {
        let template = ctx
            .tree()
            .parent(entry)
            .and_then(|parent| StringTemplate::cast(ctx.tree(), parent));
        if let Some(template) = template {
            let expected_indent = self.current_indent();
            self.string_template_indenter
                .visit_closing_quotes(&expected_indent, template, ctx);
        }
    }

    fn visit_new_line_indentation(&mut self, whitespace: NodeId, ctx: &mut RuleContext<'_>) {
        if ignore_indent(ctx.tree(), whitespace) {
            return;
        }
        let text = ctx.tree().leaf_text(whitespace).to_string();
        let node_indent = text_after_last_newline(&text).to_string();
        let normalized_indent = self.normalized_indent(whitespace, &text, &node_indent, ctx);
        let Some(top) = self.stack.last() else {
            return;
        };
        let expected_indent = top.expected_indent(ctx.tree(), whitespace);
        if node_indent == normalized_indent && normalized_indent == expected_indent {
            return;
        }

        let autocorrect = if normalized_indent != expected_indent {
            let offset = ctx.tree().start_offset(whitespace) + text.len() - node_indent.len();
            ctx.emit(
                offset,
                format!(
                    "Unexpected indentation ({}) (should be {})",
                    normalized_indent.len(),
                    expected_indent.len()
                ),
                true,
            )
        } else {
            // Only the indent characters were wrong, which is already reported
            true
        };

        let logger = ctx.logger();
        if logger.can_log_trace() {
            logger.log_trace(&format!(
                "Line {}: {}changed indentation to {} (from {}) for {}: {}",
                self.line,
                if autocorrect { "" } else { "would have " },
                expected_indent.len(),
                normalized_indent.len(),
                ElementType::WhiteSpace.as_str(),
                escape_tabs_and_newlines(&text)
            ));
        }
        if autocorrect {
            let before_newline = text.rfind('\n').map_or("", |index| &text[..index]);
            ctx.tree_mut()
                .replace_leaf_text(whitespace, format!("{before_newline}\n{expected_indent}"));
        }
    }

    /// The indent after the last line break in `text`, converted to the
    /// configured indent style when the conversion is allowed
    fn normalized_indent(
        &self,
        whitespace: NodeId,
        text: &str,
        node_indent: &str,
        ctx: &mut RuleContext<'_>,
    ) -> String {
        let offset = ctx.tree().start_offset(whitespace) + text.len() - node_indent.len();
        match self.indent_config.indent_style {
            IndentStyle::Space => {
                if node_indent.contains('\t')
                    && ctx.emit(offset, "Unexpected tab character(s)", true)
                {
                    self.indent_config.to_normalized_indent(node_indent)
                } else {
                    node_indent.to_string()
                }
            }
            IndentStyle::Tab => {
                let trailing_spaces = acceptable_trailing_spaces(ctx.tree(), whitespace, node_indent);
                let without_trailing_spaces = &node_indent[..node_indent.len() - trailing_spaces.len()];
                if without_trailing_spaces.contains(' ')
                    && ctx.emit(offset, "Unexpected space character(s)", true)
                {
                    format!(
                        "{}{trailing_spaces}",
                        self.indent_config.to_normalized_indent(without_trailing_spaces)
                    )
                } else {
                    node_indent.to_string()
                }
            }
        }
    }
}

impl Default for IndentationRule {
    fn default() -> Self {
        Self::new()
    }
}

fn text_after_last_newline(text: &str) -> &str {
    text.rfind('\n').map_or(text, |index| &text[index + 1..])
}

fn is_elvis_operator(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.kind(node) == ElementType::OperationReference
        && tree
            .first_child(node)
            .is_some_and(|operator| tree.kind(operator) == ElementType::Elvis)
}

fn first_code_leaf(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    let first = tree.first_leaf(node);
    if tree.is_code(first) {
        Some(first)
    } else {
        tree.next_code_leaf(first)
    }
}

/// Whitespace and comments directly in front of `node`, or `node` itself
fn preceding_comments_and_whitespace(tree: &SyntaxTree, node: NodeId) -> NodeId {
    let mut from = node;
    while let Some(prev) = tree.prev_leaf(from) {
        if !is_whitespace(tree, prev) && !tree.is_part_of_comment(prev) {
            break;
        }
        from = prev;
    }
    from
}

/// Binary expression nested, possibly through other binary expressions, in
/// the condition of an `if` or `while`
fn is_part_of_binary_expression_wrapped_in_condition(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.ancestors(node)
        .take_while(|&ancestor| {
            matches!(
                tree.kind(ancestor),
                ElementType::BinaryExpression | ElementType::Condition
            )
        })
        .last()
        .is_some_and(|ancestor| tree.kind(ancestor) == ElementType::Condition)
}

/// Line breaks whose indent is not up to this rule
fn ignore_indent(tree: &SyntaxTree, whitespace: NodeId) -> bool {
    let text = tree.leaf_text(whitespace);
    let Some(next_leaf) = tree.next_leaf(whitespace) else {
        return false;
    };
    // Raw strings may start at column 0
    if text.ends_with('\n')
        && tree.kind(next_leaf) == ElementType::OpenQuote
        && tree.leaf_text(next_leaf) == "\"\"\""
    {
        return true;
    }

    let comment = if tree.kind(next_leaf).is_comment() {
        Some(next_leaf)
    } else {
        tree.find_ancestor(next_leaf, ElementType::is_comment)
    };
    match comment {
        // Comments may start at column 0
        Some(_) if text.ends_with('\n') => true,
        // The layout inside a block comment is free
        Some(comment) => {
            tree.kind(comment) == ElementType::BlockComment && tree.text_contains(comment, '\n')
        }
        None => false,
    }
}

/// The space every line of a KDoc ends its indent with, even when indenting
/// with tabs
fn acceptable_trailing_spaces(tree: &SyntaxTree, whitespace: NodeId, node_indent: &str) -> &'static str {
    let in_kdoc = tree.next_leaf(whitespace).is_some_and(|leaf| {
        matches!(
            tree.kind(leaf),
            ElementType::KdocLeadingAsterisk | ElementType::KdocEnd
        )
    });
    if in_kdoc && node_indent.ends_with(KDOC_CONTINUATION_INDENT) {
        KDOC_CONTINUATION_INDENT
    } else {
        ""
    }
}

impl Rule for IndentationRule {
    fn id(&self) -> RuleId {
        INDENT_RULE_ID
    }

    fn visitor_modifiers(&self) -> Vec<VisitorModifier> {
        vec![
            VisitorModifier::RunAsLateAsPossible,
            VisitorModifier::run_after_if_active(ARGUMENT_LIST_WRAPPING_RULE_ID),
        ]
    }

    fn description(&self) -> &'static str {
        "Checks the indentation of every line"
    }

    fn before_first_node(&mut self, editor_config: &EditorConfig) {
        self.code_style = editor_config.code_style();
        self.indent_config = IndentConfig::from_editor_config(editor_config);
        self.indent_before_arrow_on_new_line = editor_config.indent_before_arrow_on_new_line();
        self.string_template_indenter =
            StringTemplateIndenter::new(self.code_style, self.indent_config.clone());
        self.line = 1;
        self.stack.clear();
    }

    fn visit_file(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        if self.indent_config.disabled() {
            ctx.stop_traversal();
            return;
        }

        // A file does not start with indentation
        let first_leaf = ctx.tree().first_leaf(node);
        if first_leaf != node
            && is_whitespace_without_newline(ctx.tree(), first_leaf)
            && ctx.emit(0, "Unexpected indentation", true)
        {
            ctx.tree_mut().remove(first_leaf);
        }
        self.stack.push(IndentContext::no_indent_zone(ctx.tree(), node));
    }

    fn visit_whitespace(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        if !ctx.tree().leaf_text(node).contains('\n') {
            return;
        }
        self.line += 1;
        if let Some(top) = self.stack.last_mut() {
            top.activated = true;
        }
        self.visit_new_line_indentation(node, ctx);
    }

    fn visit_if(&mut self, if_expression: IfExpression, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let node = if_expression.node();
        let mut next_to = tree.last_leaf(node);
        if let Some(else_branch) = if_expression.else_branch(tree) {
            let context = self.context(tree, else_branch, Some(next_to));
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        let after_then = if_expression
            .then_branch(tree)
            .and_then(|then| tree.next_leaf(tree.last_leaf(then)));
        if let Some(after_then) = after_then {
            let context = self.context(tree, after_then, Some(next_to)).child_indent("");
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        let after_condition = tree
            .find_child_by_type(node, ElementType::RPar)
            .and_then(|rpar| tree.next_code_leaf(rpar));
        if let Some(after_condition) = after_condition {
            let context = self.context(tree, after_condition, Some(next_to));
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        // The closing parenthesis of the condition is not indented
        let context = self.context(tree, node, Some(next_to)).last_child_indent("");
        self.start_indent_context(ctx, context);
    }

    fn visit_fun(&mut self, fun: FunDeclaration, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let node = fun.node();
        let mut next_to = tree.last_leaf(node);
        if let Some(body) = fun.eq(tree).or_else(|| fun.body_block(tree)) {
            let context = self.context(tree, body, Some(next_to));
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        if let Some(type_reference) = fun.type_reference(tree) {
            let from = preceding_comments_and_whitespace(tree, type_reference);
            let context = self.context(tree, from, Some(next_to));
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        // Leading comments are indented like the function itself
        let context = self.context(tree, node, Some(next_to)).child_indent("");
        self.start_indent_context(ctx, context);
    }

    fn visit_class(&mut self, class: ClassDeclaration, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let node = class.node();
        let mut next_to = tree.last_leaf(node);
        let first_super_type = tree
            .find_child_by_type(node, ElementType::Colon)
            .and_then(|colon| tree.next_code_sibling(colon));
        if let Some(first_super_type) = first_super_type {
            let last_super_type_leaf = match class.body(tree) {
                Some(body) => tree.prev_code_leaf(body).unwrap_or(next_to),
                None => next_to,
            };
            let from = preceding_comments_and_whitespace(tree, first_super_type);
            let context = self.context(tree, from, Some(last_super_type_leaf));
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        let context = self.context(tree, node, Some(next_to)).child_indent("");
        self.start_indent_context(ctx, context);
    }

    fn visit_when(&mut self, when: WhenExpression, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let node = when.node();
        let mut next_to = tree.last_leaf(node);
        if let (Some(lpar), Some(rpar)) = (when.lpar(tree), when.rpar(tree)) {
            let context = self.context(tree, lpar, Some(rpar)).last_child_indent("");
            next_to = self.start_indent_context(ctx, context).unwrap_or(next_to);
        }
        let context = self.context(tree, node, Some(next_to));
        self.start_indent_context(ctx, context);
    }

    fn visit_binary_expression(&mut self, expression: BinaryExpression, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let node = expression.node();
        if is_part_of_binary_expression_wrapped_in_condition(tree, node) {
            // The operator and right-hand side continue at the indent of the
            // enclosing condition, which is not necessarily on top of the stack
            let condition_context = self
                .stack
                .iter()
                .rev()
                .find(|context| tree.kind(context.from_node) != ElementType::BinaryExpression)
                .map(|context| (context.node_indent.clone(), context.child_indent.clone()));
            let (Some((node_indent, child_indent)), Some(operation)) =
                (condition_context, expression.operation_reference(tree))
            else {
                return;
            };
            let context = IndentContext::new(operation, tree.last_leaf(node), node_indent, &child_indent);
            self.start_indent_context(ctx, context);
            if let Some(left) = expression.left(tree) {
                self.start_default_context(left, ctx);
            }
        } else if tree.parent(node).map(|parent| tree.kind(parent)) != Some(ElementType::BinaryExpression)
            || expression.operator(tree) == Some(ElementType::Elvis)
        {
            self.start_default_context(node, ctx);
        }
    }

    fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let parent_kind = tree.parent(node).map(|parent| tree.kind(parent));
        match tree.kind(node) {
            ElementType::LongStringTemplateEntry
            | ElementType::StringTemplate
            | ElementType::ValueArgumentList => {
                let context = self.context(tree, node, None).last_child_indent("");
                self.start_indent_context(ctx, context);
            }
            ElementType::ValueArgument if self.is_official() => {
                let context = self.context(tree, node, None).last_child_indent("");
                self.start_indent_context(ctx, context);
            }
            ElementType::Parenthesized => {
                if self.is_official() {
                    let context = self.context(tree, node, None).last_child_indent("");
                    self.start_indent_context(ctx, context);
                } else {
                    let grandparent_kind = tree
                        .parent(node)
                        .and_then(|parent| tree.parent(parent))
                        .map(|grandparent| tree.kind(grandparent));
                    if grandparent_kind != Some(ElementType::If) {
                        self.start_default_context(node, ctx);
                    }
                }
            }
            ElementType::TypeArgumentList => {
                if self.is_official() {
                    let context = self.context(tree, node, None).last_child_indent("");
                    self.start_indent_context(ctx, context);
                } else {
                    self.start_default_context(node, ctx);
                }
            }
            ElementType::UserType | ElementType::PrefixExpression => {
                self.start_default_context(node, ctx);
            }
            ElementType::TypeReference => {
                let context = self.context(tree, node, None).child_indent("");
                self.start_indent_context(ctx, context);
            }
            ElementType::LBrace => self.visit_lbrace(node, ctx),
            ElementType::ValueParameterList if parent_kind != Some(ElementType::FunctionLiteral) => {
                let context = self.context(tree, node, None).last_child_indent("");
                self.start_indent_context(ctx, context);
            }
            ElementType::LPar
                if tree
                    .next_code_sibling(node)
                    .is_some_and(|sibling| tree.kind(sibling) == ElementType::Condition) =>
            {
                self.visit_lpar_before_condition(node, ctx);
            }
            ElementType::ValueParameter => self.visit_value_parameter(node, ctx),
            ElementType::DotQualifiedExpression | ElementType::SafeAccessExpression => {
                self.visit_dot_qualified(node, ctx);
            }
            ElementType::Identifier if parent_kind == Some(ElementType::Property) => {
                let to = tree.parent(node).map(|property| tree.last_leaf(property));
                let context = self.context(tree, node, to);
                self.start_indent_context(ctx, context);
            }
            ElementType::LiteralStringTemplateEntry
                if tree
                    .next_code_sibling(node)
                    .is_some_and(|sibling| tree.kind(sibling) == ElementType::ClosingQuote) =>
            {
                self.visit_closing_quote_indent(node, ctx);
            }
            ElementType::WhenEntry => self.visit_when_entry(node, ctx),
            ElementType::Kdoc => self.visit_kdoc(node, ctx),
            ElementType::For | ElementType::While => self.visit_conditional_loop(node, ctx),
            ElementType::LBracket => self.visit_lbracket(node, ctx),
            ElementType::NullableType => self.visit_nullable_type(node, ctx),
            _ => {}
        }
    }

    fn after_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        while self.stack.last().is_some_and(|context| context.to_node == node) {
            if let Some(context) = self.stack.pop() {
                let logger = ctx.logger();
                if logger.can_log_trace() {
                    logger.log_trace(&format!(
                        "Remove indent context with level ({}, {}) for {}: {}",
                        self.indent_config.indent_level_from(&context.node_indent),
                        self.indent_config.indent_level_from(&context.child_indent),
                        ctx.tree().kind(context.from_node).as_str(),
                        context.covered_text(ctx.tree())
                    ));
                }
            }
        }
    }

    fn after_last_node(&mut self, ctx: &mut RuleContext<'_>) {
        if self.stack.is_empty() {
            return;
        }
        let remaining: Vec<String> = self
            .stack
            .iter()
            .map(|context| format!("{context:?}"))
            .collect();
        ctx.invariant_violation(format!("Stack should be empty:\n\t{}", remaining.join("\n\t")));
        self.stack.clear();
    }
}
