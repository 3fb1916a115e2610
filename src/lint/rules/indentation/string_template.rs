//! Indentation of the closing quotes of raw strings
//!
//! Only raw strings post-processed with `trimIndent()` or `trimMargin()` are
//! checked, as only for those the indent of the closing quotes is cosmetic.
//! The content of the string is never touched.

use crate::editor_config::CodeStyle;
use crate::indent_config::IndentConfig;
use crate::syntax_utils::line_indent;
use crate::RuleContext;
use kstyle_syntax::ast::StringTemplate;
use kstyle_syntax::{ElementType, NodeId, SyntaxTree};

pub struct StringTemplateIndenter {
    code_style: CodeStyle,
    indent_config: IndentConfig,
}

impl StringTemplateIndenter {
    pub fn new(code_style: CodeStyle, indent_config: IndentConfig) -> Self {
        Self {
            code_style,
            indent_config,
        }
    }

    pub fn visit_closing_quotes(
        &self,
        expected_indent: &str,
        template: StringTemplate,
        ctx: &mut RuleContext<'_>,
    ) {
        let tree = ctx.tree();
        let node = template.node();
        if !is_followed_by_trim_call(tree, node) || !template.is_multiline(tree) {
            return;
        }

        if contains_mixed_indentation_characters(&tree.text(node)) {
            let offset = tree.start_offset(node);
            ctx.emit(
                offset,
                "Indentation of multiline string should not contain both tab(s) and space(s)",
                false,
            );
            return;
        }

        let prev_leaf_text = tree.prev_leaf(node).map(|leaf| tree.leaf_text(leaf));
        let expected_indent = if self.code_style == CodeStyle::KtlintOfficial
            && (is_returned_from_function_body_block(tree, node)
                || is_function_body_expression(tree, node))
        {
            format!("{}{}", line_indent(tree, node), self.indent_config.indent())
        } else if prev_leaf_text == Some("\n") {
            // Opening quotes at the start of a line
            String::new()
        } else {
            expected_indent.to_string()
        };

        let candidates: Vec<NodeId> = tree
            .children(node)
            .iter()
            .copied()
            .filter(|&child| is_indent_before_closing_quote(tree, child))
            .collect();
        for child in candidates {
            let tree = ctx.tree();
            if tree.prev_leaf(child).map(|leaf| tree.leaf_text(leaf)) != Some("\n") {
                continue;
            }
            let text = tree.text(child);
            let (actual_indent, actual_content) = split_indent(&text);
            if actual_indent == expected_indent {
                continue;
            }
            let offset = tree.start_offset(child);
            let actual_content = actual_content.to_string();
            if ctx.emit(offset, "Unexpected indent of multiline string closing quotes", true) {
                let tree = ctx.tree_mut();
                if tree.is_leaf(child) {
                    let part = tree.new_leaf(ElementType::RegularStringPart, expected_indent.clone());
                    let entry = tree.new_composite(ElementType::LiteralStringTemplateEntry, vec![part]);
                    tree.add_child_before(node, entry, Some(child));
                } else {
                    let part = tree.first_leaf(child);
                    tree.replace_leaf_text(part, format!("{expected_indent}{actual_content}"));
                }
            }
        }
    }
}

/// `"""...""".trimIndent()` or `"""...""".trimMargin()`
fn is_followed_by_trim_call(tree: &SyntaxTree, node: NodeId) -> bool {
    let mut sibling = tree.next_sibling(node);
    while let Some(current) = sibling {
        if tree.kind(current) != ElementType::Dot {
            let text = tree.text(current);
            return tree.kind(current) == ElementType::CallExpression
                && (text == "trimIndent()" || text == "trimMargin()");
        }
        sibling = tree.next_sibling(current);
    }
    false
}

fn is_returned_from_function_body_block(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.prev_code_leaf(node)
        .is_some_and(|leaf| tree.kind(leaf) == ElementType::ReturnKeyword)
}

/// `fun foo() = """`
fn is_function_body_expression(tree: &SyntaxTree, node: NodeId) -> bool {
    let separated_by_space = match tree.prev_leaf(node) {
        Some(leaf) => tree.kind(leaf) != ElementType::WhiteSpace || tree.leaf_text(leaf) == " ",
        None => true,
    };
    separated_by_space
        && tree
            .prev_code_leaf(node)
            .filter(|&leaf| tree.kind(leaf) == ElementType::Eq)
            .and_then(|eq| tree.parent(eq))
            .is_some_and(|parent| tree.kind(parent) == ElementType::Fun)
}

fn is_indent_before_closing_quote(tree: &SyntaxTree, node: NodeId) -> bool {
    if tree.kind(node) == ElementType::ClosingQuote {
        return true;
    }
    let text = tree.text(node);
    text.chars().all(|c| c.is_whitespace() && c != '\n')
        && tree
            .next_code_sibling(node)
            .is_some_and(|sibling| tree.kind(sibling) == ElementType::ClosingQuote)
}

/// Whether the common indent of the content lines mixes tabs and spaces
fn contains_mixed_indentation_characters(text: &str) -> bool {
    let lines: Vec<&str> = text
        .split('\n')
        .filter(|line| !line.starts_with("\"\"\"") && !line.ends_with("\"\"\""))
        .filter(|line| !line.trim().is_empty())
        .collect();
    let prefix_length = lines
        .iter()
        .map(|line| indent_length(line))
        .min()
        .unwrap_or(0);
    let mut indent_chars: Vec<char> = lines
        .iter()
        .flat_map(|line| line.chars().take(prefix_length))
        .collect();
    indent_chars.sort_unstable();
    indent_chars.dedup();
    indent_chars.len() > 1
}

fn indent_length(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn split_indent(text: &str) -> (&str, &str) {
    let index = text
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(text.len(), |(i, _)| i);
    text.split_at(index)
}
