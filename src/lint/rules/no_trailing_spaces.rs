//! Rule: No trailing spaces
//!
//! Detects and removes spaces and tabs before a line break, both in
//! whitespace between tokens and inside comments.

use crate::rule::{Rule, RuleId};
use crate::RuleContext;
use kstyle_syntax::{ElementType, NodeId};

pub const NO_TRAILING_SPACES_RULE_ID: RuleId = RuleId::new("standard:no-trailing-spaces");

pub struct NoTrailingSpacesRule;

impl Rule for NoTrailingSpacesRule {
    fn id(&self) -> RuleId {
        NO_TRAILING_SPACES_RULE_ID
    }

    fn description(&self) -> &'static str {
        "Detects and removes trailing spaces at the end of lines"
    }

    fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        if !tree.is_leaf(node) || tree.is_code(node) {
            return;
        }

        let text = tree.leaf_text(node).to_string();
        let kind = tree.kind(node);
        let has_next_leaf = tree.next_leaf(node).is_some();
        let start = tree.start_offset(node);

        let lines: Vec<&str> = text.split('\n').collect();
        let last = lines.len() - 1;
        let mut autocorrect = false;
        let mut violation_offset = start;
        let mut modified = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            // The last line of whitespace is the indent of the next token,
            // unless nothing follows
            let keep = kind != ElementType::EolComment && index == last && has_next_leaf;
            let trimmed = line.trim_end_matches([' ', '\t']);
            if !keep && trimmed.len() < line.len() {
                if ctx.emit(violation_offset + trimmed.len(), "Trailing space(s)", true) {
                    autocorrect = true;
                }
                modified.push(trimmed);
            } else {
                modified.push(line);
            }
            violation_offset += line.len() + 1;
        }

        if autocorrect {
            ctx.tree_mut().replace_leaf_text(node, modified.join("\n"));
        }
    }
}
