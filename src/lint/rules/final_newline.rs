//! Rule: Final newline
//!
//! `insert_final_newline = true` requires the file to end with a line
//! break, `false` forbids one.

use crate::editor_config::EditorConfig;
use crate::rule::{Rule, RuleId, VisitorModifier};
use crate::syntax_utils::is_whitespace_with_newline;
use crate::RuleContext;
use kstyle_syntax::{ElementType, NodeId};

pub const FINAL_NEWLINE_RULE_ID: RuleId = RuleId::new("standard:final-newline");

pub struct FinalNewlineRule {
    insert_final_newline: bool,
}

impl FinalNewlineRule {
    pub fn new() -> Self {
        Self {
            insert_final_newline: true,
        }
    }
}

impl Default for FinalNewlineRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FinalNewlineRule {
    fn id(&self) -> RuleId {
        FINAL_NEWLINE_RULE_ID
    }

    fn visitor_modifiers(&self) -> Vec<VisitorModifier> {
        vec![VisitorModifier::RunOnRootNodeOnly]
    }

    fn description(&self) -> &'static str {
        "Enforces or forbids a line break at the end of the file"
    }

    fn before_first_node(&mut self, editor_config: &EditorConfig) {
        self.insert_final_newline = editor_config.insert_final_newline();
    }

    fn visit_file(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree();
        let length = tree.text_len(node);
        if length == 0 {
            return;
        }
        let last = tree.last_leaf(node);
        let ends_with_newline = is_whitespace_with_newline(tree, last);

        if self.insert_final_newline {
            if !ends_with_newline
                && ctx.emit(length - 1, "File must end with a newline (\\n)", true)
            {
                let newline = ctx.tree_mut().new_leaf(ElementType::WhiteSpace, "\n");
                ctx.tree_mut().append_child(node, newline);
            }
        } else if ends_with_newline {
            let offset = ctx.tree().start_offset(last);
            if ctx.emit(offset, "Redundant newline (\\n) at the end of file", true) {
                ctx.tree_mut().remove(last);
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

    fn providers() -> Vec<RuleProvider> {
        vec![RuleProvider::new(|| Box::new(FinalNewlineRule::new()))]
    }

    #[test]
    fn test_missing_final_newline() {
        let code = "val a = 1";
        assert_eq!(
            lint_with(providers(), &[], code),
            vec![(1, 9, "File must end with a newline (\\n)".to_string())]
        );
        assert_eq!(format_with(providers(), &[], code), "val a = 1\n");
    }

    #[test]
    fn test_final_newline_present() {
        assert!(lint_with(providers(), &[], "val a = 1\n").is_empty());
        assert!(lint_with(providers(), &[], "").is_empty());
    }

    #[test]
    fn test_redundant_final_newline() {
        let properties = [("insert_final_newline", "false")];
        let code = "val a = 1\n";
        assert_eq!(
            lint_with(providers(), &properties, code),
            vec![(1, 10, "Redundant newline (\\n) at the end of file".to_string())]
        );
        assert_eq!(format_with(providers(), &properties, code), "val a = 1");
        assert!(lint_with(providers(), &properties, "val a = 1").is_empty());
    }
}
