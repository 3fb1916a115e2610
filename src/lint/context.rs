//! Context handed to every rule hook

use crate::error::LintError;
use crate::rule::RuleId;
use crate::suppression::SuppressionInfo;
use kstyle_logger::Logger;
use kstyle_syntax::{NodeId, SyntaxTree};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraversalState {
    NotStarted,
    Continue,
    Stopped,
}

/// The tree being visited plus the channel for reporting violations
///
/// A context lives for the traversal of a single rule over a single file.
pub struct RuleContext<'a> {
    tree: &'a mut SyntaxTree,
    rule_id: RuleId,
    auto_correct: bool,
    /// Suppression directives at the cached comment revision
    suppressions: (u64, SuppressionInfo),
    errors: Vec<LintError>,
    traversal: TraversalState,
    /// Node whose hook is currently running
    pub(crate) current_node: Option<NodeId>,
    invariant_violation: Option<String>,
    logger: Arc<Logger>,
}

impl<'a> RuleContext<'a> {
    pub fn new(tree: &'a mut SyntaxTree, rule_id: RuleId, auto_correct: bool) -> Self {
        let suppressions = (tree.comment_revision(), SuppressionInfo::from_tree(tree));
        Self {
            tree,
            rule_id,
            auto_correct,
            suppressions,
            errors: Vec::new(),
            traversal: TraversalState::NotStarted,
            current_node: None,
            invariant_violation: None,
            logger: Arc::new(Logger::DevNull),
        }
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn tree(&self) -> &SyntaxTree {
        &*self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        &mut *self.tree
    }

    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    /// Whether the engine runs in format mode
    pub fn auto_correct(&self) -> bool {
        self.auto_correct
    }

    /// Report a violation at `offset`
    ///
    /// Returns whether the rule should fix the violation: the engine is
    /// formatting, the violation is fixable and it is not suppressed.
    /// Suppressed violations are not recorded.
    pub fn emit(
        &mut self,
        offset: usize,
        message: impl Into<String>,
        can_be_autocorrected: bool,
    ) -> bool {
        let revision = self.tree.comment_revision();
        if self.suppressions.0 != revision {
            self.suppressions = (revision, SuppressionInfo::from_tree(self.tree));
        }
        if self.suppressions.1.is_suppressed(self.tree, offset, self.rule_id) {
            return false;
        }
        let position = self.line_column(offset);
        self.errors.push(LintError::new(
            self.rule_id,
            offset,
            position,
            message,
            can_be_autocorrected,
        ));
        self.auto_correct && can_be_autocorrected
    }

    /// One-based line and column of `offset` in the current text
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        self.tree.line_column(offset)
    }

    /// Abort the remaining traversal of this rule
    ///
    /// After-hooks of the current node and its ancestors still run.
    pub fn stop_traversal(&mut self) {
        self.traversal = TraversalState::Stopped;
    }

    pub fn should_continue_traversal(&self) -> bool {
        self.traversal != TraversalState::Stopped
    }

    pub(crate) fn start_traversal(&mut self) {
        self.traversal = TraversalState::Continue;
    }

    /// Report a broken engine contract; the run of this file fails
    pub fn invariant_violation(&mut self, message: impl Into<String>) {
        if self.invariant_violation.is_none() {
            self.invariant_violation = Some(message.into());
        }
        self.stop_traversal();
    }

    pub(crate) fn take_invariant_violation(&mut self) -> Option<String> {
        self.invariant_violation.take()
    }

    pub(crate) fn into_errors(self) -> Vec<LintError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kstyle_syntax::parse;

    const RULE: RuleId = RuleId::new("standard:test");

    #[test]
    fn test_emit_reports_and_decides() {
        let mut tree = parse("val a = 1\nval b = 2\n").tree;
        let mut ctx = RuleContext::new(&mut tree, RULE, true);
        assert!(ctx.emit(10, "fixable", true));
        assert!(!ctx.emit(10, "not fixable", false));
        let errors = ctx.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!((errors[0].line, errors[0].col), (2, 1));
    }

    #[test]
    fn test_lint_mode_never_allows_fixes() {
        let mut tree = parse("val a = 1\n").tree;
        let mut ctx = RuleContext::new(&mut tree, RULE, false);
        assert!(!ctx.emit(0, "fixable", true));
    }

    #[test]
    fn test_suppressed_violation_is_dropped() {
        let mut tree = parse("val a = 1 // ktlint-disable test\n").tree;
        let mut ctx = RuleContext::new(&mut tree, RULE, true);
        assert!(!ctx.emit(4, "suppressed", true));
        assert!(ctx.into_errors().is_empty());
    }

    #[test]
    fn test_line_index_follows_mutations() {
        let mut tree = parse("val a = 1\nval b = 2\n").tree;
        let mut ctx = RuleContext::new(&mut tree, RULE, true);
        assert_eq!(ctx.line_column(10), (2, 1));
        let first = ctx.tree().leaves(ctx.tree().root())[0];
        ctx.tree_mut().replace_leaf_text(first, "\n\nval");
        assert_eq!(ctx.line_column(12), (4, 1));
    }

    #[test]
    fn test_suppression_survives_code_edits() {
        let mut tree = parse("val a = 1\nval b = 2 // ktlint-disable test\n").tree;
        let mut ctx = RuleContext::new(&mut tree, RULE, true);
        let first = ctx.tree().leaves(ctx.tree().root())[0];
        ctx.tree_mut().replace_leaf_text(first, "\n\nval");
        assert!(ctx.emit(2, "first line", true));
        assert!(!ctx.emit(12, "suppressed line", true));

        let comment = ctx.tree().leaves(ctx.tree().root()).into_iter().rev().nth(1).unwrap();
        assert_eq!(ctx.tree().leaf_text(comment), "// ktlint-disable test");
        ctx.tree_mut().replace_leaf_text(comment, "// other");
        assert!(ctx.emit(12, "no longer suppressed", true));
        assert_eq!(ctx.into_errors().len(), 2);
    }
}
