//! `ktlint-disable` / `ktlint-enable` suppression directives
//!
//! - `// ktlint-disable [ids]` suppresses the listed rules (all rules when no
//!   id is given) from the start of its line up to the comment
//! - `/* ktlint-disable [ids] */` starts a suppressed region which is closed
//!   by a `/* ktlint-enable [ids] */` listing the same ids, or extends to the
//!   end of the file

use crate::rule::RuleId;
use kstyle_syntax::{ElementType, NodeId, SyntaxTree};
use rustc_hash::FxHashSet;

const DISABLE: &str = "ktlint-disable";
const ENABLE: &str = "ktlint-enable";

/// Suppressed range, anchored on the directive comments so that edits
/// elsewhere in the file do not invalidate it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extent {
    /// From the start of the line of the comment up to the comment
    Line(NodeId),
    /// From the disable comment up to the enable comment, or the end of the
    /// file when the region is never closed
    Region { start: NodeId, end: Option<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SuppressedRegion {
    extent: Extent,
    /// Empty means all rules
    rules: FxHashSet<String>,
}

impl SuppressedRegion {
    fn applies_to(&self, rule_id: RuleId) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| rule_id.matches(r))
    }

    /// Inclusive offset range in the current text, `None` once a directive
    /// was removed from the tree
    fn range(&self, tree: &SyntaxTree) -> Option<(usize, usize)> {
        match self.extent {
            Extent::Line(comment) => {
                let end = tree.try_start_offset(comment).ok()?;
                Some((tree.line_start(end), end))
            }
            Extent::Region { start, end } => {
                let start = tree.try_start_offset(start).ok()?;
                let end = match end {
                    Some(enable) => tree.try_start_offset(enable).ok()?.saturating_sub(1),
                    None => tree.text_len(tree.root()),
                };
                Some((start, end))
            }
        }
    }
}

/// Suppression directives of a file
///
/// Only the comments carry information, so the info stays valid until a
/// comment is added, removed or edited (see
/// [`SyntaxTree::comment_revision`]).
#[derive(Debug, Clone, Default)]
pub struct SuppressionInfo {
    regions: Vec<SuppressedRegion>,
}

impl SuppressionInfo {
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let mut regions = Vec::new();
        let mut open: Vec<(NodeId, FxHashSet<String>)> = Vec::new();

        for leaf in tree.leaves(tree.root()) {
            let text = tree.leaf_text(leaf);
            match tree.kind(leaf) {
                ElementType::EolComment => {
                    let comment = text.trim_start_matches('/').trim();
                    if let Some(rules) = parse_directive(comment, DISABLE) {
                        regions.push(SuppressedRegion {
                            extent: Extent::Line(leaf),
                            rules,
                        });
                    }
                }
                ElementType::BlockComment => {
                    let comment = text
                        .trim_start_matches("/*")
                        .trim_end_matches("*/")
                        .trim();
                    if let Some(rules) = parse_directive(comment, DISABLE) {
                        open.push((leaf, rules));
                    } else if let Some(rules) = parse_directive(comment, ENABLE) {
                        if let Some(index) = open.iter().rposition(|(_, open)| *open == rules) {
                            let (start, rules) = open.remove(index);
                            regions.push(SuppressedRegion {
                                extent: Extent::Region {
                                    start,
                                    end: Some(leaf),
                                },
                                rules,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        regions.extend(open.into_iter().map(|(start, rules)| SuppressedRegion {
            extent: Extent::Region { start, end: None },
            rules,
        }));

        Self { regions }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn is_suppressed(&self, tree: &SyntaxTree, offset: usize, rule_id: RuleId) -> bool {
        self.regions
            .iter()
            .filter(|region| region.applies_to(rule_id))
            .filter_map(|region| region.range(tree))
            .any(|(start, end)| start <= offset && offset <= end)
    }
}

/// Rule ids listed after `key`, or `None` when the comment is not a directive
fn parse_directive(comment: &str, key: &str) -> Option<FxHashSet<String>> {
    let mut words = comment.split_whitespace();
    if words.next()? != key {
        return None;
    }
    Some(words.map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kstyle_syntax::parse;

    const INDENT: RuleId = RuleId::new("standard:indent");
    const SPACES: RuleId = RuleId::new("standard:no-trailing-spaces");

    fn suppressions(source: &str) -> (SyntaxTree, SuppressionInfo) {
        let tree = parse(source).tree;
        let info = SuppressionInfo::from_tree(&tree);
        (tree, info)
    }

    #[test]
    fn test_end_of_line_directive() {
        let source = "val a = 1\nval b = 2 // ktlint-disable indent\nval c = 3\n";
        let (tree, info) = suppressions(source);
        let line_two = source.find("val b").unwrap_or(0);
        assert!(info.is_suppressed(&tree, line_two, INDENT));
        assert!(!info.is_suppressed(&tree, line_two, SPACES));
        assert!(!info.is_suppressed(&tree, 0, INDENT));
        assert!(!info.is_suppressed(&tree, source.find("val c").unwrap_or(0), INDENT));
    }

    #[test]
    fn test_region_directive() {
        let source = "/* ktlint-disable */\nval a = 1\n/* ktlint-enable */\nval b = 2\n";
        let (tree, info) = suppressions(source);
        assert!(info.is_suppressed(&tree, source.find("val a").unwrap_or(0), INDENT));
        assert!(info.is_suppressed(&tree, source.find("val a").unwrap_or(0), SPACES));
        assert!(!info.is_suppressed(&tree, source.find("val b").unwrap_or(0), INDENT));
    }

    #[test]
    fn test_unclosed_region_extends_to_end_of_file() {
        let source = "val a = 1\n/* ktlint-disable standard:indent */\nval b = 2\n";
        let (tree, info) = suppressions(source);
        assert!(!info.is_suppressed(&tree, 0, INDENT));
        assert!(info.is_suppressed(&tree, source.len(), INDENT));
        assert!(!info.is_suppressed(&tree, source.len(), SPACES));
    }

    #[test]
    fn test_regular_comments_are_ignored() {
        assert!(suppressions("// ktlint-disabled\n/* not ktlint-disable */\n").1.is_empty());
    }

    #[test]
    fn test_regions_follow_edits_before_them() {
        let source = "val a = 1\nval b = 2 // ktlint-disable indent\nval c = 3\n";
        let (mut tree, info) = suppressions(source);
        let first = tree.leaves(tree.root())[0];
        tree.replace_leaf_text(first, "\n\nval");
        let text = tree.text(tree.root());
        assert!(info.is_suppressed(&tree, text.find("val b").unwrap_or(0), INDENT));
        assert!(!info.is_suppressed(&tree, text.find("val a").unwrap_or(0), INDENT));
        assert!(!info.is_suppressed(&tree, text.find("val c").unwrap_or(0), INDENT));
    }
}
