//! Rule: Import ordering
//!
//! Imports are grouped and ordered as described by the
//! `ij_kotlin_imports_layout` property (see [`layout`]). Duplicate imports
//! are reported and removed. An import list containing comments is still
//! checked, but never rewritten.

pub mod layout;

use crate::editor_config::EditorConfig;
use crate::rule::{Rule, RuleId};
use crate::syntax_utils::is_whitespace_without_newline;
use crate::RuleContext;
use kstyle_syntax::ast::{ImportDirective, ImportList};
use kstyle_syntax::{ElementType, NodeId, SyntaxTree};
use layout::{
    ASCII_LAYOUT, IDEA_LAYOUT, ImportPath, ImportSorter, PatternEntry, parse_imports_layout,
};
use rustc_hash::FxHashSet;

pub const IMPORT_ORDERING_RULE_ID: RuleId = RuleId::new("standard:import-ordering");

const IDEA_ERROR_MESSAGE: &str = "Imports must be ordered in lexicographic order without any empty lines in-between with \"java\", \"javax\", \"kotlin\" and aliases in the end";
const ASCII_ERROR_MESSAGE: &str =
    "Imports must be ordered in lexicographic order without any empty lines in-between";
const CUSTOM_ERROR_MESSAGE: &str =
    "Imports must be ordered according to the pattern specified in .editorconfig";

/// An element of the import list as far as ordering is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportItem {
    Import(NodeId),
    /// Whitespace containing more than one line break, however many
    BlankLine,
}

pub struct ImportOrderingRule {
    layout: Vec<PatternEntry>,
    sorter: ImportSorter,
}

impl ImportOrderingRule {
    pub fn new() -> Self {
        let layout = default_layout(IDEA_LAYOUT);
        Self {
            sorter: ImportSorter::new(layout.clone()),
            layout,
        }
    }

    fn error_message(&self) -> &'static str {
        if self.layout == default_layout(IDEA_LAYOUT) {
            IDEA_ERROR_MESSAGE
        } else if self.layout == default_layout(ASCII_LAYOUT) {
            ASCII_ERROR_MESSAGE
        } else {
            CUSTOM_ERROR_MESSAGE
        }
    }

    fn is_custom_layout(&self) -> bool {
        self.error_message() == CUSTOM_ERROR_MESSAGE
    }

    fn import_path(tree: &SyntaxTree, directive: NodeId) -> ImportPath {
        match ImportDirective::cast(tree, directive) {
            Some(directive) => ImportPath::new(directive.path(tree), directive.alias(tree)),
            None => ImportPath::new(tree.text(directive), None),
        }
    }

    /// Imports without duplicates, plus the blank lines between them
    ///
    /// Duplicates are only fixable when the list is going to be rebuilt,
    /// which never happens when it contains comments.
    fn unique_imports_and_blank_lines(
        &self,
        list: NodeId,
        has_comments: bool,
        ctx: &mut RuleContext<'_>,
    ) -> (bool, Vec<ImportItem>) {
        let mut autocorrect_duplicates = false;
        let mut items = Vec::new();
        let mut seen = FxHashSet::default();

        let children = ctx.tree().children(list).to_vec();
        for child in children {
            let tree = ctx.tree();
            match tree.kind(child) {
                ElementType::WhiteSpace => {
                    if tree.leaf_text(child).matches('\n').count() > 1 {
                        items.push(ImportItem::BlankLine);
                    }
                }
                ElementType::ImportDirective => {
                    let text = tree.text(child);
                    if seen.insert(text.clone()) {
                        items.push(ImportItem::Import(child));
                    } else {
                        let offset = tree.start_offset(child);
                        if ctx.emit(offset, format!("Duplicate '{text}' found"), !has_comments) {
                            autocorrect_duplicates = true;
                        }
                    }
                }
                _ => {}
            }
        }

        (autocorrect_duplicates, items)
    }

    /// Imports in layout order, with blank lines where the layout asks for
    /// them
    fn sorted_imports_with_blank_lines(&self, tree: &SyntaxTree, items: &[ImportItem]) -> Vec<ImportItem> {
        let mut imports: Vec<(NodeId, ImportPath)> = items
            .iter()
            .filter_map(|item| match item {
                ImportItem::Import(node) => Some((*node, Self::import_path(tree, *node))),
                ImportItem::BlankLine => None,
            })
            .collect();
        imports.sort_by(|(_, a), (_, b)| self.sorter.compare(a, b));

        let mut sorted = Vec::with_capacity(items.len());
        let mut previous_index: Option<usize> = None;
        for (node, path) in imports {
            let index = self.sorter.find_import_index(&path);
            if let Some(previous_index) = previous_index {
                if self.sorter.has_blank_line_between(previous_index, index) {
                    sorted.push(ImportItem::BlankLine);
                }
            }
            sorted.push(ImportItem::Import(node));
            previous_index = Some(index);
        }
        sorted
    }

    /// Replace the children of the import list
    fn rebuild(list: NodeId, items: &[ImportItem], ctx: &mut RuleContext<'_>) {
        let tree = ctx.tree_mut();
        for child in tree.children(list).to_vec() {
            tree.remove_child(list, child);
        }
        for (i, item) in items.iter().enumerate() {
            let node = match item {
                ImportItem::Import(node) => *node,
                ImportItem::BlankLine => tree.new_leaf(ElementType::WhiteSpace, "\n\n"),
            };
            tree.append_child(list, node);
            let next_is_import = matches!(items.get(i + 1), Some(ImportItem::Import(_)));
            if matches!(item, ImportItem::Import(_)) && next_is_import {
                let newline = tree.new_leaf(ElementType::WhiteSpace, "\n");
                tree.append_child(list, newline);
            }
        }
    }
}

impl Default for ImportOrderingRule {
    fn default() -> Self {
        Self::new()
    }
}

fn default_layout(value: &str) -> Vec<PatternEntry> {
    parse_imports_layout(value).unwrap_or_else(|_| vec![PatternEntry::AllOtherImports])
}

impl Rule for ImportOrderingRule {
    fn id(&self) -> RuleId {
        IMPORT_ORDERING_RULE_ID
    }

    fn description(&self) -> &'static str {
        "Orders imports according to the configured imports layout"
    }

    fn before_first_node(&mut self, editor_config: &EditorConfig) {
        // An invalid layout falls back to the default of the code style
        self.layout = parse_imports_layout(&editor_config.imports_layout()).unwrap_or_else(|_| {
            let fallback = EditorConfig::new().with(
                crate::editor_config::CODE_STYLE,
                editor_config.code_style().as_str(),
            );
            default_layout(&fallback.imports_layout())
        });
        self.sorter = ImportSorter::new(self.layout.clone());
    }

    fn visit_import_list(&mut self, import_list: ImportList, ctx: &mut RuleContext<'_>) {
        let list = import_list.node();
        if ctx.tree().children(list).is_empty() {
            return;
        }

        let tree = ctx.tree();
        let has_comments = tree.children(list).iter().any(|&child| {
            matches!(
                tree.kind(child),
                ElementType::EolComment | ElementType::BlockComment
            )
        });
        let (autocorrect_duplicates, items) =
            self.unique_imports_and_blank_lines(list, has_comments, ctx);

        let tree = ctx.tree();
        let has_too_much_whitespace = tree
            .children(list)
            .iter()
            .any(|&child| is_whitespace_without_newline(tree, child));
        let sorted = self.sorted_imports_with_blank_lines(tree, &items);
        let offset = tree.start_offset(list);
        let out_of_order = items != sorted;

        if has_comments {
            if out_of_order {
                ctx.emit(
                    offset,
                    format!(
                        "{} -- no autocorrection due to comments in the import list",
                        self.error_message()
                    ),
                    false,
                );
            }
            return;
        }

        let autocorrect_whitespace = has_too_much_whitespace && !self.is_custom_layout();
        let mut autocorrect = autocorrect_duplicates;
        if (out_of_order || autocorrect_whitespace) && ctx.emit(offset, self.error_message(), true) {
            autocorrect = true;
        }
        if autocorrect {
            Self::rebuild(list, &sorted, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleProvider;
    use crate::rules::test_support::{format_with, lint_with};
    use crate::runner::{Code, LintEngine};
    use pretty_assertions::assert_eq;

    fn providers() -> Vec<RuleProvider> {
        vec![RuleProvider::new(|| Box::new(ImportOrderingRule::new()))]
    }

    fn lint(code: &str) -> Vec<(usize, usize, String)> {
        lint_with(providers(), &[], code)
    }

    fn format(code: &str) -> String {
        format_with(providers(), &[], code)
    }

    #[test]
    fn test_sorted_imports_are_accepted() {
        let code = "import a.A\nimport b.B\nimport java.util.List\nimport kotlin.io.println\nimport c.C as D\n\nval x = 1\n";
        assert!(lint(code).is_empty());
    }

    #[test]
    fn test_unsorted_imports() {
        let code = "import b.B\nimport a.A\n\nval x = 1\n";
        assert_eq!(lint(code), vec![(1, 1, IDEA_ERROR_MESSAGE.to_string())]);
        assert_eq!(format(code), "import a.A\nimport b.B\n\nval x = 1\n");
    }

    #[test]
    fn test_java_kotlin_and_aliases_go_last() {
        let code = "import kotlin.io.println\nimport c.C as D\nimport java.util.List\nimport b.B\n";
        assert_eq!(
            format(code),
            "import b.B\nimport java.util.List\nimport kotlin.io.println\nimport c.C as D\n"
        );
    }

    #[test]
    fn test_blank_lines_are_removed() {
        let code = "import a.A\n\nimport b.B\n";
        assert_eq!(lint(code).len(), 1);
        assert_eq!(format(code), "import a.A\nimport b.B\n");
    }

    #[test]
    fn test_duplicates_are_removed() {
        let code = "import a.A\nimport b.B\nimport a.A\n";
        assert_eq!(
            lint(code),
            vec![(3, 1, "Duplicate 'import a.A' found".to_string())]
        );
        assert_eq!(format(code), "import a.A\nimport b.B\n");
    }

    #[test]
    fn test_comments_prevent_autocorrect() {
        let code = "import b.B\n// keep\nimport a.A\n";
        assert_eq!(
            lint(code),
            vec![(
                1,
                1,
                format!("{IDEA_ERROR_MESSAGE} -- no autocorrection due to comments in the import list")
            )]
        );
        assert_eq!(format(code), code);

        // Nothing is reported when the order is fine
        assert!(lint("import a.A\n// keep\nimport b.B\n").is_empty());
    }

    #[test]
    fn test_duplicate_next_to_comment_is_not_fixed() {
        let code = "import a.A\n// c\nimport a.A\n";
        let result = LintEngine::new(providers())
            .format(&Code::from_snippet(code))
            .unwrap();
        assert_eq!(result.formatted, code);
        assert_eq!(
            result
                .errors
                .iter()
                .map(|(error, corrected)| (error.message.as_str(), error.can_be_autocorrected, *corrected))
                .collect::<Vec<_>>(),
            vec![("Duplicate 'import a.A' found", false, false)]
        );
    }

    #[test]
    fn test_extra_blank_lines_between_groups() {
        let properties = [("ij_kotlin_imports_layout", "android.**,|,*")];
        let code = "import android.View\n\n\n\nimport org.Foo\n";
        assert!(lint_with(providers(), &properties, code).is_empty());

        let unsorted = "import org.Foo\n\n\nimport android.View\n";
        assert_eq!(
            format_with(providers(), &properties, unsorted),
            "import android.View\n\nimport org.Foo\n"
        );
    }

    #[test]
    fn test_custom_layout_with_blank_lines() {
        let properties = [("ij_kotlin_imports_layout", "android.**,|,*")];
        let code = "import org.Foo\nimport android.View\n";
        assert_eq!(
            lint_with(providers(), &properties, code),
            vec![(1, 1, CUSTOM_ERROR_MESSAGE.to_string())]
        );
        assert_eq!(
            format_with(providers(), &properties, code),
            "import android.View\n\nimport org.Foo\n"
        );
    }

    #[test]
    fn test_ascii_layout() {
        let properties = [("ktlint_code_style", "android_studio")];
        let code = "import java.util.List\nimport b.B\n";
        assert_eq!(
            lint_with(providers(), &properties, code),
            vec![(1, 1, ASCII_ERROR_MESSAGE.to_string())]
        );
        assert!(lint_with(providers(), &properties, "import b.B\nimport java.util.List\n").is_empty());
    }
}
