//! Lint and format execution modes

use crate::context::RuleContext;
use crate::editor_config::{EditorConfig, EndOfLine};
use crate::error::{ConfigurationError, EngineError, LintError, sort_lint_errors};
use crate::rule::RuleProvider;
use crate::scheduler::resolve_rule_order;
use crate::visitor::visit_tree;
use kstyle_logger::Logger;
use kstyle_syntax::{SyntaxTree, TreeError, parse};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const UTF8_BOM: char = '\u{feff}';

/// Number of format passes after which formatting gives up
pub const MAX_FORMAT_RUNS_PER_FILE: usize = 3;

/// Source text handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub content: String,

    /// Only used in diagnostics
    pub file_path: Option<PathBuf>,
}

impl Code {
    pub fn from_snippet(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file_path: None,
        }
    }

    pub fn from_file(file_path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file_path: Some(file_path.into()),
        }
    }

    pub fn file_path_or_stdin(&self) -> String {
        match &self.file_path {
            Some(path) => path.display().to_string(),
            None => "<stdin>".to_string(),
        }
    }
}

/// Result of formatting a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatResult {
    pub formatted: String,

    /// Every violation found by any pass, paired with whether it was fixed
    pub errors: Vec<(LintError, bool)>,

    /// False when the pass cap was reached with fixable violations left
    pub converged: bool,

    /// Number of format passes that ran
    pub passes: usize,
}

impl FormatResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Violations which are still present in the formatted text
    pub fn remaining_errors(&self) -> impl Iterator<Item = &LintError> {
        self.errors
            .iter()
            .filter(|(_, corrected)| !corrected)
            .map(|(error, _)| error)
    }
}

/// Source text after BOM removal and line separator normalization
struct NormalizedCode {
    text: String,
    has_bom: bool,
    line_separator: &'static str,
}

impl NormalizedCode {
    fn new(content: &str, editor_config: &EditorConfig) -> Self {
        let (has_bom, content) = match content.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, content),
        };
        let line_separator = match editor_config.end_of_line() {
            Some(EndOfLine::CrLf) => "\r\n",
            Some(EndOfLine::Lf) => "\n",
            None if content.contains('\r') => "\r\n",
            None => "\n",
        };
        Self {
            text: content.replace("\r\n", "\n").replace('\r', "\n"),
            has_bom,
            line_separator,
        }
    }

    fn restore(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len() + 4);
        if self.has_bom {
            output.push(UTF8_BOM);
        }
        if self.line_separator == "\n" {
            output.push_str(text);
        } else {
            output.push_str(&text.replace('\n', self.line_separator));
        }
        output
    }
}

/// Runs a set of rules over source files
///
/// The engine is immutable once built and can be shared between threads.
/// Each call resolves the rule order for its editor configuration and creates
/// fresh rule instances, so no state leaks from one file to the next.
#[derive(Debug, Clone)]
pub struct LintEngine {
    rule_providers: Vec<RuleProvider>,
    editor_config: EditorConfig,
    logger: Arc<Logger>,
    max_format_runs: usize,
}

impl LintEngine {
    pub fn new(rule_providers: Vec<RuleProvider>) -> Self {
        Self {
            rule_providers,
            editor_config: EditorConfig::default(),
            logger: Arc::new(Logger::DevNull),
            max_format_runs: MAX_FORMAT_RUNS_PER_FILE,
        }
    }

    pub fn with_editor_config(mut self, editor_config: EditorConfig) -> Self {
        self.editor_config = editor_config;
        self
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_max_format_runs(mut self, max_format_runs: usize) -> Self {
        self.max_format_runs = max_format_runs.max(1);
        self
    }

    pub fn rule_providers(&self) -> &[RuleProvider] {
        &self.rule_providers
    }

    pub fn editor_config(&self) -> &EditorConfig {
        &self.editor_config
    }

    /// Active rules in execution order
    pub fn resolve_rules(&self) -> Result<Vec<RuleProvider>, ConfigurationError> {
        resolve_rule_order(&self.rule_providers, &self.editor_config, &self.logger)
    }

    /// Report the violations in `code` without changing it
    pub fn lint(&self, code: &Code) -> Result<Vec<LintError>, EngineError> {
        self.logger.log_debug(&format!(
            "Starting with linting file '{}'",
            code.file_path_or_stdin()
        ));
        let normalized = NormalizedCode::new(&code.content, &self.editor_config);
        let mut tree = parse(&normalized.text).ok()?;
        let errors = self.lint_tree(&mut tree)?;
        self.logger.log_debug(&format!(
            "Finished with linting file '{}'",
            code.file_path_or_stdin()
        ));
        Ok(errors)
    }

    /// Report the violations in an already parsed tree
    ///
    /// Every rule sees the same tree; a rule that changes it fails the run.
    pub fn lint_tree(&self, tree: &mut SyntaxTree) -> Result<Vec<LintError>, EngineError> {
        let rules = self.resolve_rules()?;
        let mut errors = Vec::new();
        for provider in &rules {
            let revision = tree.revision();
            errors.extend(self.execute_rule(provider, tree, false)?);
            if tree.revision() != revision {
                return Err(EngineError::InvariantViolation {
                    rule_id: provider.id(),
                    message: "rule modified the tree while linting".to_string(),
                });
            }
        }
        sort_lint_errors(&mut errors);
        Ok(errors)
    }

    /// Autocorrect `code`
    ///
    /// Rules run in order against one mutable tree. Passes repeat until a
    /// pass leaves the tree untouched or the pass cap is hit, in which case
    /// the tree is linted once more to find out whether fixable violations
    /// remain.
    pub fn format(&self, code: &Code) -> Result<FormatResult, EngineError> {
        self.logger.log_debug(&format!(
            "Starting with formatting file '{}'",
            code.file_path_or_stdin()
        ));
        let rules = self.resolve_rules()?;
        let normalized = NormalizedCode::new(&code.content, &self.editor_config);
        let mut tree = parse(&normalized.text).ok()?;

        let mut errors: Vec<(LintError, bool)> = Vec::new();
        let mut passes = 0;
        let mut mutated;
        loop {
            mutated = false;
            passes += 1;
            let pass_now = Instant::now();
            for provider in &rules {
                let revision = tree.revision();
                for error in self.execute_rule(provider, &mut tree, true)? {
                    let corrected = error.can_be_autocorrected;
                    errors.push((error, corrected));
                }
                if tree.revision() != revision {
                    mutated = true;
                }
            }
            if self.logger.can_log_timing() {
                self.logger.log(&format!(
                    "Format pass {} of '{}' took {:.2?}",
                    passes,
                    code.file_path_or_stdin(),
                    pass_now.elapsed()
                ));
            }
            if !mutated || passes >= self.max_format_runs {
                break;
            }
        }

        let mut converged = true;
        if mutated && passes >= self.max_format_runs {
            let mut has_errors_which_can_be_autocorrected = false;
            for provider in &rules {
                let remaining = self.execute_rule(provider, &mut tree, false)?;
                if remaining.iter().any(|error| error.can_be_autocorrected) {
                    has_errors_which_can_be_autocorrected = true;
                    break;
                }
            }
            if has_errors_which_can_be_autocorrected {
                converged = false;
                self.logger.log_warning(&format!(
                    "Format was not able to resolve all violations which (theoretically) can be autocorrected in file {} in {} consecutive runs of format.",
                    code.file_path_or_stdin(),
                    self.max_format_runs
                ));
            }
        }

        errors.sort_by(|(a, a_corrected), (b, b_corrected)| {
            (a.line, a.col, a.rule_id.value(), &a.message, a_corrected).cmp(&(
                b.line,
                b.col,
                b.rule_id.value(),
                &b.message,
                b_corrected,
            ))
        });
        errors.dedup();

        let formatted = if !mutated && passes == 1 {
            code.content.clone()
        } else {
            normalized.restore(&tree.text(tree.root()))
        };

        self.logger.log_debug(&format!(
            "Finished with formatting file '{}'",
            code.file_path_or_stdin()
        ));

        Ok(FormatResult {
            formatted,
            errors,
            converged,
            passes,
        })
    }

    /// Lint several files in parallel, results in input order
    pub fn lint_files(&self, codes: &[Code]) -> Vec<Result<Vec<LintError>, EngineError>> {
        self.run_in_groups(codes, |engine, code| engine.lint(code))
    }

    /// Format several files in parallel, results in input order
    pub fn format_files(&self, codes: &[Code]) -> Vec<Result<FormatResult, EngineError>> {
        self.run_in_groups(codes, |engine, code| engine.format(code))
    }

    fn run_in_groups<T, F>(&self, codes: &[Code], run: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&LintEngine, &Code) -> T + Sync,
    {
        let group_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(codes.len())
            .max(1);

        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); group_count];
        for i in 0..codes.len() {
            groups[i % group_count].push(i);
        }

        let mut results: Vec<Option<T>> = codes.iter().map(|_| None).collect();
        std::thread::scope(|scope| {
            let handles: Vec<_> = groups
                .iter()
                .map(|group| {
                    let run = &run;
                    scope.spawn(move || {
                        group
                            .iter()
                            .map(|&i| (i, run(self, &codes[i])))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for handle in handles {
                // Rule panics are caught per file, so a group never panics
                if let Ok(group_results) = handle.join() {
                    for (i, result) in group_results {
                        results[i] = Some(result);
                    }
                }
            }
        });

        results.into_iter().flatten().collect()
    }

    /// Run one rule over the whole tree and collect what it emitted
    fn execute_rule(
        &self,
        provider: &RuleProvider,
        tree: &mut SyntaxTree,
        auto_correct: bool,
    ) -> Result<Vec<LintError>, EngineError> {
        let rule_id = provider.id();
        let mut rule = provider.create_new_rule_instance();
        let mut ctx =
            RuleContext::new(tree, rule_id, auto_correct).with_logger(self.logger.clone());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            rule.before_first_node(&self.editor_config);
            visit_tree(rule.as_mut(), &mut ctx, provider.run_on_root_node_only());
        }));

        if let Err(payload) = outcome {
            if let Some(error) = payload.downcast_ref::<TreeError>() {
                return Err(EngineError::InvariantViolation {
                    rule_id,
                    message: error.to_string(),
                });
            }
            let (line, column) = match ctx.current_node {
                Some(node) if !auto_correct => match ctx.tree().try_start_offset(node) {
                    Ok(offset) => ctx.line_column(offset),
                    Err(_) => (0, 0),
                },
                _ => (0, 0),
            };
            return Err(EngineError::RuleCrashed {
                rule_id,
                line,
                column,
                message: panic_message(payload.as_ref()),
            });
        }

        if let Some(message) = ctx.take_invariant_violation() {
            return Err(EngineError::InvariantViolation { rule_id, message });
        }

        Ok(ctx.into_errors())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Rule, RuleId};
    use kstyle_syntax::{ElementType, NodeId};
    use pretty_assertions::assert_eq;

    /// Replaces every `var` keyword with `val`
    struct NoVar;

    impl Rule for NoVar {
        fn id(&self) -> RuleId {
            RuleId::new("test:no-var")
        }

        fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
            if ctx.tree().is_leaf(node) && ctx.tree().leaf_text(node) == "var" {
                let offset = ctx.tree().start_offset(node);
                if ctx.emit(offset, "Unexpected var", true) {
                    ctx.tree_mut().replace_leaf_text(node, "val");
                }
            }
        }
    }

    /// Always reports a fixable violation and always changes the tree
    struct NeverDone;

    impl Rule for NeverDone {
        fn id(&self) -> RuleId {
            RuleId::new("test:never-done")
        }

        fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
            if ctx.tree().kind(node) != ElementType::File {
                return;
            }
            if ctx.emit(0, "Still not done", true) {
                let first = ctx.tree().first_leaf(node);
                let text = format!("{} ", ctx.tree().leaf_text(first));
                ctx.tree_mut().replace_leaf_text(first, text);
            }
        }
    }

    struct Panics;

    impl Rule for Panics {
        fn id(&self) -> RuleId {
            RuleId::new("test:panics")
        }

        fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
            if ctx.tree().kind(node) == ElementType::Identifier {
                panic!("boom");
            }
        }
    }

    /// Mutates without asking
    struct Sneaky;

    impl Rule for Sneaky {
        fn id(&self) -> RuleId {
            RuleId::new("test:sneaky")
        }

        fn before_visit_child_nodes(&mut self, node: NodeId, ctx: &mut RuleContext<'_>) {
            if ctx.tree().kind(node) == ElementType::Identifier {
                ctx.tree_mut().replace_leaf_text(node, "renamed");
            }
        }
    }

    fn engine(providers: Vec<RuleProvider>) -> LintEngine {
        LintEngine::new(providers)
    }

    #[test]
    fn test_lint_reports_without_changing() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(NoVar))]);
        let errors = engine
            .lint(&Code::from_snippet("var a = 1\nvar b = 2\n"))
            .unwrap();
        let positions: Vec<_> = errors.iter().map(|e| (e.line, e.col)).collect();
        assert_eq!(positions, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_format_fixes_and_reports() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(NoVar))]);
        let result = engine
            .format(&Code::from_snippet("var a = 1\nval b = 2\n"))
            .unwrap();
        assert_eq!(result.formatted, "val a = 1\nval b = 2\n");
        assert_eq!(result.passes, 2);
        assert!(result.converged);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].1);
    }

    #[test]
    fn test_unchanged_input_is_returned_as_is() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(NoVar))]);
        let result = engine
            .format(&Code::from_snippet("val a = 1\r\n"))
            .unwrap();
        assert_eq!(result.formatted, "val a = 1\r\n");
        assert_eq!(result.passes, 1);
    }

    #[test]
    fn test_bom_and_crlf_are_restored() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(NoVar))]);
        let result = engine
            .format(&Code::from_snippet("\u{feff}var a = 1\r\nvar b = 2\r\n"))
            .unwrap();
        assert_eq!(result.formatted, "\u{feff}val a = 1\r\nval b = 2\r\n");
    }

    #[test]
    fn test_end_of_line_property_wins() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(NoVar))])
            .with_editor_config(EditorConfig::new().with("end_of_line", "lf"));
        let result = engine
            .format(&Code::from_snippet("var a = 1\r\n"))
            .unwrap();
        assert_eq!(result.formatted, "val a = 1\n");
    }

    #[test]
    fn test_pass_cap_reports_non_convergence() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(NeverDone))]);
        let result = engine.format(&Code::from_snippet("val a = 1\n")).unwrap();
        assert_eq!(result.passes, MAX_FORMAT_RUNS_PER_FILE);
        assert!(!result.converged);
        assert_eq!(result.formatted, "val    a = 1\n");
    }

    #[test]
    fn test_rule_crash_is_reported_with_position() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(Panics))]);
        let error = engine.lint(&Code::from_snippet("\nval a = 1\n")).unwrap_err();
        assert_eq!(
            error,
            EngineError::RuleCrashed {
                rule_id: RuleId::new("test:panics"),
                line: 2,
                column: 5,
                message: "boom".to_string(),
            }
        );

        let error = engine
            .format(&Code::from_snippet("\nval a = 1\n"))
            .unwrap_err();
        assert!(matches!(
            error,
            EngineError::RuleCrashed { line: 0, column: 0, .. }
        ));
    }

    #[test]
    fn test_mutation_in_lint_mode_is_an_invariant_violation() {
        let engine = engine(vec![RuleProvider::new(|| Box::new(Sneaky))]);
        let error = engine.lint(&Code::from_snippet("val a = 1\n")).unwrap_err();
        assert!(matches!(error, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_files_are_isolated_and_ordered() {
        let engine = engine(vec![
            RuleProvider::new(|| Box::new(NoVar)),
            RuleProvider::new(|| Box::new(Panics)),
        ]);
        let codes = vec![
            Code::from_file("a.kt", "var a = 1\n"),
            Code::from_file("b.kt", "\n"),
            Code::from_file("c.kt", "var c = 3\n"),
        ];
        let results = engine.lint_files(&codes);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert_eq!(results[1], Ok(vec![]));
        assert!(results[2].is_err());
    }
}
