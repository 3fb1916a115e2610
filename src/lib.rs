//! Lint and format Kotlin sources
//!
//! This crate bundles the workspace members: the syntax tree in
//! [`syntax`], the rule engine and the standard rules in [`lint`] and the
//! logger in [`logger`]. [`lint_source`] and [`format_source`] run the
//! standard rule set over a single snippet.

pub use kstyle_lint as lint;
pub use kstyle_logger as logger;
pub use kstyle_syntax as syntax;

use kstyle_lint::{Code, EditorConfig, EngineError, FormatResult, LintEngine, LintError};

/// Engine running the standard rule set with the given properties
pub fn standard_engine(editor_config: EditorConfig) -> LintEngine {
    LintEngine::new(kstyle_lint::standard_rule_providers()).with_editor_config(editor_config)
}

pub fn lint_source(source: &str, editor_config: EditorConfig) -> Result<Vec<LintError>, EngineError> {
    standard_engine(editor_config).lint(&Code::from_snippet(source))
}

pub fn format_source(source: &str, editor_config: EditorConfig) -> Result<FormatResult, EngineError> {
    standard_engine(editor_config).format(&Code::from_snippet(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_source() {
        let result = format_source("fun f() {\nreturn 1\n}", EditorConfig::new()).unwrap();
        assert_eq!(result.formatted, "fun f() {\n    return 1\n}\n");
        assert!(result.converged);
    }

    #[test]
    fn test_lint_source_with_tabs() {
        let editor_config = EditorConfig::new().with("indent_style", "tab");
        let errors = lint_source("fun f() {\n\treturn 1\n}\n", editor_config).unwrap();
        assert_eq!(errors, vec![]);
    }
}
