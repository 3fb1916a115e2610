//! The standard rule set
//!
//! Besides the rules themselves this module defines the order in which the
//! rules are declared. Rules without ordering constraints run in this
//! order, so it is part of the observable behavior of a format run.

pub mod argument_list_wrapping;
pub mod final_newline;
pub mod import_ordering;
pub mod indentation;
pub mod no_trailing_spaces;
pub mod trailing_comma_on_call_site;

pub use argument_list_wrapping::{ARGUMENT_LIST_WRAPPING_RULE_ID, ArgumentListWrappingRule};
pub use final_newline::{FINAL_NEWLINE_RULE_ID, FinalNewlineRule};
pub use import_ordering::{IMPORT_ORDERING_RULE_ID, ImportOrderingRule};
pub use indentation::{INDENT_RULE_ID, IndentationRule};
pub use no_trailing_spaces::{NO_TRAILING_SPACES_RULE_ID, NoTrailingSpacesRule};
pub use trailing_comma_on_call_site::{
    TRAILING_COMMA_ON_CALL_SITE_RULE_ID, TrailingCommaOnCallSiteRule,
};

use crate::rule::{RuleProvider, RuleRegistry};

/// Providers for every rule of the standard rule set
pub fn standard_rule_providers() -> Vec<RuleProvider> {
    vec![
        RuleProvider::new(|| Box::new(NoTrailingSpacesRule)),
        RuleProvider::new(|| Box::new(ImportOrderingRule::new())),
        RuleProvider::new(|| Box::new(ArgumentListWrappingRule::new())),
        RuleProvider::new(|| Box::new(FinalNewlineRule::new())),
        RuleProvider::new(|| Box::new(IndentationRule::new())),
        RuleProvider::new(|| Box::new(TrailingCommaOnCallSiteRule::new())),
    ]
}

pub fn standard_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for provider in standard_rule_providers() {
        registry.register(provider);
    }
    registry
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::editor_config::EditorConfig;
    use crate::rule::RuleProvider;
    use crate::runner::{Code, LintEngine};

    fn engine(providers: Vec<RuleProvider>, properties: &[(&str, &str)]) -> LintEngine {
        LintEngine::new(providers)
            .with_editor_config(EditorConfig::from_pairs(properties.iter().copied()))
    }

    /// Line, column and message of every violation found in `code`
    pub fn lint_with(
        providers: Vec<RuleProvider>,
        properties: &[(&str, &str)],
        code: &str,
    ) -> Vec<(usize, usize, String)> {
        engine(providers, properties)
            .lint(&Code::from_snippet(code))
            .unwrap()
            .into_iter()
            .map(|error| (error.line, error.col, error.message))
            .collect()
    }

    pub fn format_with(
        providers: Vec<RuleProvider>,
        properties: &[(&str, &str)],
        code: &str,
    ) -> String {
        engine(providers, properties)
            .format(&Code::from_snippet(code))
            .unwrap()
            .formatted
    }
}
